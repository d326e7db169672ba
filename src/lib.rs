//! dt64 — unit-tagged 64-bit datetime/timedelta value engine.
//!
//! A value is a signed 64-bit tick count tagged with a [`Metadata`] pair
//! of unit and positive multiplier. All arithmetic is exact integer
//! arithmetic over the proleptic Gregorian calendar.
//!
//! Features:
//! - Calendar kernel: epoch-day conversion via the 400-year cycle,
//!   leap years, day-of-week, business-day counting.
//! - Codec between packed values and broken-down [`CivilTime`] at any
//!   of the fifteen unit scales.
//! - Exact conversion factors between unit pairs as reduced rationals,
//!   with overflow surfaced as a first-class error.
//! - A four-level casting lattice ([`Casting`]) separating date units
//!   from time units and nonlinear units from linear ones.
//! - Metadata greatest-common-divisor and type promotion.
//! - Textual metadata parsing and emission (`[7D]`, `[1M/30]`,
//!   `datetime64[ns]`, tuple form).
//! - Unit inference over heterogeneous nested inputs.
//! - `arange`-style range generation at the value level.
//!
//! Not-a-time ([`NAT`], bit pattern `i64::MIN`) is a first-class
//! absorbing value and is never an error by itself.
//!
//! ISO 8601 text parsing is out of scope; it is consumed through the
//! [`convert::ParseIso8601`] collaborator trait.

use core::fmt;

use thiserror::Error;

pub mod arange;
pub mod calendar;
pub mod cast;
pub mod codec;
pub mod convert;
pub mod meta;
pub mod text;
pub mod units;

#[cfg(feature = "python")]
pub mod python;

pub use arange::{arange, values_from_inputs, Operand};
pub use cast::{cast_datetime, cast_timedelta};
pub use convert::{datetime_from_input, timedelta_from_input, ParseIso8601};
pub use meta::{gcd_metadata, promote_types};
pub use text::parse_typestr;
pub use units::{conversion_factor, metadata_divides, units_factor};

/// The reserved not-a-time sentinel, in any unit.
///
/// Every arithmetic operation or cast on NaT yields NaT. Host-facing
/// comparisons treat NaT as unequal to everything, itself included;
/// the Rust wrapper types keep plain structural equality.
pub const NAT: i64 = i64::MIN;

// ===== Unit =====

/// Tick granularity of a packed value, ordered coarsest to finest.
///
/// `Year`, `Month` and `BusinessDay` are nonlinear: they have no
/// constant conversion factor to the other units. `Generic` means the
/// unit is not yet fixed; it participates as an identity in metadata
/// GCD and promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Unit {
    Year,
    Month,
    Week,
    BusinessDay,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
    Microsecond,
    Nanosecond,
    Picosecond,
    Femtosecond,
    Attosecond,
    Generic,
}

impl Unit {
    /// All units in order, `Generic` last.
    pub const ALL: [Unit; 15] = [
        Unit::Year,
        Unit::Month,
        Unit::Week,
        Unit::BusinessDay,
        Unit::Day,
        Unit::Hour,
        Unit::Minute,
        Unit::Second,
        Unit::Millisecond,
        Unit::Microsecond,
        Unit::Nanosecond,
        Unit::Picosecond,
        Unit::Femtosecond,
        Unit::Attosecond,
        Unit::Generic,
    ];

    /// The short textual name (`"Y"`, `"ms"`, ..., `"generic"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Unit::Year => "Y",
            Unit::Month => "M",
            Unit::Week => "W",
            Unit::BusinessDay => "B",
            Unit::Day => "D",
            Unit::Hour => "h",
            Unit::Minute => "m",
            Unit::Second => "s",
            Unit::Millisecond => "ms",
            Unit::Microsecond => "us",
            Unit::Nanosecond => "ns",
            Unit::Picosecond => "ps",
            Unit::Femtosecond => "fs",
            Unit::Attosecond => "as",
            Unit::Generic => "generic",
        }
    }

    /// True for `Year`, `Month` and `BusinessDay`, whose length in
    /// days is not constant.
    pub fn is_nonlinear(self) -> bool {
        matches!(self, Unit::Year | Unit::Month | Unit::BusinessDay)
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    pub(crate) fn from_index(index: usize) -> Unit {
        Unit::ALL[index]
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ===== Metadata =====

/// A unit together with a positive integer multiplier: one tick of a
/// value with metadata `(unit, num)` spans `num` units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Metadata {
    pub unit: Unit,
    pub num: i32,
}

impl Metadata {
    /// Metadata whose unit is still to be inferred.
    pub const GENERIC: Metadata = Metadata {
        unit: Unit::Generic,
        num: 1,
    };

    pub fn new(unit: Unit, num: i32) -> Metadata {
        Metadata { unit, num }
    }

    /// Metadata with the default multiplier of 1.
    pub fn from_unit(unit: Unit) -> Metadata {
        Metadata { unit, num: 1 }
    }

    /// Equivalence ignores the multiplier when both units are
    /// `Generic` (the multiplier is conventional there).
    pub fn equivalent(self, other: Metadata) -> bool {
        if self.unit == Unit::Generic && other.unit == Unit::Generic {
            return true;
        }
        self.unit == other.unit && self.num == other.num
    }
}

// ===== Casting levels =====

/// Casting strictness, loosest to strictest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Casting {
    /// Anything goes.
    Unsafe,
    /// Source and destination must sit on the same side of the
    /// date/time (datetime) or nonlinear/linear (timedelta) partition.
    SameKind,
    /// SameKind, towards finer-or-equal units, and the destination
    /// metadata must divide the source evenly.
    Safe,
    /// Unit and multiplier must match exactly.
    Equiv,
}

impl Casting {
    pub fn as_str(self) -> &'static str {
        match self {
            Casting::Unsafe => "unsafe",
            Casting::SameKind => "same_kind",
            Casting::Safe => "safe",
            Casting::Equiv => "equiv",
        }
    }
}

impl fmt::Display for Casting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ===== Value kinds and scalars =====

/// Flavor of a packed value: an instant since the 1970 epoch, or a
/// bare duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Datetime,
    Timedelta,
}

/// An instant: ticks of `meta` since 1970-01-01T00:00:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Datetime {
    pub value: i64,
    pub meta: Metadata,
}

impl Datetime {
    pub fn new(value: i64, meta: Metadata) -> Datetime {
        Datetime { value, meta }
    }

    /// The not-a-time value in the given metadata.
    pub fn nat(meta: Metadata) -> Datetime {
        Datetime { value: NAT, meta }
    }

    pub fn is_nat(self) -> bool {
        self.value == NAT
    }

    /// Build from a broken-down civil time at the given metadata.
    pub fn from_civil(civil: &CivilTime, meta: Metadata) -> Result<Datetime, Error> {
        Ok(Datetime {
            value: codec::civil_to_value(meta, civil)?,
            meta,
        })
    }

    /// Broken-down civil form of this instant.
    pub fn to_civil(self) -> Result<CivilTime, Error> {
        codec::value_to_civil(self.meta, self.value)
    }

    /// Cast to another metadata, enforcing the given casting rule.
    /// NaT slips through every rule.
    pub fn cast(self, dst: Metadata, casting: Casting) -> Result<Datetime, Error> {
        if !self.is_nat() {
            cast::check_datetime_cast("datetime scalar", self.meta, dst, casting)?;
        }
        Ok(Datetime {
            value: cast::cast_datetime(self.meta, dst, self.value)?,
            meta: dst,
        })
    }
}

impl fmt::Display for Datetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nat() {
            write!(f, "NaT{}", self.meta)
        } else {
            write!(f, "{}{}", self.value, self.meta)
        }
    }
}

/// A duration: a signed count of `meta` ticks, with no epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timedelta {
    pub value: i64,
    pub meta: Metadata,
}

impl Timedelta {
    pub fn new(value: i64, meta: Metadata) -> Timedelta {
        Timedelta { value, meta }
    }

    pub fn nat(meta: Metadata) -> Timedelta {
        Timedelta { value: NAT, meta }
    }

    pub fn is_nat(self) -> bool {
        self.value == NAT
    }

    /// Cast to another metadata, enforcing the given casting rule.
    /// NaT slips through every rule.
    pub fn cast(self, dst: Metadata, casting: Casting) -> Result<Timedelta, Error> {
        if !self.is_nat() {
            cast::check_timedelta_cast("timedelta scalar", self.meta, dst, casting)?;
        }
        Ok(Timedelta {
            value: cast::cast_timedelta(self.meta, dst, self.value)?,
            meta: dst,
        })
    }
}

impl fmt::Display for Timedelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nat() {
            write!(f, "NaT{}", self.meta)
        } else {
            write!(f, "{}{}", self.value, self.meta)
        }
    }
}

// ===== Broken-down civil time =====

/// Broken-down calendar form of an instant.
///
/// `microsecond`, `picosecond` and `attosecond` each hold `0..1_000_000`
/// and together cover the full sub-second range. NaT is signaled by
/// `year == i64::MIN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CivilTime {
    pub year: i64,
    pub month: i32,
    pub day: i32,
    pub hour: i32,
    pub minute: i32,
    pub second: i32,
    pub microsecond: i32,
    pub picosecond: i32,
    pub attosecond: i32,
}

impl Default for CivilTime {
    /// The 1970-01-01T00:00:00 epoch.
    fn default() -> CivilTime {
        CivilTime {
            year: 1970,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
            microsecond: 0,
            picosecond: 0,
            attosecond: 0,
        }
    }
}

impl CivilTime {
    /// The not-a-time struct.
    pub fn nat() -> CivilTime {
        CivilTime {
            year: NAT,
            ..CivilTime::default()
        }
    }

    pub fn is_nat(&self) -> bool {
        self.year == NAT
    }

    /// A date at midnight, validating the calendar components.
    pub fn from_ymd(year: i64, month: i32, day: i32) -> Result<CivilTime, Error> {
        if !(1..=12).contains(&month) || day < 1 || day > calendar::days_in_month(year, month) {
            return Err(Error::InvalidDate { year, month, day });
        }
        Ok(CivilTime {
            year,
            month,
            day,
            ..CivilTime::default()
        })
    }

    /// A date and wall-clock time. A second value of 60 is accepted
    /// here (leap-second input) but is never produced by the codec.
    pub fn from_ymd_hms(
        year: i64,
        month: i32,
        day: i32,
        hour: i32,
        minute: i32,
        second: i32,
    ) -> Result<CivilTime, Error> {
        let mut civil = CivilTime::from_ymd(year, month, day)?;
        if !(0..24).contains(&hour) || !(0..60).contains(&minute) || !(0..=60).contains(&second) {
            return Err(Error::InvalidTime {
                hour,
                minute,
                second,
                microsecond: 0,
            });
        }
        civil.hour = hour;
        civil.minute = minute;
        civil.second = second;
        Ok(civil)
    }
}

impl fmt::Display for CivilTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nat() {
            return f.write_str("NaT");
        }
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )?;
        if self.attosecond != 0 {
            write!(
                f,
                ".{:06}{:06}{:06}",
                self.microsecond, self.picosecond, self.attosecond
            )
        } else if self.picosecond != 0 {
            write!(f, ".{:06}{:06}", self.microsecond, self.picosecond)
        } else if self.microsecond != 0 {
            write!(f, ".{:06}", self.microsecond)
        } else {
            Ok(())
        }
    }
}

// ===== Errors =====

/// The four failure families of the engine, for mapping onto host
/// exception types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Wrong input shape or unparsable metadata text.
    Type,
    /// Invalid calendar components or arguments.
    Value,
    /// An exact-arithmetic accumulator left its safe range.
    Overflow,
    /// A cast refused under the chosen strictness level.
    Casting,
}

/// Everything that can go wrong in the engine. NaT is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("invalid datetime metadata string {text:?} at position {position}")]
    MetadataSyntax { text: String, position: usize },
    #[error("invalid datetime unit {0:?} in metadata")]
    UnknownUnit(String),
    #[error("invalid datetime type string {0:?}")]
    TypeSyntax(String),
    #[error("datetime metadata tuple must have 2 to 4 items")]
    TupleShape,
    #[error("invalid values in datetime metadata tuple")]
    TupleValues,
    #[error(
        "cannot get a common metadata divisor for {left} and {right} \
         because they have incompatible nonlinear base units"
    )]
    IncompatibleUnits { left: String, right: String },
    #[error("cannot cast {what} from {src} to {dst} according to the rule {rule}")]
    CastRefused {
        what: &'static str,
        src: String,
        dst: String,
        rule: Casting,
    },

    #[error("cannot create a datetime value other than NaT with generic units")]
    GenericUnit,
    #[error("cannot convert from specific units to generic units")]
    ToGeneric,
    #[error("a divisor cannot be combined with generic units")]
    GenericDivisor,
    #[error("divisor ({0}) is not a multiple of a lower unit in datetime metadata")]
    DivisorMismatch(i32),
    #[error("converting an integer to a datetime requires a specified unit")]
    UnitRequired,
    #[error("invalid date ({year}-{month}-{day})")]
    InvalidDate { year: i64, month: i32, day: i32 },
    #[error("invalid time ({hour}:{minute}:{second}.{microsecond})")]
    InvalidTime {
        hour: i32,
        minute: i32,
        second: i32,
        microsecond: i32,
    },
    #[error("could not convert object to a datetime value")]
    UnconvertibleDatetime,
    #[error("could not convert object to a timedelta value")]
    UnconvertibleTimedelta,
    #[error("arange needs at least a stopping value")]
    RangeNeedsStop,
    #[error("arange requires both a start and a stop for datetime ranges")]
    RangeNeedsStart,
    #[error("cannot use a datetime as the step of arange")]
    RangeDatetimeStep,
    #[error("arange cannot use NaT bounds or steps")]
    RangeNat,
    #[error("arange step cannot be zero")]
    RangeZeroStep,

    #[error("integer overflow computing the conversion factor between datetime units {src} and {dst}")]
    FactorOverflow { src: Unit, dst: Unit },
    #[error("integer overflow getting a common metadata divisor for {left} and {right}")]
    GcdOverflow { left: String, right: String },
    #[error("integer overflow applying the unit multiplier to a datetime value")]
    MultiplierOverflow,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MetadataSyntax { .. }
            | Error::UnknownUnit(_)
            | Error::TypeSyntax(_)
            | Error::TupleShape
            | Error::TupleValues
            | Error::IncompatibleUnits { .. } => ErrorKind::Type,
            Error::CastRefused { .. } => ErrorKind::Casting,
            Error::GenericUnit
            | Error::ToGeneric
            | Error::GenericDivisor
            | Error::DivisorMismatch(_)
            | Error::UnitRequired
            | Error::InvalidDate { .. }
            | Error::InvalidTime { .. }
            | Error::UnconvertibleDatetime
            | Error::UnconvertibleTimedelta
            | Error::RangeNeedsStop
            | Error::RangeNeedsStart
            | Error::RangeDatetimeStep
            | Error::RangeNat
            | Error::RangeZeroStep => ErrorKind::Value,
            Error::FactorOverflow { .. }
            | Error::GcdOverflow { .. }
            | Error::MultiplierOverflow => ErrorKind::Overflow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_order_matches_granularity() {
        assert!(Unit::Year < Unit::Month);
        assert!(Unit::Week < Unit::BusinessDay);
        assert!(Unit::BusinessDay < Unit::Day);
        assert!(Unit::Day < Unit::Hour);
        assert!(Unit::Attosecond < Unit::Generic);
        for (i, unit) in Unit::ALL.iter().enumerate() {
            assert_eq!(unit.index(), i);
            assert_eq!(Unit::from_index(i), *unit);
        }
    }

    #[test]
    fn generic_metadata_equivalence_ignores_num() {
        let g1 = Metadata::new(Unit::Generic, 1);
        let g7 = Metadata::new(Unit::Generic, 7);
        assert!(g1.equivalent(g7));
        assert!(!Metadata::new(Unit::Day, 1).equivalent(Metadata::new(Unit::Day, 2)));
        assert!(Metadata::new(Unit::Day, 3).equivalent(Metadata::new(Unit::Day, 3)));
    }

    #[test]
    fn civil_time_validation() {
        assert!(CivilTime::from_ymd(2000, 2, 29).is_ok());
        assert!(matches!(
            CivilTime::from_ymd(1900, 2, 29),
            Err(Error::InvalidDate { .. })
        ));
        assert!(matches!(
            CivilTime::from_ymd(2000, 13, 1),
            Err(Error::InvalidDate { .. })
        ));
        // Leap-second input is accepted.
        assert!(CivilTime::from_ymd_hms(2016, 12, 31, 23, 59, 60).is_ok());
        assert!(CivilTime::from_ymd_hms(2016, 12, 31, 24, 0, 0).is_err());
    }

    #[test]
    fn nat_struct_round_trip_flags() {
        let nat = CivilTime::nat();
        assert!(nat.is_nat());
        assert_eq!(nat.to_string(), "NaT");
        assert!(Datetime::nat(Metadata::from_unit(Unit::Second)).is_nat());
    }

    #[test]
    fn error_kinds_partition() {
        assert_eq!(Error::GenericUnit.kind(), ErrorKind::Value);
        assert_eq!(Error::UnknownUnit("q".into()).kind(), ErrorKind::Type);
        assert_eq!(Error::MultiplierOverflow.kind(), ErrorKind::Overflow);
        let refused = Error::CastRefused {
            what: "datetime scalar",
            src: "[D]".into(),
            dst: "[h]".into(),
            rule: Casting::SameKind,
        };
        assert_eq!(refused.kind(), ErrorKind::Casting);
        assert_eq!(
            refused.to_string(),
            "cannot cast datetime scalar from [D] to [h] according to the rule same_kind"
        );
    }
}

//! Conversion between heterogeneous host inputs and packed values.
//!
//! Host objects reach the engine as enum inputs carrying either text,
//! raw ticks, an already-tagged scalar, or duck-typed attribute
//! bundles read off date/datetime/timedelta objects. ISO 8601 parsing
//! stays outside the crate behind [`ParseIso8601`].

use crate::calendar::{add_minutes, days_in_month};
use crate::cast::{cast_datetime, cast_timedelta, check_datetime_cast, check_timedelta_cast};
use crate::codec::{civil_to_value, value_to_civil};
use crate::meta::gcd_metadata;
use crate::{
    Casting, CivilTime, Datetime, Error, ErrorKind, Metadata, Timedelta, Unit, NAT,
};

const MICROS_PER_SECOND: i64 = 1_000_000;
const MICROS_PER_MINUTE: i64 = 60 * MICROS_PER_SECOND;
const MICROS_PER_HOUR: i64 = 60 * MICROS_PER_MINUTE;
const MICROS_PER_DAY: i64 = 24 * MICROS_PER_HOUR;

// ===== External collaborator =====

/// ISO 8601 parsing is out of scope for the engine; the host supplies
/// it. The parser returns the broken-down time together with the
/// finest unit the text actually used.
pub trait ParseIso8601 {
    fn parse_iso_8601(&self, text: &str) -> Result<(CivilTime, Unit), Error>;
}

impl<F> ParseIso8601 for F
where
    F: Fn(&str) -> Result<(CivilTime, Unit), Error>,
{
    fn parse_iso_8601(&self, text: &str) -> Result<(CivilTime, Unit), Error> {
        self(text)
    }
}

// ===== Duck-typed attribute bundles =====

/// The date attributes of a host calendar object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateFields {
    pub year: i64,
    pub month: i32,
    pub day: i32,
}

/// The clock attributes of a host date-time object, with the fixed
/// UTC offset reported by its time zone (in whole minutes), if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeFields {
    pub hour: i32,
    pub minute: i32,
    pub second: i32,
    pub microsecond: i32,
    pub utc_offset_minutes: Option<i64>,
}

// ===== Inputs =====

/// Everything a datetime value can be converted from.
#[derive(Debug, Clone, Copy)]
pub enum DatetimeInput<'a> {
    /// ISO 8601 text, handed to the external parser.
    Text(&'a str),
    /// A raw integer tick count; requires the unit to be known.
    Ticks(i64),
    /// An existing tagged scalar, retagged or cast.
    Scalar(Datetime),
    /// An object exposing only year/month/day.
    Date(DateFields),
    /// An object exposing the full date and clock attributes.
    DateTime(DateFields, TimeFields),
    /// The host's null value.
    Null,
    /// Anything unrecognized.
    Other,
}

/// Everything a timedelta value can be converted from.
#[derive(Debug, Clone, Copy)]
pub enum TimedeltaInput<'a> {
    /// `"NaT"` (any case), the empty string, or a bare integer count.
    Text(&'a str),
    /// A raw integer tick count.
    Ticks(i64),
    /// An existing tagged scalar, retagged or cast.
    Scalar(Timedelta),
    /// An object exposing days/seconds/microseconds.
    Delta {
        days: i64,
        seconds: i64,
        microseconds: i64,
    },
    /// The host's null value.
    Null,
    /// Anything unrecognized.
    Other,
}

// ===== Datetime conversion =====

/// Validates the attribute bundles and builds the civil form,
/// applying the UTC offset. Returns the best unit for the object:
/// days for a plain date, microseconds otherwise.
fn civil_from_fields(
    date: DateFields,
    time: Option<TimeFields>,
) -> Result<(CivilTime, Unit), Error> {
    if date.month < 1
        || date.month > 12
        || date.day < 1
        || date.day > days_in_month(date.year, date.month)
    {
        return Err(Error::InvalidDate {
            year: date.year,
            month: date.month,
            day: date.day,
        });
    }

    let mut civil = CivilTime {
        year: date.year,
        month: date.month,
        day: date.day,
        ..CivilTime::default()
    };

    let Some(time) = time else {
        return Ok((civil, Unit::Day));
    };

    if !(0..24).contains(&time.hour)
        || !(0..60).contains(&time.minute)
        || !(0..60).contains(&time.second)
        || !(0..1_000_000).contains(&time.microsecond)
    {
        return Err(Error::InvalidTime {
            hour: time.hour,
            minute: time.minute,
            second: time.second,
            microsecond: time.microsecond,
        });
    }

    civil.hour = time.hour;
    civil.minute = time.minute;
    civil.second = time.second;
    civil.microsecond = time.microsecond;

    // A fixed offset shifts the local reading back to UTC.
    if let Some(offset_minutes) = time.utc_offset_minutes {
        add_minutes(&mut civil, -offset_minutes);
    }

    Ok((civil, Unit::Microsecond))
}

fn datetime_from_fields(
    meta: &mut Option<Metadata>,
    date: DateFields,
    time: Option<TimeFields>,
    casting: Casting,
    what: &'static str,
) -> Result<i64, Error> {
    let (civil, best_unit) = civil_from_fields(date, time)?;
    match meta {
        None => {
            let adopted = Metadata::from_unit(best_unit);
            *meta = Some(adopted);
            civil_to_value(adopted, &civil)
        }
        Some(target) => {
            check_datetime_cast(what, Metadata::from_unit(best_unit), *target, casting)?;
            civil_to_value(*target, &civil)
        }
    }
}

/// Converts one input into a datetime value.
///
/// `meta` is in-out: `None` means the unit is still unknown, and the
/// conversion fills it in from the input; `Some` fixes the target and
/// gates unit changes through the casting rule. Under `Unsafe`
/// casting unrecognized inputs become NaT, and under `SameKind` the
/// host's null becomes NaT.
pub fn datetime_from_input(
    meta: &mut Option<Metadata>,
    input: &DatetimeInput<'_>,
    casting: Casting,
    parser: &impl ParseIso8601,
) -> Result<i64, Error> {
    match *input {
        DatetimeInput::Text(text) => {
            let (civil, detected) = parser.parse_iso_8601(text)?;
            let target = match meta {
                Some(target) => *target,
                None => {
                    let adopted = Metadata::from_unit(detected);
                    *meta = Some(adopted);
                    adopted
                }
            };
            civil_to_value(target, &civil)
        }

        // Raw integers are taken as-is, never scaled.
        DatetimeInput::Ticks(value) => match meta {
            Some(target) if target.unit != Unit::Generic => Ok(value),
            _ => Err(Error::UnitRequired),
        },

        DatetimeInput::Scalar(scalar) => match meta {
            None => {
                *meta = Some(scalar.meta);
                Ok(scalar.value)
            }
            Some(target) => {
                // NaT slips through any casting rule.
                if !scalar.is_nat() {
                    check_datetime_cast("datetime scalar", scalar.meta, *target, casting)?;
                }
                cast_datetime(scalar.meta, *target, scalar.value)
            }
        },

        DatetimeInput::Date(date) => {
            datetime_from_fields(meta, date, None, casting, "date object")
        }
        DatetimeInput::DateTime(date, time) => {
            datetime_from_fields(meta, date, Some(time), casting, "datetime object")
        }

        DatetimeInput::Null | DatetimeInput::Other => {
            let is_null = matches!(input, DatetimeInput::Null);
            if casting == Casting::Unsafe || (is_null && casting == Casting::SameKind) {
                if meta.is_none() {
                    *meta = Some(Metadata::GENERIC);
                }
                Ok(NAT)
            } else {
                Err(Error::UnconvertibleDatetime)
            }
        }
    }
}

// ===== Timedelta conversion =====

/// Converts one input into a timedelta value, mirroring
/// [`datetime_from_input`]. Raw integers and integer text default to
/// generic units when the unit is unknown.
pub fn timedelta_from_input(
    meta: &mut Option<Metadata>,
    input: &TimedeltaInput<'_>,
    casting: Casting,
) -> Result<i64, Error> {
    match *input {
        TimedeltaInput::Text(text) => {
            let parsed = if text.is_empty() || text.eq_ignore_ascii_case("nat") {
                Some(NAT)
            } else {
                text.parse::<i64>().ok()
            };
            match parsed {
                Some(value) => {
                    if meta.is_none() {
                        *meta = Some(Metadata::GENERIC);
                    }
                    Ok(value)
                }
                None => timedelta_unrecognized(meta, false, casting),
            }
        }

        TimedeltaInput::Ticks(value) => {
            if meta.is_none() {
                *meta = Some(Metadata::GENERIC);
            }
            Ok(value)
        }

        TimedeltaInput::Scalar(scalar) => match meta {
            None => {
                *meta = Some(scalar.meta);
                Ok(scalar.value)
            }
            Some(target) => {
                if !scalar.is_nat() {
                    check_timedelta_cast("timedelta scalar", scalar.meta, *target, casting)?;
                }
                cast_timedelta(scalar.meta, *target, scalar.value)
            }
        },

        TimedeltaInput::Delta {
            days,
            seconds,
            microseconds,
        } => {
            let ticks = days * MICROS_PER_DAY + seconds * MICROS_PER_SECOND + microseconds;
            match meta {
                None => {
                    *meta = Some(Metadata::from_unit(Unit::Microsecond));
                    Ok(ticks)
                }
                Some(target) => {
                    // The coarsest unit in {us, ms, s, m, D, W} whose
                    // count stays exact gates the cast; a count of
                    // whole weeks reports weeks.
                    let best = if ticks % 1000 != 0 {
                        Unit::Microsecond
                    } else if ticks % MICROS_PER_SECOND != 0 {
                        Unit::Millisecond
                    } else if ticks % MICROS_PER_MINUTE != 0 {
                        Unit::Second
                    } else if ticks % MICROS_PER_HOUR != 0 {
                        Unit::Minute
                    } else if ticks % MICROS_PER_DAY != 0 {
                        Unit::Day
                    } else {
                        Unit::Week
                    };
                    check_timedelta_cast(
                        "timedelta object",
                        Metadata::from_unit(best),
                        *target,
                        casting,
                    )?;
                    cast_timedelta(Metadata::from_unit(Unit::Microsecond), *target, ticks)
                }
            }
        }

        TimedeltaInput::Null | TimedeltaInput::Other => {
            let is_null = matches!(input, TimedeltaInput::Null);
            timedelta_unrecognized(meta, is_null, casting)
        }
    }
}

fn timedelta_unrecognized(
    meta: &mut Option<Metadata>,
    is_null: bool,
    casting: Casting,
) -> Result<i64, Error> {
    if casting == Casting::Unsafe || (is_null && casting == Casting::SameKind) {
        if meta.is_none() {
            *meta = Some(Metadata::GENERIC);
        }
        Ok(NAT)
    } else {
        Err(Error::UnconvertibleTimedelta)
    }
}

// ===== Recursive unit inference =====

/// A leaf input or a nested sequence of them. Rust ownership cannot
/// express a sequence containing itself, so no cycle guard is needed.
#[derive(Debug, Clone, Copy)]
pub enum Nested<'a, T> {
    Leaf(T),
    Sequence(&'a [Nested<'a, T>]),
}

/// Infers datetime metadata for a nested input by GCD-merging every
/// leaf's metadata, starting from generic.
pub fn find_datetime_unit(
    obj: &Nested<'_, DatetimeInput<'_>>,
    parser: &impl ParseIso8601,
) -> Result<Metadata, Error> {
    let mut meta = Metadata::GENERIC;
    descend_datetime(obj, &mut meta, parser)?;
    Ok(meta)
}

fn descend_datetime(
    obj: &Nested<'_, DatetimeInput<'_>>,
    meta: &mut Metadata,
    parser: &impl ParseIso8601,
) -> Result<(), Error> {
    let input = match obj {
        Nested::Sequence(items) => {
            for item in *items {
                descend_datetime(item, meta, parser)?;
            }
            return Ok(());
        }
        Nested::Leaf(input) => input,
    };

    let leaf_meta = match *input {
        DatetimeInput::Scalar(scalar) => Some(scalar.meta),
        DatetimeInput::Text(_) => {
            let mut detected = None;
            match datetime_from_input(&mut detected, input, Casting::Unsafe, parser) {
                Ok(_) => detected,
                // Unparsable text does not constrain the unit.
                Err(err) if err.kind() == ErrorKind::Value => None,
                Err(err) => return Err(err),
            }
        }
        DatetimeInput::Date(_) => Some(Metadata::from_unit(Unit::Day)),
        DatetimeInput::DateTime(..) => Some(Metadata::from_unit(Unit::Microsecond)),
        _ => None,
    };

    if let Some(leaf) = leaf_meta {
        *meta = gcd_metadata(*meta, leaf, false, false)?;
    }
    Ok(())
}

/// Infers timedelta metadata for a nested input. Tagged scalars merge
/// strictly; duck-typed delta objects contribute microseconds.
pub fn find_timedelta_unit(obj: &Nested<'_, TimedeltaInput<'_>>) -> Result<Metadata, Error> {
    let mut meta = Metadata::GENERIC;
    descend_timedelta(obj, &mut meta)?;
    Ok(meta)
}

fn descend_timedelta(
    obj: &Nested<'_, TimedeltaInput<'_>>,
    meta: &mut Metadata,
) -> Result<(), Error> {
    let input = match obj {
        Nested::Sequence(items) => {
            for item in *items {
                descend_timedelta(item, meta)?;
            }
            return Ok(());
        }
        Nested::Leaf(input) => input,
    };

    match *input {
        TimedeltaInput::Scalar(scalar) => {
            *meta = gcd_metadata(*meta, scalar.meta, true, true)?;
        }
        TimedeltaInput::Delta { .. } => {
            *meta = gcd_metadata(*meta, Metadata::from_unit(Unit::Microsecond), false, false)?;
        }
        // There is no timedelta text parser; text, integers and
        // unrecognized objects do not constrain the unit.
        _ => {}
    }
    Ok(())
}

// ===== Back to host objects =====

/// A datetime value rendered for the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatetimeObject {
    /// NaT, or any value in generic units.
    NotATime,
    /// Too fine, too far, or on a leap second: the raw tick count.
    Ticks(i64),
    /// Day precision or coarser.
    Date(DateFields),
    /// Time precision down to microseconds.
    DateTime { date: DateFields, time: TimeFields },
}

/// Renders a datetime value as a host date, date-time, raw ticks or
/// nothing.
///
/// Units finer than microseconds, years outside the host calendar
/// range 1..=9999 and leap seconds all fall back to raw ticks.
pub fn datetime_to_object(meta: Metadata, value: i64) -> Result<DatetimeObject, Error> {
    if value == NAT || meta.unit == Unit::Generic {
        return Ok(DatetimeObject::NotATime);
    }
    if meta.unit > Unit::Microsecond {
        return Ok(DatetimeObject::Ticks(value));
    }

    let civil = value_to_civil(meta, value)?;
    if civil.year < 1 || civil.year > 9999 || civil.second == 60 {
        return Ok(DatetimeObject::Ticks(value));
    }

    let date = DateFields {
        year: civil.year,
        month: civil.month,
        day: civil.day,
    };
    if meta.unit > Unit::Day {
        Ok(DatetimeObject::DateTime {
            date,
            time: TimeFields {
                hour: civil.hour,
                minute: civil.minute,
                second: civil.second,
                microsecond: civil.microsecond,
                utc_offset_minutes: None,
            },
        })
    } else {
        Ok(DatetimeObject::Date(date))
    }
}

/// A timedelta value rendered for the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimedeltaObject {
    NotATime,
    /// Nonlinear or generic units, or finer than microseconds.
    Ticks(i64),
    /// Days, seconds and microseconds; the host normalizes signs.
    Delta {
        days: i64,
        seconds: i32,
        microseconds: i32,
    },
}

/// Renders a timedelta value as a days/seconds/microseconds triple
/// where the unit allows it, falling back to raw ticks.
pub fn timedelta_to_object(meta: Metadata, value: i64) -> Result<TimedeltaObject, Error> {
    if value == NAT {
        return Ok(TimedeltaObject::NotATime);
    }
    if meta.unit > Unit::Microsecond || meta.unit.is_nonlinear() || meta.unit == Unit::Generic {
        return Ok(TimedeltaObject::Ticks(value));
    }

    let mut days = value
        .checked_mul(i64::from(meta.num))
        .ok_or(Error::MultiplierOverflow)?;
    let mut seconds: i64 = 0;
    let mut microseconds: i64 = 0;

    match meta.unit {
        Unit::Week => days *= 7,
        Unit::Day => {}
        Unit::Hour => {
            seconds = (days % 24) * 3600;
            days /= 24;
        }
        Unit::Minute => {
            seconds = (days % (24 * 60)) * 60;
            days /= 24 * 60;
        }
        Unit::Second => {
            seconds = days % (24 * 60 * 60);
            days /= 24 * 60 * 60;
        }
        Unit::Millisecond => {
            microseconds = (days % 1000) * 1000;
            days /= 1000;
            seconds = days % (24 * 60 * 60);
            days /= 24 * 60 * 60;
        }
        Unit::Microsecond => {
            microseconds = days % 1_000_000;
            days /= 1_000_000;
            seconds = days % (24 * 60 * 60);
            days /= 24 * 60 * 60;
        }
        _ => unreachable!("filtered above"),
    }

    // Beyond the host timedelta day range, hand back raw ticks.
    if !(-999_999_999..=999_999_999).contains(&days) {
        Ok(TimedeltaObject::Ticks(value))
    } else {
        Ok(TimedeltaObject::Delta {
            days,
            seconds: seconds as i32,
            microseconds: microseconds as i32,
        })
    }
}

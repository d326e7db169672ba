//! Casting lattice and scalar cast executors.
//!
//! Datetimes put a barrier between date units (through days) and time
//! units; timedeltas put it between the nonlinear years/months and
//! everything else. NaT slips through every rule and absorbs every
//! cast.

use crate::codec::{civil_to_value, value_to_civil};
use crate::units::{conversion_factor, metadata_divides};
use crate::{Casting, Error, Metadata, Unit, NAT};

/// Unit-level casting rule for datetime values.
pub fn can_cast_datetime_units(src: Unit, dst: Unit, casting: Casting) -> bool {
    match casting {
        Casting::Unsafe => true,
        // The date/time barrier only; generic must match exactly.
        Casting::SameKind => {
            if src == Unit::Generic || dst == Unit::Generic {
                src == dst
            } else {
                (src <= Unit::Day) == (dst <= Unit::Day)
            }
        }
        // The barrier, and only towards finer-or-equal units.
        Casting::Safe => {
            if src == Unit::Generic || dst == Unit::Generic {
                src == dst
            } else {
                src <= dst && (src <= Unit::Day) == (dst <= Unit::Day)
            }
        }
        Casting::Equiv => src == dst,
    }
}

/// Unit-level casting rule for timedelta values.
pub fn can_cast_timedelta_units(src: Unit, dst: Unit, casting: Casting) -> bool {
    match casting {
        Casting::Unsafe => true,
        Casting::SameKind => {
            if src == Unit::Generic || dst == Unit::Generic {
                src == dst
            } else {
                (src <= Unit::Month) == (dst <= Unit::Month)
            }
        }
        Casting::Safe => {
            if src == Unit::Generic || dst == Unit::Generic {
                src == dst
            } else {
                src <= dst && (src <= Unit::Month) == (dst <= Unit::Month)
            }
        }
        Casting::Equiv => src == dst,
    }
}

/// Metadata-level casting rule for datetime values.
pub fn can_cast_datetime_metadata(src: Metadata, dst: Metadata, casting: Casting) -> bool {
    match casting {
        Casting::Unsafe => true,
        Casting::SameKind => can_cast_datetime_units(src.unit, dst.unit, casting),
        Casting::Safe => {
            can_cast_datetime_units(src.unit, dst.unit, casting)
                && metadata_divides(src, dst, false)
        }
        Casting::Equiv => src.equivalent(dst),
    }
}

/// Metadata-level casting rule for timedelta values.
pub fn can_cast_timedelta_metadata(src: Metadata, dst: Metadata, casting: Casting) -> bool {
    match casting {
        Casting::Unsafe => true,
        Casting::SameKind => can_cast_timedelta_units(src.unit, dst.unit, casting),
        Casting::Safe => {
            can_cast_timedelta_units(src.unit, dst.unit, casting)
                && metadata_divides(src, dst, true)
        }
        Casting::Equiv => src.equivalent(dst),
    }
}

/// Errors unless a datetime cast is allowed under the rule; the
/// message reprints both metadatas and names the rule.
pub fn check_datetime_cast(
    what: &'static str,
    src: Metadata,
    dst: Metadata,
    casting: Casting,
) -> Result<(), Error> {
    if can_cast_datetime_metadata(src, dst, casting) {
        Ok(())
    } else {
        Err(Error::CastRefused {
            what,
            src: src.to_string(),
            dst: dst.to_string(),
            rule: casting,
        })
    }
}

/// Errors unless a timedelta cast is allowed under the rule.
pub fn check_timedelta_cast(
    what: &'static str,
    src: Metadata,
    dst: Metadata,
    casting: Casting,
) -> Result<(), Error> {
    if can_cast_timedelta_metadata(src, dst, casting) {
        Ok(())
    } else {
        Err(Error::CastRefused {
            what,
            src: src.to_string(),
            dst: dst.to_string(),
            rule: casting,
        })
    }
}

/// Casts a single datetime value between metadatas, converting
/// through the broken-down civil form.
pub fn cast_datetime(src: Metadata, dst: Metadata, value: i64) -> Result<i64, Error> {
    if value == NAT {
        return Ok(NAT);
    }
    if src == dst {
        return Ok(value);
    }
    let civil = value_to_civil(src, value)?;
    civil_to_value(dst, &civil)
}

/// Casts a single timedelta value between metadatas by scaling with
/// the exact conversion factor, flooring for negative values.
pub fn cast_timedelta(src: Metadata, dst: Metadata, value: i64) -> Result<i64, Error> {
    if value == NAT {
        return Ok(NAT);
    }
    if src == dst {
        return Ok(value);
    }
    let (num, denom) = conversion_factor(src, dst)?;
    let scaled = value.checked_mul(num).ok_or(Error::MultiplierOverflow)?;
    Ok(scaled.div_euclid(denom))
}

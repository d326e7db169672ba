//! Metadata greatest-common-divisor and type promotion.
//!
//! The GCD of two metadatas is the coarsest metadata that divides
//! evenly into both; it serves as the type-promotion join. Strictness
//! flags control whether nonlinear units may be silently approximated.

use crate::units::{gcd_u64, units_factor};
use crate::{Error, Kind, Metadata, Unit};

/// Computes the greatest common divisor of two metadatas.
///
/// Each strictness flag guards its own operand's nonlinear unit:
/// under a set flag, pairing that operand's years or months with a
/// linear unit (or business days with anything) is an error instead
/// of an approximation.
pub fn gcd_metadata(
    meta1: Metadata,
    meta2: Metadata,
    strict1: bool,
    strict2: bool,
) -> Result<Metadata, Error> {
    // Generic is the identity of the join.
    if meta1.unit == Unit::Generic {
        return Ok(meta2);
    }
    if meta2.unit == Unit::Generic {
        return Ok(meta1);
    }

    let incompatible = || Error::IncompatibleUnits {
        left: meta1.to_string(),
        right: meta2.to_string(),
    };
    let overflow = || Error::GcdOverflow {
        left: meta1.to_string(),
        right: meta2.to_string(),
    };

    let mut num1 = meta1.num as u64;
    let mut num2 = meta2.num as u64;
    let base;

    if meta1.unit == meta2.unit {
        base = meta1.unit;
    } else if meta1.unit == Unit::Year && meta2.unit == Unit::Month {
        base = Unit::Month;
        num1 *= 12;
    } else if meta1.unit == Unit::Month && meta2.unit == Unit::Year {
        base = Unit::Month;
        num2 *= 12;
    } else if meta1.unit == Unit::BusinessDay || meta2.unit == Unit::BusinessDay {
        if strict1 || strict2 {
            return Err(incompatible());
        }
        // Relaxed business-day pairings fall back to calendar days.
        base = Unit::Day;
    } else if meta1.unit == Unit::Year || meta1.unit == Unit::Month {
        if strict1 {
            return Err(incompatible());
        }
        // No even factor exists; adopt the other unit unscaled.
        base = meta2.unit;
    } else if meta2.unit == Unit::Year || meta2.unit == Unit::Month {
        if strict2 {
            return Err(incompatible());
        }
        base = meta1.unit;
    } else {
        // All-linear: scale the coarser side's multiplier down to the
        // finer unit.
        if meta1.unit > meta2.unit {
            base = meta1.unit;
            num2 *= units_factor(meta2.unit, meta1.unit);
            if num2 == 0 {
                return Err(overflow());
            }
        } else {
            base = meta2.unit;
            num1 *= units_factor(meta1.unit, meta2.unit);
            if num1 == 0 {
                return Err(overflow());
            }
        }
    }

    let num = gcd_u64(num1, num2);
    let out_num = i32::try_from(num).map_err(|_| overflow())?;
    if out_num <= 0 {
        return Err(overflow());
    }

    Ok(Metadata {
        unit: base,
        num: out_num,
    })
}

/// Applies the promotion rules between two tagged value types: the
/// metadata join with per-operand strictness for timedeltas, and
/// datetime flavor winning over timedelta.
pub fn promote_types(
    kind1: Kind,
    meta1: Metadata,
    kind2: Kind,
    meta2: Metadata,
) -> Result<(Kind, Metadata), Error> {
    let meta = gcd_metadata(
        meta1,
        meta2,
        kind1 == Kind::Timedelta,
        kind2 == Kind::Timedelta,
    )?;
    let kind = if kind1 == Kind::Datetime || kind2 == Kind::Datetime {
        Kind::Datetime
    } else {
        Kind::Timedelta
    };
    Ok((kind, meta))
}

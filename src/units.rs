//! Exact conversion arithmetic between unit pairs.
//!
//! Linear units convert through a chain of per-step factors; years and
//! months convert through the factor averaged over the 400-year leap
//! cycle, and business days have no factor at all. Accumulators are
//! u64 with a conservative top-8-bit overflow guard.

use crate::{Error, Metadata, Unit};

const OVERFLOW_GUARD: u64 = 0xff00_0000_0000_0000;

/// Scale factor from each unit to the next finer one in declaration
/// order. The entries for years, months and business days are
/// placeholders; those units have no linear factor and callers must
/// special-case them.
const NEXT_FINER_FACTOR: [u64; 15] = [
    1,    // years
    1,    // months
    7,    // weeks -> days (business days absorb no factor)
    1,    // business days
    24,   // days -> hours
    60,   // hours -> minutes
    60,   // minutes -> seconds
    1000, // seconds -> milliseconds
    1000,
    1000,
    1000,
    1000,
    1000,
    1,    // attoseconds are the finest unit
    0,    // generic has no conversion
];

/// Product of the per-step factors from `big` down to `little`.
///
/// Does not validate that `big` is actually coarser or that the units
/// are not generic. Returns 0 when the accumulator's top 8 bits become
/// nonzero; the margin dwarfs every per-step factor.
pub fn units_factor(big: Unit, little: Unit) -> u64 {
    let mut factor: u64 = 1;
    let mut unit = big.index();
    while little.index() > unit {
        factor *= NEXT_FINER_FACTOR[unit];
        if factor & OVERFLOW_GUARD != 0 {
            return 0;
        }
        unit += 1;
    }
    factor
}

/// Euclidean GCD on u64; `gcd(0, n) == n`.
pub(crate) fn gcd_u64(mut x: u64, mut y: u64) -> u64 {
    if x > y {
        core::mem::swap(&mut x, &mut y);
    }
    while x != y && y != 0 {
        let tmp = x % y;
        x = y;
        y = tmp;
    }
    x
}

fn checked_units_factor(big: Unit, little: Unit, src: Unit, dst: Unit) -> Result<u64, Error> {
    match units_factor(big, little) {
        0 => Err(Error::FactorOverflow { src, dst }),
        factor => Ok(factor),
    }
}

/// The reduced rational `(num, den)` such that a value tagged `src`
/// equals `value · num / den` in `dst`.
///
/// A generic source retags with no scaling; converting a specific unit
/// to generic is an error. Conversions between years or months and the
/// linear units use the factor averaged over the 400-year leap cycle.
pub fn conversion_factor(src: Metadata, dst: Metadata) -> Result<(i64, i64), Error> {
    if src.unit == Unit::Generic {
        return Ok((1, 1));
    }
    if dst.unit == Unit::Generic {
        return Err(Error::ToGeneric);
    }

    let overflow = || Error::FactorOverflow {
        src: src.unit,
        dst: dst.unit,
    };

    let (small, big, swapped) = if src.unit <= dst.unit {
        (src.unit, dst.unit, false)
    } else {
        (dst.unit, src.unit, true)
    };

    let mut num: u64 = 1;
    let mut denom: u64 = 1;

    if small != big {
        if small == Unit::Year {
            match big {
                Unit::Month => num = 12,
                Unit::Week => {
                    num = 97 + 400 * 365;
                    denom = 400 * 7;
                }
                Unit::BusinessDay => {
                    // 97 + 400*365 is divisible by 7, so the number of
                    // business days in 400 years is exact.
                    num = (97 + 400 * 365) * 5 / 7;
                    denom = 400;
                }
                _ => {
                    num = 97 + 400 * 365;
                    denom = 400;
                    num = num
                        .checked_mul(checked_units_factor(Unit::Day, big, src.unit, dst.unit)?)
                        .ok_or_else(overflow)?;
                }
            }
        } else if small == Unit::Month {
            if big == Unit::Week {
                num = 97 + 400 * 365;
                denom = 400 * 12 * 7;
            } else {
                num = 97 + 400 * 365;
                denom = 400 * 12;
                if big == Unit::BusinessDay {
                    num *= 5;
                    denom *= 7;
                }
                num = num
                    .checked_mul(checked_units_factor(Unit::Day, big, src.unit, dst.unit)?)
                    .ok_or_else(overflow)?;
            }
        } else {
            num = checked_units_factor(small, big, src.unit, dst.unit)?;
        }
    }

    if swapped {
        core::mem::swap(&mut num, &mut denom);
    }

    num = num.checked_mul(src.num as u64).ok_or_else(overflow)?;
    denom = denom.checked_mul(dst.num as u64).ok_or_else(overflow)?;

    let gcd = gcd_u64(num, denom);
    Ok(((num / gcd) as i64, (denom / gcd) as i64))
}

/// Whether `divisor · k == dividend` for some positive integer `k`
/// once both are scaled to a common unit.
///
/// Generic divides into anything and nothing else divides into
/// generic. Business days are incompatible with every other unit;
/// years and months are mutually commensurable (factor 12), and any
/// other pairing with years or months is rejected under
/// `strict_nonlinear` and conservatively accepted otherwise.
pub fn metadata_divides(dividend: Metadata, divisor: Metadata, strict_nonlinear: bool) -> bool {
    if divisor.unit == Unit::Generic {
        return true;
    }
    if dividend.unit == Unit::Generic {
        return false;
    }

    let mut num1 = dividend.num as u64;
    let mut num2 = divisor.num as u64;

    if dividend.unit != divisor.unit {
        if dividend.unit == Unit::BusinessDay || divisor.unit == Unit::BusinessDay {
            return false;
        }

        if dividend.unit == Unit::Year {
            if divisor.unit == Unit::Month {
                num1 *= 12;
            } else if strict_nonlinear {
                return false;
            } else {
                return true;
            }
        } else if divisor.unit == Unit::Year {
            if dividend.unit == Unit::Month {
                num2 *= 12;
            } else if strict_nonlinear {
                return false;
            } else {
                return true;
            }
        } else if dividend.unit == Unit::Month || divisor.unit == Unit::Month {
            return !strict_nonlinear;
        }

        // Scale the coarser side's multiplier to the finer unit.
        if dividend.unit > divisor.unit {
            num2 *= units_factor(divisor.unit, dividend.unit);
            if num2 == 0 {
                return false;
            }
        } else {
            num1 *= units_factor(dividend.unit, divisor.unit);
            if num1 == 0 {
                return false;
            }
        }
    }

    if num1 & OVERFLOW_GUARD != 0 || num2 & OVERFLOW_GUARD != 0 {
        return false;
    }

    num1 % num2 == 0
}

// ===== Divisor resolution =====

/// One way to express a fraction of a unit as a whole number of a
/// finer unit.
struct Multiple {
    factor: u32,
    unit: Unit,
}

/// Resolves a `[num unit/den]` denominator into a multiple of a finer
/// unit: the first finer alternative whose per-step factor `den`
/// divides evenly wins.
pub(crate) fn divisor_to_multiple(meta: Metadata, den: i32) -> Result<Metadata, Error> {
    if meta.unit == Unit::Generic {
        return Err(Error::GenericDivisor);
    }

    let subsecond: [Multiple; 2];
    let candidates: &[Multiple] = match meta.unit {
        Unit::Year => &[
            Multiple { factor: 12, unit: Unit::Month },
            Multiple { factor: 52, unit: Unit::Week },
            Multiple { factor: 365, unit: Unit::Day },
        ],
        Unit::Month => &[
            Multiple { factor: 4, unit: Unit::Week },
            Multiple { factor: 30, unit: Unit::Day },
            Multiple { factor: 720, unit: Unit::Hour },
        ],
        Unit::Week => &[
            Multiple { factor: 5, unit: Unit::BusinessDay },
            Multiple { factor: 7, unit: Unit::Day },
            Multiple { factor: 168, unit: Unit::Hour },
            Multiple { factor: 10_080, unit: Unit::Minute },
        ],
        Unit::BusinessDay | Unit::Day => &[
            Multiple { factor: 24, unit: Unit::Hour },
            Multiple { factor: 1440, unit: Unit::Minute },
            Multiple { factor: 86_400, unit: Unit::Second },
        ],
        Unit::Hour => &[
            Multiple { factor: 60, unit: Unit::Minute },
            Multiple { factor: 3600, unit: Unit::Second },
        ],
        Unit::Minute => &[
            Multiple { factor: 60, unit: Unit::Second },
            Multiple { factor: 60_000, unit: Unit::Millisecond },
        ],
        Unit::Second
        | Unit::Millisecond
        | Unit::Microsecond
        | Unit::Nanosecond
        | Unit::Picosecond => {
            subsecond = [
                Multiple {
                    factor: 1000,
                    unit: Unit::from_index(meta.unit.index() + 1),
                },
                Multiple {
                    factor: 1_000_000,
                    unit: Unit::from_index(meta.unit.index() + 2),
                },
            ];
            &subsecond
        }
        Unit::Femtosecond => &[Multiple {
            factor: 1000,
            unit: Unit::Attosecond,
        }],
        Unit::Attosecond => &[],
        Unit::Generic => unreachable!("generic rejected above"),
    };

    for multiple in candidates {
        if multiple.factor % den as u32 == 0 {
            let num = meta
                .num
                .checked_mul((multiple.factor / den as u32) as i32)
                .ok_or(Error::MultiplierOverflow)?;
            return Ok(Metadata {
                unit: multiple.unit,
                num,
            });
        }
    }

    Err(Error::DivisorMismatch(den))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(unit: Unit) -> Metadata {
        Metadata::from_unit(unit)
    }

    #[test]
    fn linear_factors() {
        assert_eq!(units_factor(Unit::Week, Unit::Day), 7);
        assert_eq!(units_factor(Unit::Day, Unit::Hour), 24);
        assert_eq!(units_factor(Unit::Day, Unit::Second), 86_400);
        assert_eq!(units_factor(Unit::Second, Unit::Nanosecond), 1_000_000_000);
        assert_eq!(units_factor(Unit::Hour, Unit::Hour), 1);
    }

    #[test]
    fn factor_overflow_guard() {
        // The guard trips one step past 10^15 on the way from seconds
        // to attoseconds.
        assert_eq!(units_factor(Unit::Second, Unit::Femtosecond), 1_000_000_000_000_000);
        assert_eq!(units_factor(Unit::Second, Unit::Attosecond), 0);
        assert_eq!(units_factor(Unit::Day, Unit::Attosecond), 0);
    }

    #[test]
    fn conversion_factor_scenarios() {
        assert_eq!(
            conversion_factor(m(Unit::Year), m(Unit::Day)).unwrap(),
            (146_097, 400)
        );
        assert_eq!(
            conversion_factor(m(Unit::Week), m(Unit::Day)).unwrap(),
            (7, 1)
        );
        assert_eq!(
            conversion_factor(m(Unit::Year), m(Unit::Month)).unwrap(),
            (12, 1)
        );
        assert_eq!(
            conversion_factor(m(Unit::Month), m(Unit::Year)).unwrap(),
            (1, 12)
        );
        assert_eq!(
            conversion_factor(m(Unit::Hour), m(Unit::Minute)).unwrap(),
            (60, 1)
        );
        assert_eq!(
            conversion_factor(m(Unit::Millisecond), m(Unit::Second)).unwrap(),
            (1, 1000)
        );
        // Multipliers fold in before reduction.
        assert_eq!(
            conversion_factor(Metadata::new(Unit::Day, 2), Metadata::new(Unit::Hour, 36)).unwrap(),
            (4, 3)
        );
        // Business days average 5/7 of a week; 104355/400 reduces by 5.
        assert_eq!(
            conversion_factor(m(Unit::Year), m(Unit::BusinessDay)).unwrap(),
            (20_871, 80)
        );
    }

    #[test]
    fn conversion_factor_generic_rules() {
        assert_eq!(
            conversion_factor(Metadata::GENERIC, m(Unit::Second)).unwrap(),
            (1, 1)
        );
        assert_eq!(
            conversion_factor(Metadata::GENERIC, Metadata::GENERIC).unwrap(),
            (1, 1)
        );
        assert_eq!(
            conversion_factor(m(Unit::Second), Metadata::GENERIC),
            Err(Error::ToGeneric)
        );
    }

    #[test]
    fn conversion_factor_overflow() {
        assert_eq!(
            conversion_factor(m(Unit::Second), m(Unit::Attosecond)),
            Err(Error::FactorOverflow {
                src: Unit::Second,
                dst: Unit::Attosecond
            })
        );
    }

    #[test]
    fn conversion_exactness_law() {
        let pairs = [
            (m(Unit::Year), m(Unit::Day)),
            (m(Unit::Week), m(Unit::Hour)),
            (Metadata::new(Unit::Day, 2), Metadata::new(Unit::Hour, 36)),
            (m(Unit::Month), m(Unit::Second)),
        ];
        for (a, b) in pairs {
            let (num_ab, den_ab) = conversion_factor(a, b).unwrap();
            let (num_ba, den_ba) = conversion_factor(b, a).unwrap();
            assert_eq!(num_ab * den_ba, den_ab * num_ba, "{a:?} <-> {b:?}");
        }
    }

    #[test]
    fn divides_linear_pairs() {
        // An hour divides a day, not the other way around.
        assert!(metadata_divides(m(Unit::Day), m(Unit::Hour), false));
        assert!(!metadata_divides(m(Unit::Hour), m(Unit::Day), false));
        // 30 minutes divide 2 hours.
        assert!(metadata_divides(
            Metadata::new(Unit::Hour, 2),
            Metadata::new(Unit::Minute, 30),
            true
        ));
        assert!(!metadata_divides(
            Metadata::new(Unit::Hour, 1),
            Metadata::new(Unit::Minute, 7),
            true
        ));
    }

    #[test]
    fn divides_generic_and_nonlinear() {
        assert!(metadata_divides(m(Unit::Day), Metadata::GENERIC, true));
        assert!(!metadata_divides(Metadata::GENERIC, m(Unit::Day), false));
        // Business days never mix.
        assert!(!metadata_divides(m(Unit::BusinessDay), m(Unit::Day), false));
        assert!(!metadata_divides(m(Unit::Day), m(Unit::BusinessDay), false));
        // Months divide years exactly.
        assert!(metadata_divides(m(Unit::Year), m(Unit::Month), true));
        assert!(!metadata_divides(m(Unit::Month), m(Unit::Year), true));
        // Relaxed mode answers a conservative yes for other mixes.
        assert!(metadata_divides(m(Unit::Year), m(Unit::Day), false));
        assert!(!metadata_divides(m(Unit::Year), m(Unit::Day), true));
        assert!(metadata_divides(m(Unit::Second), m(Unit::Month), false));
        assert!(!metadata_divides(m(Unit::Second), m(Unit::Month), true));
    }

    #[test]
    fn divisor_resolution() {
        // A thirtieth of a month is a day.
        let meta = divisor_to_multiple(m(Unit::Month), 30).unwrap();
        assert_eq!(meta, Metadata::new(Unit::Day, 1));
        // A hundredth of a second is 10 milliseconds.
        let meta = divisor_to_multiple(m(Unit::Second), 100).unwrap();
        assert_eq!(meta, Metadata::new(Unit::Millisecond, 10));
        // A seventh of a week is a day, a fifth is a business day.
        assert_eq!(
            divisor_to_multiple(m(Unit::Week), 7).unwrap(),
            Metadata::new(Unit::Day, 1)
        );
        assert_eq!(
            divisor_to_multiple(m(Unit::Week), 5).unwrap(),
            Metadata::new(Unit::BusinessDay, 1)
        );
        // The multiplier scales through.
        assert_eq!(
            divisor_to_multiple(Metadata::new(Unit::Hour, 3), 2).unwrap(),
            Metadata::new(Unit::Minute, 90)
        );
        assert_eq!(
            divisor_to_multiple(m(Unit::Second), 7),
            Err(Error::DivisorMismatch(7))
        );
        assert_eq!(
            divisor_to_multiple(m(Unit::Attosecond), 2),
            Err(Error::DivisorMismatch(2))
        );
        assert_eq!(
            divisor_to_multiple(Metadata::GENERIC, 2),
            Err(Error::GenericDivisor)
        );
    }

    #[test]
    fn gcd_helper() {
        assert_eq!(gcd_u64(12, 18), 6);
        assert_eq!(gcd_u64(0, 5), 5);
        assert_eq!(gcd_u64(7, 1), 1);
        assert_eq!(gcd_u64(146_097, 400), 1);
    }
}

//! Codec between packed tick values and broken-down civil time.
//!
//! Both directions dispatch on the metadata unit. The multiplier is
//! applied with floor semantics so that struct→value→struct round
//! trips stay monotone for negative values.

use crate::calendar::{add_minutes, add_seconds, civil_to_days, set_civil_days, weekdays_between};
use crate::{CivilTime, Error, Metadata, Unit, NAT};

/// Packs a civil time into a tick count at the given metadata.
///
/// A NaT struct packs to NaT in any metadata. A non-NaT struct cannot
/// be packed with generic units.
pub fn civil_to_value(meta: Metadata, civil: &CivilTime) -> Result<i64, Error> {
    if civil.is_nat() {
        return Ok(NAT);
    }
    if meta.unit == Unit::Generic {
        return Err(Error::GenericUnit);
    }

    let mut ticks = if meta.unit == Unit::Year {
        civil.year - 1970
    } else if meta.unit == Unit::Month {
        12 * (civil.year - 1970) + i64::from(civil.month - 1)
    } else {
        let days = civil_to_days(civil);
        let hour = i64::from(civil.hour);
        let minute = i64::from(civil.minute);
        let second = i64::from(civil.second);
        let micro = i64::from(civil.microsecond);
        let pico = i64::from(civil.picosecond);
        let atto = i64::from(civil.attosecond);

        match meta.unit {
            Unit::Week => days.div_euclid(7),
            Unit::BusinessDay => weekdays_between(0, days),
            Unit::Day => days,
            Unit::Hour => days * 24 + hour,
            Unit::Minute => (days * 24 + hour) * 60 + minute,
            Unit::Second => ((days * 24 + hour) * 60 + minute) * 60 + second,
            Unit::Millisecond => {
                (((days * 24 + hour) * 60 + minute) * 60 + second) * 1000 + micro / 1000
            }
            Unit::Microsecond => {
                (((days * 24 + hour) * 60 + minute) * 60 + second) * 1_000_000 + micro
            }
            Unit::Nanosecond => {
                ((((days * 24 + hour) * 60 + minute) * 60 + second) * 1_000_000 + micro) * 1000
                    + pico / 1000
            }
            Unit::Picosecond => {
                ((((days * 24 + hour) * 60 + minute) * 60 + second) * 1_000_000 + micro)
                    * 1_000_000
                    + pico
            }
            // The full femtosecond range spans only ±2.6 hours.
            Unit::Femtosecond => {
                (((((days * 24 + hour) * 60 + minute) * 60 + second) * 1_000_000 + micro)
                    * 1_000_000
                    + pico)
                    * 1000
                    + atto / 1000
            }
            // The full attosecond range spans only ±9.2 seconds.
            Unit::Attosecond => {
                (((((days * 24 + hour) * 60 + minute) * 60 + second) * 1_000_000 + micro)
                    * 1_000_000
                    + pico)
                    * 1_000_000
                    + atto
            }
            _ => unreachable!("year, month and generic handled above"),
        }
    };

    if meta.num > 1 {
        ticks = ticks.div_euclid(i64::from(meta.num));
    }

    Ok(ticks)
}

/// Unpacks a tick count at the given metadata into civil time.
///
/// NaT unpacks to the NaT struct. A non-NaT value cannot be unpacked
/// with generic units.
pub fn value_to_civil(meta: Metadata, value: i64) -> Result<CivilTime, Error> {
    if value == NAT {
        return Ok(CivilTime::nat());
    }
    if meta.unit == Unit::Generic {
        return Err(Error::GenericUnit);
    }

    let mut out = CivilTime::default();
    let mut ticks = value
        .checked_mul(i64::from(meta.num))
        .ok_or(Error::MultiplierOverflow)?;

    match meta.unit {
        Unit::Year => out.year = 1970 + ticks,

        Unit::Month => {
            out.year = 1970 + ticks.div_euclid(12);
            out.month = ticks.rem_euclid(12) as i32 + 1;
        }

        Unit::Week => set_civil_days(ticks * 7, &mut out),

        Unit::BusinessDay => {
            // Invert the business-day numbering anchored at Thursday
            // 1970-01-01: [0,1,2,3,4,5,6,7,..] maps to calendar days
            // [0,1,4,5,6,7,8,11,..] and [..,-3,-2,-1] to [..,-3,-2,-1]
            // skipping Saturdays and Sundays. Truncating division is
            // load-bearing in the negative branch.
            let days = if ticks >= 0 {
                7 * ((ticks + 3) / 5) + ((ticks + 3) % 5) - 3
            } else {
                7 * ((ticks - 1) / 5) + ((ticks - 1) % 5) + 1
            };
            set_civil_days(days, &mut out);
        }

        Unit::Day => set_civil_days(ticks, &mut out),

        Unit::Hour => {
            let per_day = 24;
            set_civil_days(ticks.div_euclid(per_day), &mut out);
            ticks = ticks.rem_euclid(per_day);
            out.hour = ticks as i32;
        }

        Unit::Minute => {
            let per_day = 24 * 60;
            set_civil_days(ticks.div_euclid(per_day), &mut out);
            ticks = ticks.rem_euclid(per_day);
            out.hour = (ticks / 60) as i32;
            out.minute = (ticks % 60) as i32;
        }

        Unit::Second => {
            let per_day = 24 * 60 * 60;
            set_civil_days(ticks.div_euclid(per_day), &mut out);
            ticks = ticks.rem_euclid(per_day);
            out.hour = (ticks / (60 * 60)) as i32;
            out.minute = ((ticks / 60) % 60) as i32;
            out.second = (ticks % 60) as i32;
        }

        Unit::Millisecond => {
            let per_day = 24 * 60 * 60 * 1000;
            set_civil_days(ticks.div_euclid(per_day), &mut out);
            ticks = ticks.rem_euclid(per_day);
            out.hour = (ticks / (60 * 60 * 1000)) as i32;
            out.minute = ((ticks / (60 * 1000)) % 60) as i32;
            out.second = ((ticks / 1000) % 60) as i32;
            out.microsecond = ((ticks % 1000) * 1000) as i32;
        }

        Unit::Microsecond => {
            let per_day = 24 * 60 * 60 * 1_000_000;
            set_civil_days(ticks.div_euclid(per_day), &mut out);
            ticks = ticks.rem_euclid(per_day);
            out.hour = (ticks / (60 * 60 * 1_000_000)) as i32;
            out.minute = ((ticks / (60 * 1_000_000)) % 60) as i32;
            out.second = ((ticks / 1_000_000) % 60) as i32;
            out.microsecond = (ticks % 1_000_000) as i32;
        }

        Unit::Nanosecond => {
            let per_day = 24 * 60 * 60 * 1_000_000_000;
            set_civil_days(ticks.div_euclid(per_day), &mut out);
            ticks = ticks.rem_euclid(per_day);
            out.hour = (ticks / (60 * 60 * 1_000_000_000)) as i32;
            out.minute = ((ticks / (60 * 1_000_000_000)) % 60) as i32;
            out.second = ((ticks / 1_000_000_000) % 60) as i32;
            out.microsecond = ((ticks / 1000) % 1_000_000) as i32;
            out.picosecond = ((ticks % 1000) * 1000) as i32;
        }

        Unit::Picosecond => {
            let per_day = 24 * 60 * 60 * 1_000_000_000_000;
            set_civil_days(ticks.div_euclid(per_day), &mut out);
            ticks = ticks.rem_euclid(per_day);
            out.hour = (ticks / (60 * 60 * 1_000_000_000_000)) as i32;
            out.minute = ((ticks / (60 * 1_000_000_000_000)) % 60) as i32;
            out.second = ((ticks / 1_000_000_000_000) % 60) as i32;
            out.microsecond = ((ticks / 1_000_000) % 1_000_000) as i32;
            out.picosecond = (ticks % 1_000_000) as i32;
        }

        Unit::Femtosecond => {
            // The whole range is only ±2.6 hours.
            if ticks >= 0 {
                out.hour = (ticks / (60 * 60 * 1_000_000_000_000_000)) as i32;
                out.minute = ((ticks / (60 * 1_000_000_000_000_000)) % 60) as i32;
                out.second = ((ticks / 1_000_000_000_000_000) % 60) as i32;
                out.microsecond = ((ticks / 1_000_000_000) % 1_000_000) as i32;
                out.picosecond = ((ticks / 1000) % 1_000_000) as i32;
                out.attosecond = ((ticks % 1000) * 1000) as i32;
            } else {
                let per_minute = 60 * 1_000_000_000_000_000;
                let minutes = ticks.div_euclid(per_minute);
                ticks = ticks.rem_euclid(per_minute);
                add_minutes(&mut out, minutes);
                out.second = ((ticks / 1_000_000_000_000_000) % 60) as i32;
                out.microsecond = ((ticks / 1_000_000_000) % 1_000_000) as i32;
                out.picosecond = ((ticks / 1000) % 1_000_000) as i32;
                out.attosecond = ((ticks % 1000) * 1000) as i32;
            }
        }

        Unit::Attosecond => {
            // The whole range is only ±9.2 seconds.
            if ticks >= 0 {
                out.second = ((ticks / 1_000_000_000_000_000_000) % 60) as i32;
                out.microsecond = ((ticks / 1_000_000_000_000) % 1_000_000) as i32;
                out.picosecond = ((ticks / 1_000_000) % 1_000_000) as i32;
                out.attosecond = (ticks % 1_000_000) as i32;
            } else {
                let per_second = 1_000_000_000_000_000_000;
                let seconds = ticks.div_euclid(per_second);
                ticks = ticks.rem_euclid(per_second);
                add_seconds(&mut out, seconds);
                out.microsecond = ((ticks / 1_000_000_000_000) % 1_000_000) as i32;
                out.picosecond = ((ticks / 1_000_000) % 1_000_000) as i32;
                out.attosecond = (ticks % 1_000_000) as i32;
            }
        }

        Unit::Generic => unreachable!("generic rejected above"),
    }

    Ok(out)
}

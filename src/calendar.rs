//! Proleptic Gregorian calendar kernel.
//!
//! Day offsets count from the 1970-01-01 epoch (day 0). All routines
//! are total over their input range; overflow beyond roughly ±10^18
//! days is the caller's responsibility.

use crate::CivilTime;

/// Days per month, regular year and leap year.
pub(crate) const DAYS_PER_MONTH: [[i32; 12]; 2] = [
    [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31],
    [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31],
];

const DAYS_PER_400_YEARS: i64 = 400 * 365 + 100 - 4 + 1;

/// Proleptic Gregorian leap-year rule.
pub fn is_leap_year(year: i64) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Length of a month, or 0 for a month outside 1..=12.
pub fn days_in_month(year: i64, month: i32) -> i32 {
    if !(1..=12).contains(&month) {
        return 0;
    }
    DAYS_PER_MONTH[is_leap_year(year) as usize][(month - 1) as usize]
}

/// Days offset from the 1970 epoch for a valid civil time.
///
/// The leap correction is loop-free: count one day per 4 years from
/// the nearest leap pivot, minus one per 100, plus one per 400, with
/// pivots 1969/1901/1601 at or above the epoch and 1972/2000/2000
/// below it.
pub fn civil_to_days(civil: &CivilTime) -> i64 {
    let mut year = civil.year - 1970;
    let mut days = year * 365;

    if days >= 0 {
        // 1968 is the closest leap year before 1970; exclude the
        // current year, so add 1.
        year += 1;
        days += year / 4;
        // 1900 is the closest previous year divisible by 100.
        year += 68;
        days -= year / 100;
        // 1600 is the closest previous year divisible by 400.
        year += 300;
        days += year / 400;
    } else {
        // 1972 is the closest later leap year; include the current
        // year, so subtract 2.
        year -= 2;
        days += year / 4;
        // 2000 is the closest later year divisible by both 100 and 400.
        year -= 28;
        days -= year / 100;
        days += year / 400;
    }

    let lengths = &DAYS_PER_MONTH[is_leap_year(civil.year) as usize];
    for length in &lengths[..(civil.month - 1) as usize] {
        days += i64::from(*length);
    }
    days += i64::from(civil.day) - 1;

    days
}

/// Minutes offset from the 1970 epoch.
pub fn civil_to_minutes(civil: &CivilTime) -> i64 {
    civil_to_days(civil) * 24 * 60 + i64::from(civil.hour) * 60 + i64::from(civil.minute)
}

/// Splits an epoch-day offset into the year and the day within that
/// year.
///
/// Recenters on the year 2000 (which starts a 400-year cycle, offset
/// `365·30 + 7` days from the epoch), extracts whole cycles, then
/// peels off 36524-day centuries, 1461-day 4-year blocks and single
/// years. The `day == 0/365/366` edge tests re-attribute Feb 29 of
/// century years to the right block.
pub(crate) fn days_to_yeardays(days: i64) -> (i64, i64) {
    let mut days = days - (365 * 30 + 7);
    let mut year;

    if days >= 0 {
        year = 400 * (days / DAYS_PER_400_YEARS);
        days %= DAYS_PER_400_YEARS;
    } else {
        year = 400 * ((days - (DAYS_PER_400_YEARS - 1)) / DAYS_PER_400_YEARS);
        days %= DAYS_PER_400_YEARS;
        if days < 0 {
            days += DAYS_PER_400_YEARS;
        }
    }

    if days >= 366 {
        year += 100 * ((days - 1) / (100 * 365 + 25 - 1));
        days = (days - 1) % (100 * 365 + 25 - 1);
        if days >= 365 {
            year += 4 * ((days + 1) / (4 * 365 + 1));
            days = (days + 1) % (4 * 365 + 1);
            if days >= 366 {
                year += (days - 1) / 365;
                days = (days - 1) % 365;
            }
        }
    }

    (year + 2000, days)
}

/// Fills year, month and day of `out` from an epoch-day offset.
pub(crate) fn set_civil_days(days: i64, out: &mut CivilTime) {
    let (year, mut day_of_year) = days_to_yeardays(days);
    out.year = year;

    let lengths = &DAYS_PER_MONTH[is_leap_year(year) as usize];
    for (i, length) in lengths.iter().enumerate() {
        if day_of_year < i64::from(*length) {
            out.month = i as i32 + 1;
            out.day = day_of_year as i32 + 1;
            return;
        }
        day_of_year -= i64::from(*length);
    }
}

/// Day of the week for an epoch-day offset; 0 is Monday
/// (1970-01-05 was a Monday).
pub fn day_of_week(days: i64) -> i32 {
    (days - 4).rem_euclid(7) as i32
}

/// Number of weekdays (Monday through Friday) between two epoch-day
/// offsets. Swapped arguments negate the result.
pub fn weekdays_between(first: i64, second: i64) -> i64 {
    let (first, second, swapped) = if second < first {
        (second, first, true)
    } else {
        (first, second, false)
    };

    // Saturday and Sunday count as the preceding Friday.
    let dow_first = day_of_week(first).min(4) as i64;
    let mut dow_second = day_of_week(second).min(4) as i64;
    if dow_second < dow_first {
        dow_second += 5;
    }

    let count = ((second - first) / 7) * 5 + (dow_second - dow_first);
    if swapped {
        -count
    } else {
        count
    }
}

/// Adjusts a civil time by a minute offset, carrying through hours,
/// days, months and years. Assumes the current values are valid and
/// the resulting day shift stays within one month.
pub fn add_minutes(civil: &mut CivilTime, minutes: i64) {
    let total_minutes = i64::from(civil.minute) + minutes;
    civil.minute = total_minutes.rem_euclid(60) as i32;

    let total_hours = i64::from(civil.hour) + total_minutes.div_euclid(60);
    civil.hour = total_hours.rem_euclid(24) as i32;
    civil.day += total_hours.div_euclid(24) as i32;

    if civil.day < 1 {
        civil.month -= 1;
        if civil.month < 1 {
            civil.year -= 1;
            civil.month = 12;
        }
        civil.day += days_in_month(civil.year, civil.month);
    } else if civil.day > 28 {
        let length = days_in_month(civil.year, civil.month);
        if civil.day > length {
            civil.day -= length;
            civil.month += 1;
            if civil.month > 12 {
                civil.year += 1;
                civil.month = 1;
            }
        }
    }
}

/// Adjusts a civil time by a second offset.
pub fn add_seconds(civil: &mut CivilTime, seconds: i64) {
    let total = i64::from(civil.second) + seconds;
    civil.second = total.rem_euclid(60) as i32;
    add_minutes(civil, total.div_euclid(60));
}

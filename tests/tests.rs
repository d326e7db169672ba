//! End-to-end suite: the documented conversion scenarios, the
//! universal laws, and a cross-check of the calendar kernel against
//! the `time` crate.

use dt64::calendar::{civil_to_days, day_of_week, is_leap_year, weekdays_between};
use dt64::cast::{can_cast_datetime_metadata, cast_datetime, cast_timedelta};
use dt64::codec::{civil_to_value, value_to_civil};
use dt64::convert::{DatetimeInput, Nested, ParseIso8601};
use dt64::{
    arange, conversion_factor, datetime_from_input, gcd_metadata, metadata_divides,
    parse_typestr, Casting, CivilTime, Datetime, Error, Kind, Metadata, Operand, Unit, NAT,
};

fn meta(unit: Unit) -> Metadata {
    Metadata::from_unit(unit)
}

/// Minimal fixture parser; real ISO 8601 parsing lives outside the
/// engine.
fn fixture_parser() -> impl ParseIso8601 {
    |text: &str| -> Result<(CivilTime, Unit), Error> {
        let date_part = &text[..text.find('T').unwrap_or(text.len())];
        let mut pieces = date_part.splitn(3, '-');
        let year = pieces.next().and_then(|p| p.parse().ok());
        let month = pieces.next().and_then(|p| p.parse().ok());
        let day = pieces.next().and_then(|p| p.parse().ok());
        let (Some(year), Some(month), Some(day)) = (year, month, day) else {
            return Err(Error::UnconvertibleDatetime);
        };
        let mut civil = CivilTime::from_ymd(year, month, day)?;
        if let Some(clock) = text.get(date_part.len() + 1..) {
            let mut pieces = clock.splitn(3, ':');
            civil.hour = pieces.next().and_then(|p| p.parse().ok()).unwrap_or(0);
            civil.minute = pieces.next().and_then(|p| p.parse().ok()).unwrap_or(0);
            civil.second = pieces.next().and_then(|p| p.parse().ok()).unwrap_or(0);
            Ok((civil, Unit::Second))
        } else {
            Ok((civil, Unit::Day))
        }
    }
}

// ===== Documented end-to-end scenarios =====

#[test]
fn scenario_leap_day_to_value_and_back() {
    let civil = CivilTime::from_ymd(2000, 2, 29).unwrap();
    assert_eq!(civil_to_value(meta(Unit::Day), &civil).unwrap(), 11_016);

    let round = value_to_civil(meta(Unit::Day), 11_016).unwrap();
    assert_eq!((round.year, round.month, round.day), (2000, 2, 29));
    assert_eq!((round.hour, round.minute, round.second), (0, 0, 0));
    assert_eq!(round.microsecond, 0);
}

#[test]
fn scenario_second_before_epoch() {
    let civil = CivilTime::from_ymd_hms(1969, 12, 31, 23, 59, 59).unwrap();
    assert_eq!(civil_to_value(meta(Unit::Second), &civil).unwrap(), -1);

    let round = value_to_civil(meta(Unit::Second), -1).unwrap();
    assert_eq!(
        (round.year, round.month, round.day, round.hour, round.minute, round.second),
        (1969, 12, 31, 23, 59, 59)
    );
}

#[test]
fn scenario_conversion_factors() {
    assert_eq!(
        conversion_factor(meta(Unit::Year), meta(Unit::Day)).unwrap(),
        (146_097, 400)
    );
    assert_eq!(
        conversion_factor(meta(Unit::Week), meta(Unit::Day)).unwrap(),
        (7, 1)
    );
}

#[test]
fn scenario_casting_rules() {
    assert!(can_cast_datetime_metadata(
        meta(Unit::Hour),
        meta(Unit::Minute),
        Casting::SameKind
    ));
    // Crossing the date/time boundary is refused.
    assert!(!can_cast_datetime_metadata(
        meta(Unit::Day),
        meta(Unit::Hour),
        Casting::SameKind
    ));
}

#[test]
fn scenario_metadata_gcd() {
    assert_eq!(
        gcd_metadata(meta(Unit::Year), meta(Unit::Month), false, false).unwrap(),
        meta(Unit::Month)
    );
    assert!(matches!(
        gcd_metadata(meta(Unit::BusinessDay), meta(Unit::Day), true, false),
        Err(Error::IncompatibleUnits { .. })
    ));
    assert_eq!(
        gcd_metadata(meta(Unit::BusinessDay), meta(Unit::Hour), false, false).unwrap(),
        meta(Unit::Day)
    );
}

#[test]
fn scenario_metadata_text() {
    let parsed: Metadata = "[7D]".parse().unwrap();
    assert_eq!(parsed, Metadata::new(Unit::Day, 7));

    let parsed: Metadata = "[1M/30]".parse().unwrap();
    assert_eq!(parsed, Metadata::new(Unit::Day, 1));

    assert_eq!(
        parse_typestr("datetime64[ns]").unwrap(),
        (Kind::Datetime, meta(Unit::Nanosecond))
    );
    assert_eq!(
        parse_typestr("m8[2W]").unwrap(),
        (Kind::Timedelta, Metadata::new(Unit::Week, 2))
    );
}

#[test]
fn scenario_nat_casts() {
    let rules = [Casting::Unsafe, Casting::SameKind, Casting::Safe, Casting::Equiv];
    for rule in rules {
        let nat = Datetime::nat(meta(Unit::Day));
        let out = nat.cast(meta(Unit::Second), rule).unwrap();
        assert!(out.is_nat(), "rule {rule}");
    }
}

// ===== Universal laws =====

#[test]
fn law_round_trip_truncates_to_unit() {
    let mut civil = CivilTime::from_ymd_hms(1987, 11, 23, 6, 40, 5).unwrap();
    civil.microsecond = 421_337;

    let units = [
        Unit::Year,
        Unit::Month,
        Unit::Week,
        Unit::Day,
        Unit::Hour,
        Unit::Minute,
        Unit::Second,
        Unit::Millisecond,
        Unit::Microsecond,
    ];
    for unit in units {
        let value = civil_to_value(meta(unit), &civil).unwrap();
        let round = value_to_civil(meta(unit), value).unwrap();
        // Packing the truncated struct again is the identity.
        assert_eq!(
            civil_to_value(meta(unit), &round).unwrap(),
            value,
            "unit {unit}"
        );
        // Truncation never moves the instant forward.
        assert!(civil_to_days(&round) <= civil_to_days(&civil), "unit {unit}");
    }
}

#[test]
fn law_nat_absorption() {
    assert_eq!(civil_to_value(meta(Unit::Day), &CivilTime::nat()).unwrap(), NAT);
    assert!(value_to_civil(meta(Unit::Second), NAT).unwrap().is_nat());
    assert_eq!(cast_datetime(meta(Unit::Day), meta(Unit::Second), NAT).unwrap(), NAT);
    assert_eq!(cast_timedelta(meta(Unit::Week), meta(Unit::Second), NAT).unwrap(), NAT);

    // NaT survives even a cast whose rule check would fail for real
    // values.
    let nat = Datetime::nat(meta(Unit::Day));
    assert!(nat.cast(meta(Unit::Attosecond), Casting::Equiv).unwrap().is_nat());
}

#[test]
fn law_cast_monotonicity() {
    let src = meta(Unit::Day);
    let dst = Metadata::new(Unit::Hour, 6);
    assert!(metadata_divides(src, dst, true));

    let mut previous = None;
    for value in -400..400 {
        let out = cast_timedelta(src, dst, value).unwrap();
        if let Some(prev) = previous {
            assert!(out > prev, "value {value}");
        }
        previous = Some(out);
    }
}

#[test]
fn law_gcd_commutative_and_idempotent() {
    let samples = [
        meta(Unit::Year),
        meta(Unit::Month),
        Metadata::new(Unit::Week, 3),
        meta(Unit::BusinessDay),
        Metadata::new(Unit::Hour, 6),
        Metadata::new(Unit::Second, 90),
        Metadata::GENERIC,
    ];
    for a in samples {
        assert_eq!(gcd_metadata(a, a, false, false).unwrap(), a, "{a:?}");
        for b in samples {
            let ab = gcd_metadata(a, b, false, false);
            let ba = gcd_metadata(b, a, false, false);
            assert_eq!(ab, ba, "{a:?} <-> {b:?}");
        }
    }
}

#[test]
fn law_conversion_exactness() {
    let samples = [
        meta(Unit::Year),
        meta(Unit::Month),
        meta(Unit::Week),
        Metadata::new(Unit::Day, 2),
        Metadata::new(Unit::Hour, 36),
        meta(Unit::Second),
    ];
    for a in samples {
        for b in samples {
            let (num_ab, den_ab) = conversion_factor(a, b).unwrap();
            let (num_ba, den_ba) = conversion_factor(b, a).unwrap();
            assert_eq!(
                i128::from(num_ab) * i128::from(den_ba),
                i128::from(den_ab) * i128::from(num_ba),
                "{a:?} <-> {b:?}"
            );
        }
    }
}

#[test]
fn law_leap_years() {
    let cases = [
        (1600, true),
        (1700, false),
        (1800, false),
        (1900, false),
        (2000, true),
        (2004, true),
        (2100, false),
        (2400, true),
    ];
    for (year, expected) in cases {
        assert_eq!(is_leap_year(year), expected, "year {year}");
    }
}

#[test]
fn law_day_of_week_anchor() {
    let monday = CivilTime::from_ymd(1970, 1, 5).unwrap();
    assert_eq!(day_of_week(civil_to_days(&monday)), 0);
}

// ===== Calendar oracle =====

#[test]
fn calendar_matches_time_crate() {
    // Sweep a mix of ordinary days, leap days and century boundaries.
    let cases = [
        (1969, 12, 31),
        (1970, 1, 1),
        (1972, 2, 29),
        (1900, 2, 28),
        (1900, 3, 1),
        (2000, 2, 29),
        (2100, 2, 28),
        (1600, 1, 1),
        (2024, 7, 14),
        (9999, 12, 31),
        (1, 1, 1),
    ];
    const JULIAN_DAY_OF_EPOCH: i64 = 2_440_588;
    for (year, month, day) in cases {
        let civil = CivilTime::from_ymd(year, month, day).unwrap();
        let oracle = time::Date::from_calendar_date(
            year as i32,
            time::Month::try_from(month as u8).unwrap(),
            day as u8,
        )
        .unwrap();
        assert_eq!(
            civil_to_days(&civil),
            i64::from(oracle.to_julian_day()) - JULIAN_DAY_OF_EPOCH,
            "{year}-{month}-{day}"
        );
    }

    // Weekday numbering agrees too (Monday = 0).
    let date = time::Date::from_calendar_date(2024, time::Month::July, 14).unwrap();
    let days = i64::from(date.to_julian_day()) - JULIAN_DAY_OF_EPOCH;
    assert_eq!(
        day_of_week(days) as u8,
        date.weekday().number_days_from_monday()
    );
}

#[test]
fn business_days_over_a_known_stretch() {
    // 1970-01-01 (Thursday) to 1970-01-15 spans exactly 10 weekdays.
    assert_eq!(weekdays_between(0, 14), 10);
    // A full 400-year cycle holds an exact number of weeks.
    assert_eq!(weekdays_between(0, 146_097), 146_097 / 7 * 5);
}

// ===== Conversion and ranges through the public surface =====

#[test]
fn text_conversion_through_fixture_parser() {
    let parser = fixture_parser();

    let mut detected = None;
    let value = datetime_from_input(
        &mut detected,
        &DatetimeInput::Text("2000-02-29"),
        Casting::SameKind,
        &parser,
    )
    .unwrap();
    assert_eq!(value, 11_016);
    assert_eq!(detected, Some(meta(Unit::Day)));

    let mut fixed = Some(meta(Unit::Minute));
    let value = datetime_from_input(
        &mut fixed,
        &DatetimeInput::Text("1969-12-31T23:59:00"),
        Casting::SameKind,
        &parser,
    )
    .unwrap();
    assert_eq!(value, -1);
}

#[test]
fn nested_inference_over_mixed_inputs() {
    let parser = fixture_parser();
    let hours = Datetime::new(12, meta(Unit::Hour));
    let leaves = [
        Nested::Leaf(DatetimeInput::Text("2000-02-29")),
        Nested::Leaf(DatetimeInput::Scalar(hours)),
    ];
    let tree = [Nested::Sequence(&leaves), Nested::Leaf(DatetimeInput::Null)];
    let inferred =
        dt64::convert::find_datetime_unit(&Nested::Sequence(&tree), &parser).unwrap();
    assert_eq!(inferred, meta(Unit::Hour));
}

#[test]
fn arange_of_datetimes() {
    let parser = fixture_parser();
    let start = Some(Operand::Datetime(DatetimeInput::Text("1970-01-01")));
    let stop = Some(Operand::Datetime(DatetimeInput::Text("1970-01-08")));
    let step = Some(Operand::Timedelta(dt64::convert::TimedeltaInput::Ticks(2)));

    let (values, kind, range_meta) = arange(start, stop, step, None, &parser).unwrap();
    assert_eq!(kind, Kind::Datetime);
    assert_eq!(range_meta, meta(Unit::Day));
    assert_eq!(values, vec![0, 2, 4, 6]);
}

#[test]
fn arange_rejects_nat_bounds() {
    let parser = fixture_parser();
    let nat = Datetime::nat(meta(Unit::Day));
    let stop = Some(Operand::Datetime(DatetimeInput::Scalar(Datetime::new(
        5,
        meta(Unit::Day),
    ))));
    assert_eq!(
        arange(
            Some(Operand::Datetime(DatetimeInput::Scalar(nat))),
            stop,
            None,
            None,
            &parser
        ),
        Err(Error::RangeNat)
    );
}

// ===== Scalar API =====

#[test]
fn scalar_round_trip_and_cast() {
    let civil = CivilTime::from_ymd_hms(1999, 12, 31, 23, 0, 0).unwrap();
    let hours = Datetime::from_civil(&civil, meta(Unit::Hour)).unwrap();
    assert_eq!(hours.value, 10_957 * 24 - 1);

    let minutes = hours.cast(meta(Unit::Minute), Casting::Safe).unwrap();
    assert_eq!(minutes.value, hours.value * 60);

    let back = minutes.to_civil().unwrap();
    assert_eq!((back.year, back.month, back.day, back.hour), (1999, 12, 31, 23));

    // Refused casts name both sides and the rule.
    let err = hours.cast(meta(Unit::Day), Casting::Safe).unwrap_err();
    assert_eq!(
        err.to_string(),
        "cannot cast datetime scalar from [h] to [D] according to the rule safe"
    );
}

#[test]
fn display_forms() {
    assert_eq!(Datetime::new(5, Metadata::new(Unit::Day, 7)).to_string(), "5[7D]");
    assert_eq!(Datetime::nat(meta(Unit::Second)).to_string(), "NaT[s]");
    assert_eq!(
        CivilTime::from_ymd_hms(2000, 2, 29, 1, 2, 3).unwrap().to_string(),
        "2000-02-29T01:02:03"
    );
}

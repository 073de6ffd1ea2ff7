use chrono::TimeZone;

use super::*;

fn utc(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

fn tf(raw: &str) -> Timeframe {
    raw.parse().expect("valid timeframe")
}

#[test]
fn floors_minutes_within_the_hour() {
    let time = utc("2025-01-01T10:17:42Z");

    assert_eq!(
        time.floor_to_timeframe(tf("1m")).unwrap(),
        utc("2025-01-01T10:17:00Z")
    );
    assert_eq!(
        time.floor_to_timeframe(tf("5m")).unwrap(),
        utc("2025-01-01T10:15:00Z")
    );
    assert_eq!(
        time.floor_to_timeframe(tf("15m")).unwrap(),
        utc("2025-01-01T10:15:00Z")
    );
    assert_eq!(
        time.floor_to_timeframe(tf("60m")).unwrap(),
        utc("2025-01-01T10:00:00Z")
    );
}

#[test]
fn floors_240m_on_seoul_wall_clock() {
    // 2025-01-01T10:30 UTC is 19:30 KST; the enclosing 240m bucket starts
    // at 16:00 KST, i.e. 07:00 UTC.
    let time = utc("2025-01-01T10:30:00Z");

    assert_eq!(
        time.floor_to_timeframe(tf("240m")).unwrap(),
        utc("2025-01-01T07:00:00Z")
    );
}

#[test]
fn floors_days_to_seoul_midnight() {
    // 20:00 UTC is 05:00 KST the next day; the day bucket starts at
    // midnight KST, i.e. 15:00 UTC.
    let time = utc("2025-01-01T20:00:00Z");

    assert_eq!(
        time.floor_to_timeframe(tf("1d")).unwrap(),
        utc("2025-01-01T15:00:00Z")
    );
}

#[test]
fn aligned_instants_are_fixed_points() {
    for raw in ["1m", "5m", "60m", "240m", "1d", "1w"] {
        let timeframe = tf(raw);
        let aligned = utc("2025-03-10T03:27:09Z")
            .floor_to_timeframe(timeframe)
            .unwrap();

        assert_eq!(
            aligned.floor_to_timeframe(timeframe).unwrap(),
            aligned,
            "flooring twice must be stable for {raw}"
        );
    }
}

#[test]
fn calendar_timeframes_cannot_be_floored() {
    assert!(utc("2025-01-01T00:00:00Z")
        .floor_to_timeframe(tf("1M"))
        .is_err());
}

#[test]
fn kst_round_trip() {
    let local = NaiveDateTime::parse_from_str("2025-01-01T09:00:00", "%Y-%m-%dT%H:%M:%S")
        .expect("valid timestamp");

    // 09:00 KST is midnight UTC.
    assert_eq!(kst_to_utc(local), utc("2025-01-01T00:00:00Z"));
    assert_eq!(
        kst_to_utc(local).with_timezone(&KST),
        KST.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap()
    );
}

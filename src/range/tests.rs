use super::*;

fn utc(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&format!("2025-01-01T{raw}:00+09:00"))
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

fn range(start: &str, end: &str) -> TimeRange {
    TimeRange::new(utc(start), utc(end))
}

#[test]
fn subtract_handles_overlap() {
    let existing = [range("00:00", "01:00"), range("01:30", "02:00")];
    let target = range("00:30", "02:30");

    let missing = subtract(&existing, target);

    assert_eq!(
        missing,
        vec![range("01:00", "01:30"), range("02:00", "02:30")]
    );
}

#[test]
fn subtract_with_no_cover_returns_target() {
    assert_eq!(
        subtract(&[], range("00:00", "01:00")),
        vec![range("00:00", "01:00")]
    );

    let disjoint = [range("03:00", "04:00")];
    assert_eq!(
        subtract(&disjoint, range("00:00", "01:00")),
        vec![range("00:00", "01:00")]
    );
}

#[test]
fn subtract_with_full_cover_is_empty() {
    let existing = [range("00:00", "03:00")];
    assert!(subtract(&existing, range("00:30", "02:30")).is_empty());

    // Touching pieces that jointly cover the target
    let pieces = [range("00:00", "01:00"), range("01:00", "03:00")];
    assert!(subtract(&pieces, range("00:30", "02:30")).is_empty());
}

#[test]
fn subtract_ignores_existing_order() {
    let existing = [range("01:30", "02:00"), range("00:00", "01:00")];
    let missing = subtract(&existing, range("00:30", "02:30"));

    assert_eq!(
        missing,
        vec![range("01:00", "01:30"), range("02:00", "02:30")]
    );
}

#[test]
fn merge_coalesces_overlap_and_touch() {
    let ranges = [
        range("00:00", "01:00"),
        range("01:00", "01:30"),
        range("01:15", "02:00"),
        range("03:00", "04:00"),
    ];

    assert_eq!(
        merge(&ranges),
        vec![range("00:00", "02:00"), range("03:00", "04:00")]
    );
}

#[test]
fn merge_keeps_disjoint_ranges() {
    let ranges = [range("02:00", "03:00"), range("00:00", "01:00")];
    assert_eq!(
        merge(&ranges),
        vec![range("00:00", "01:00"), range("02:00", "03:00")]
    );

    assert!(merge(&[]).is_empty());
}

#[test]
fn merge_absorbs_contained_ranges() {
    let ranges = [range("00:00", "04:00"), range("01:00", "02:00")];
    assert_eq!(merge(&ranges), vec![range("00:00", "04:00")]);
}

#[test]
fn covered_checks_containment() {
    let existing = [range("00:00", "01:00"), range("01:00", "02:00")];

    assert!(is_covered(&existing, range("00:15", "01:45")));
    assert!(!is_covered(&existing, range("01:30", "02:30")));
}

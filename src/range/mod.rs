use std::fmt;

use chrono::{DateTime, Utc};

/// Half-open `[start, end)` time interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Subtracts the union of `existing` from `target`, returning the uncovered
/// remainder in ascending order.
///
/// Sweeps a cursor from the target start across the existing ranges sorted
/// by start, emitting each stretch the cursor crosses without cover.
pub(crate) fn subtract(existing: &[TimeRange], target: TimeRange) -> Vec<TimeRange> {
    let mut existing = existing.to_vec();
    existing.sort_by_key(TimeRange::start);

    let mut missing = Vec::new();
    let mut cursor = target.start();

    for range in existing {
        if range.end() <= cursor {
            continue;
        }
        if range.start() > target.end() {
            break;
        }
        if range.start() > cursor {
            missing.push(TimeRange::new(cursor, range.start().min(target.end())));
        }

        cursor = cursor.max(range.end());
        if cursor >= target.end() {
            break;
        }
    }

    if cursor < target.end() {
        missing.push(TimeRange::new(cursor, target.end()));
    }

    missing.retain(|range| !range.is_empty());
    missing
}

/// Coalesces overlapping or touching ranges into the minimal covering set,
/// sorted by start.
pub(crate) fn merge(ranges: &[TimeRange]) -> Vec<TimeRange> {
    let mut sorted = ranges.to_vec();
    sorted.sort_by_key(TimeRange::start);

    let mut merged: Vec<TimeRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match merged.last_mut() {
            Some(current) if range.start() <= current.end() => {
                *current = TimeRange::new(current.start(), current.end().max(range.end()));
            }
            _ => merged.push(range),
        }
    }

    merged
}

/// Whether `target` lies fully inside the union of `existing`.
pub(crate) fn is_covered(existing: &[TimeRange], target: TimeRange) -> bool {
    subtract(existing, target).is_empty()
}

#[cfg(test)]
mod tests;

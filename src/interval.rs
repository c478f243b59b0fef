//! Interval algebra
//!
//! Pure functions over sets of closed `[start, end]` time intervals:
//! - Merging overlapping or touching intervals
//! - Summing durations
//! - Strict overlap tests for slice classification
//! - Boundary partitions across several interval sets

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Closed time interval with `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeInterval {
    /// Build an interval, rejecting reversed bounds
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        if start > end {
            return None;
        }
        Some(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Seconds in a duration, keeping sub-second precision down to nanoseconds
pub fn seconds_f64(duration: Duration) -> f64 {
    duration.num_seconds() as f64 + duration.subsec_nanos() as f64 / 1e9
}

/// Merge overlapping and touching intervals.
///
/// The result is sorted by start and contains no two intervals that overlap or
/// touch. Intervals with `next.start == current.end` are joined.
pub fn merge_intervals(intervals: &[TimeInterval]) -> Vec<TimeInterval> {
    if intervals.is_empty() {
        return Vec::new();
    }

    let mut sorted = intervals.to_vec();
    sorted.sort_by_key(|iv| iv.start);

    let mut merged: Vec<TimeInterval> = Vec::with_capacity(sorted.len());
    let mut current = sorted[0];

    for next in sorted.into_iter().skip(1) {
        if next.start <= current.end {
            current.end = current.end.max(next.end);
        } else {
            merged.push(current);
            current = next;
        }
    }

    merged.push(current);
    merged
}

/// Total duration in seconds.
///
/// Durations are summed exactly and converted once. Overlapping input is
/// counted twice; merge first to measure a union.
pub fn sum_seconds(intervals: &[TimeInterval]) -> f64 {
    let total = intervals
        .iter()
        .fold(Duration::zero(), |acc, iv| acc + iv.duration());
    seconds_f64(total)
}

/// True when the open range `(a, b)` intersects any interval in the set
pub fn overlaps_any(a: DateTime<Utc>, b: DateTime<Utc>, intervals: &[TimeInterval]) -> bool {
    intervals.iter().any(|iv| a < iv.end && b > iv.start)
}

/// Sorted, de-duplicated start/end instants across every interval set
pub fn partition_boundaries(sets: &[&[TimeInterval]]) -> Vec<DateTime<Utc>> {
    let mut boundaries: Vec<DateTime<Utc>> = sets
        .iter()
        .flat_map(|set| set.iter().flat_map(|iv| [iv.start, iv.end]))
        .collect();

    boundaries.sort();
    boundaries.dedup();
    boundaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 16, 0, 0, 0).unwrap()
    }

    fn iv(start_min: i64, end_min: i64) -> TimeInterval {
        TimeInterval::new(
            base() + Duration::minutes(start_min),
            base() + Duration::minutes(end_min),
        )
        .unwrap()
    }

    #[test]
    fn test_reversed_interval_rejected() {
        assert!(TimeInterval::new(base() + Duration::minutes(5), base()).is_none());
        assert!(TimeInterval::new(base(), base()).is_some());
    }

    #[test]
    fn test_merge_empty() {
        assert!(merge_intervals(&[]).is_empty());
    }

    #[test]
    fn test_merge_overlapping_unsorted() {
        let merged = merge_intervals(&[iv(60, 90), iv(0, 30), iv(20, 45)]);
        assert_eq!(merged, vec![iv(0, 45), iv(60, 90)]);
    }

    #[test]
    fn test_merge_joins_touching_intervals() {
        let merged = merge_intervals(&[iv(0, 30), iv(30, 60)]);
        assert_eq!(merged, vec![iv(0, 60)]);
    }

    #[test]
    fn test_merge_keeps_contained_interval_extent() {
        let merged = merge_intervals(&[iv(0, 120), iv(10, 20), iv(100, 110)]);
        assert_eq!(merged, vec![iv(0, 120)]);
    }

    #[test]
    fn test_merge_zero_length_inside_gap() {
        let merged = merge_intervals(&[iv(0, 10), iv(15, 15), iv(20, 30)]);
        assert_eq!(merged, vec![iv(0, 10), iv(15, 15), iv(20, 30)]);
        assert_eq!(sum_seconds(&merged), 20.0 * 60.0);
    }

    #[test]
    fn test_sum_seconds() {
        assert_eq!(sum_seconds(&[iv(0, 30), iv(60, 90)]), 3600.0);
        assert_eq!(sum_seconds(&[]), 0.0);
    }

    #[test]
    fn test_sum_keeps_sub_millisecond_precision() {
        let a = TimeInterval::new(base(), base() + Duration::microseconds(900)).unwrap();
        let b = TimeInterval::new(
            base() + Duration::milliseconds(5),
            base() + Duration::milliseconds(5) + Duration::nanoseconds(1_500),
        )
        .unwrap();

        assert_eq!(sum_seconds(&[a]), 0.0009);
        assert!((sum_seconds(&[a, b]) - 0.0009015).abs() < 1e-15);
    }

    #[test]
    fn test_seconds_f64() {
        assert_eq!(seconds_f64(Duration::minutes(90)), 5400.0);
        assert_eq!(seconds_f64(Duration::microseconds(1_500)), 0.0015);
        assert_eq!(seconds_f64(Duration::zero()), 0.0);
    }

    #[test]
    fn test_overlaps_any_is_strict() {
        let set = [iv(10, 20)];
        // Slices that only share a boundary instant do not overlap
        assert!(!overlaps_any(base(), base() + Duration::minutes(10), &set));
        assert!(!overlaps_any(
            base() + Duration::minutes(20),
            base() + Duration::minutes(30),
            &set
        ));
        assert!(overlaps_any(
            base() + Duration::minutes(19),
            base() + Duration::minutes(30),
            &set
        ));
    }

    #[test]
    fn test_partition_boundaries_dedups() {
        let a = [iv(0, 120)];
        let b = [iv(120, 130)];
        let c = [iv(110, 180)];
        let boundaries = partition_boundaries(&[&a[..], &b[..], &c[..]]);

        let expected: Vec<DateTime<Utc>> = [0, 110, 120, 130, 180]
            .iter()
            .map(|m| base() + Duration::minutes(*m))
            .collect();
        assert_eq!(boundaries, expected);
    }

    fn arb_intervals() -> impl Strategy<Value = Vec<TimeInterval>> {
        prop::collection::vec((0i64..86_400, 0i64..7_200), 0..40).prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(offset, len)| {
                    TimeInterval::new(
                        base() + Duration::seconds(offset),
                        base() + Duration::seconds(offset + len),
                    )
                    .unwrap()
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_merge_never_exceeds_raw_sum(intervals in arb_intervals()) {
            let merged = merge_intervals(&intervals);
            prop_assert!(sum_seconds(&merged) <= sum_seconds(&intervals));
        }

        #[test]
        fn prop_merge_is_idempotent(intervals in arb_intervals()) {
            let once = merge_intervals(&intervals);
            let twice = merge_intervals(&once);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_merged_output_is_sorted_and_separated(intervals in arb_intervals()) {
            let merged = merge_intervals(&intervals);
            for pair in merged.windows(2) {
                prop_assert!(pair[0].end() < pair[1].start());
            }
        }

        #[test]
        fn prop_disjoint_input_keeps_total(starts in prop::collection::btree_set(0i64..500, 0..30)) {
            // Unit slots spaced two minutes apart never touch
            let intervals: Vec<TimeInterval> = starts
                .iter()
                .map(|slot| iv(slot * 2, slot * 2 + 1))
                .collect();
            let merged = merge_intervals(&intervals);
            prop_assert_eq!(sum_seconds(&merged), sum_seconds(&intervals));
            prop_assert_eq!(merged.len(), intervals.len());
        }
    }

    #[test]
    fn test_overlap_strictly_reduces_total() {
        let intervals = [iv(0, 60), iv(30, 90)];
        let merged = merge_intervals(&intervals);
        assert!(sum_seconds(&merged) < sum_seconds(&intervals));
        assert_eq!(sum_seconds(&merged), 90.0 * 60.0);
    }
}

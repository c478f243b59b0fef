//! Sleep aggregation
//!
//! This module turns raw stage-labelled samples into the three sleep views:
//! - Total asleep hours (all asleep stages merged together)
//! - Union breakdown (per-stage merge, total = union of every stage)
//! - Exclusive breakdown (every instant assigned to one stage by priority)
//!
//! Union and exclusive are computed independently. Their totals agree, but their
//! stage figures differ whenever sources disagree about the same instant.

use chrono::Duration;
use tracing::debug;

use crate::interval::{
    merge_intervals, overlaps_any, partition_boundaries, seconds_f64, sum_seconds, TimeInterval,
};
use crate::types::{RawSample, SleepBreakdown, SleepStage, SECONDS_PER_HOUR};

/// Merged intervals for each asleep stage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageIntervals {
    pub deep: Vec<TimeInterval>,
    pub rem: Vec<TimeInterval>,
    pub core: Vec<TimeInterval>,
    pub unspecified: Vec<TimeInterval>,
}

impl StageIntervals {
    /// Bucket samples by asleep stage and merge each bucket.
    ///
    /// Reversed samples are dropped, as are non-asleep stages and samples from
    /// other sources when `source_filter` is set.
    pub fn classify(samples: &[RawSample], source_filter: Option<&str>) -> Self {
        let mut buckets = StageIntervals::default();
        let mut dropped = 0usize;

        for sample in samples {
            if let Some(source) = source_filter {
                if sample.source_id != source {
                    continue;
                }
            }

            let interval = match sample.interval() {
                Some(interval) => interval,
                None => {
                    dropped += 1;
                    continue;
                }
            };

            match sample.stage {
                SleepStage::Deep => buckets.deep.push(interval),
                SleepStage::Rem => buckets.rem.push(interval),
                SleepStage::Core => buckets.core.push(interval),
                SleepStage::Unspecified => buckets.unspecified.push(interval),
                SleepStage::InBed | SleepStage::Awake => {}
            }
        }

        if dropped > 0 {
            debug!(dropped, "dropped reversed sleep samples");
        }

        let merged = StageIntervals {
            deep: merge_intervals(&buckets.deep),
            rem: merge_intervals(&buckets.rem),
            core: merge_intervals(&buckets.core),
            unspecified: merge_intervals(&buckets.unspecified),
        };

        debug!(
            deep = merged.deep.len(),
            rem = merged.rem.len(),
            core = merged.core.len(),
            unspecified = merged.unspecified.len(),
            "merged sleep stage intervals"
        );

        merged
    }

    /// Merged intervals for a stage (empty for non-asleep stages)
    pub fn for_stage(&self, stage: SleepStage) -> &[TimeInterval] {
        match stage {
            SleepStage::Deep => &self.deep,
            SleepStage::Rem => &self.rem,
            SleepStage::Core => &self.core,
            SleepStage::Unspecified => &self.unspecified,
            SleepStage::InBed | SleepStage::Awake => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.deep.is_empty() && self.rem.is_empty() && self.core.is_empty() && self.unspecified.is_empty()
    }
}

/// Stateless sleep aggregator
pub struct SleepAggregator;

impl SleepAggregator {
    /// Merged asleep time in hours, or `None` when nothing was asleep
    pub fn total_asleep_hours(samples: &[RawSample]) -> Option<f64> {
        let asleep: Vec<TimeInterval> = samples
            .iter()
            .filter(|s| s.stage.is_asleep())
            .filter_map(RawSample::interval)
            .collect();

        let seconds = sum_seconds(&merge_intervals(&asleep));
        if seconds > 0.0 {
            Some(seconds / SECONDS_PER_HOUR)
        } else {
            None
        }
    }

    /// Per-stage union breakdown, optionally restricted to one source.
    ///
    /// Stage seconds are each stage's own merged duration. The total is the
    /// union of all stages, so stage percentages may sum past 100% when
    /// sources disagree.
    pub fn union_breakdown(
        samples: &[RawSample],
        source_filter: Option<&str>,
    ) -> Option<SleepBreakdown> {
        let stages = StageIntervals::classify(samples, source_filter);
        if stages.is_empty() {
            return None;
        }

        let all: Vec<TimeInterval> = stages
            .deep
            .iter()
            .chain(&stages.rem)
            .chain(&stages.core)
            .chain(&stages.unspecified)
            .copied()
            .collect();
        let total_seconds = sum_seconds(&merge_intervals(&all));

        non_empty(SleepBreakdown {
            rem_seconds: sum_seconds(&stages.rem),
            deep_seconds: sum_seconds(&stages.deep),
            core_seconds: sum_seconds(&stages.core),
            unspecified_seconds: sum_seconds(&stages.unspecified),
            total_seconds,
        })
    }

    /// Exclusive breakdown across every source.
    ///
    /// Boundaries from all stages cut the night into atomic slices; each slice
    /// goes to the first of Deep, REM, Core, Unspecified that overlaps it.
    pub fn exclusive_breakdown(samples: &[RawSample]) -> Option<SleepBreakdown> {
        let stages = StageIntervals::classify(samples, None);
        let boundaries = partition_boundaries(&[
            stages.deep.as_slice(),
            stages.rem.as_slice(),
            stages.core.as_slice(),
            stages.unspecified.as_slice(),
        ]);

        let mut owned = [Duration::zero(); 4];

        for pair in boundaries.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let owner = SleepStage::ASLEEP_BY_PRIORITY
                .iter()
                .position(|stage| overlaps_any(a, b, stages.for_stage(*stage)));

            if let Some(idx) = owner {
                owned[idx] = owned[idx] + (b - a);
            }
        }

        let [deep, rem, core, unspecified] = owned.map(seconds_f64);
        let mut breakdown = SleepBreakdown {
            rem_seconds: rem,
            deep_seconds: deep,
            core_seconds: core,
            unspecified_seconds: unspecified,
            total_seconds: 0.0,
        };
        breakdown.total_seconds = breakdown.stage_sum();

        non_empty(breakdown)
    }
}

fn non_empty(breakdown: SleepBreakdown) -> Option<SleepBreakdown> {
    if breakdown.total_seconds > 0.0 {
        Some(breakdown)
    } else {
        None
    }
}

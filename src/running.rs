//! Running personal records
//!
//! This module derives best-so-far records from a history of cardio records:
//! - Estimated 1K / 5K / 10K / half-marathon times from average pace
//! - Longest run
//! - Fastest average pace
//!
//! and decides which records a new or edited run breaks.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

use crate::types::{CardioRecord, CardioType};

/// Half-marathon distance used for PR estimation (km)
pub const HALF_MARATHON_KM: f64 = 21.1;

/// A personal-record category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrLabel {
    OneK,
    FiveK,
    TenK,
    HalfMarathon,
    LongestRun,
    FastestPace,
}

impl PrLabel {
    /// Distance categories, shortest first
    pub const DISTANCES: [PrLabel; 4] = [
        PrLabel::OneK,
        PrLabel::FiveK,
        PrLabel::TenK,
        PrLabel::HalfMarathon,
    ];

    /// Every category, in reporting order
    pub const ALL: [PrLabel; 6] = [
        PrLabel::OneK,
        PrLabel::FiveK,
        PrLabel::TenK,
        PrLabel::HalfMarathon,
        PrLabel::LongestRun,
        PrLabel::FastestPace,
    ];

    /// Target distance for distance categories
    pub fn target_km(&self) -> Option<f64> {
        match self {
            PrLabel::OneK => Some(1.0),
            PrLabel::FiveK => Some(5.0),
            PrLabel::TenK => Some(10.0),
            PrLabel::HalfMarathon => Some(HALF_MARATHON_KM),
            PrLabel::LongestRun | PrLabel::FastestPace => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PrLabel::OneK => "1K PR",
            PrLabel::FiveK => "5K PR",
            PrLabel::TenK => "10K PR",
            PrLabel::HalfMarathon => "Half PR",
            PrLabel::LongestRun => "Longest run",
            PrLabel::FastestPace => "Fastest pace",
        }
    }
}

impl fmt::Display for PrLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best estimated time for a target distance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistancePr {
    pub target_distance_km: f64,
    pub estimated_minutes: f64,
    pub pace_minutes_per_km: f64,
    pub source_record_id: Uuid,
}

/// Current records across a run history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalBests {
    pub one_k: Option<DistancePr>,
    pub five_k: Option<DistancePr>,
    pub ten_k: Option<DistancePr>,
    pub half_marathon: Option<DistancePr>,
    pub longest_run: Option<CardioRecord>,
    pub fastest_pace: Option<CardioRecord>,
}

impl PersonalBests {
    /// Distance PR for a distance category
    pub fn distance_pr(&self, label: PrLabel) -> Option<&DistancePr> {
        match label {
            PrLabel::OneK => self.one_k.as_ref(),
            PrLabel::FiveK => self.five_k.as_ref(),
            PrLabel::TenK => self.ten_k.as_ref(),
            PrLabel::HalfMarathon => self.half_marathon.as_ref(),
            PrLabel::LongestRun | PrLabel::FastestPace => None,
        }
    }

    /// Id of the record holding a category
    pub fn holder(&self, label: PrLabel) -> Option<Uuid> {
        match label {
            PrLabel::LongestRun => self.longest_run.as_ref().map(|r| r.id),
            PrLabel::FastestPace => self.fastest_pace.as_ref().map(|r| r.id),
            _ => self.distance_pr(label).map(|pr| pr.source_record_id),
        }
    }

    pub fn is_empty(&self) -> bool {
        PrLabel::ALL.iter().all(|label| self.holder(*label).is_none())
    }
}

/// Stateless PR calculator
pub struct PrTracker;

impl PrTracker {
    /// Runs with a positive distance and duration
    pub fn is_eligible(record: &CardioRecord) -> bool {
        record.kind == CardioType::Run
            && record.distance_km.map_or(false, |d| d > 0.0)
            && record.duration_minutes > 0
    }

    pub fn eligible_runs(history: &[CardioRecord]) -> Vec<&CardioRecord> {
        history.iter().filter(|r| Self::is_eligible(r)).collect()
    }

    /// Time for `target_km` at the run's average pace; `None` if the run was shorter
    pub fn estimated_minutes(record: &CardioRecord, target_km: f64) -> Option<f64> {
        match record.distance_km {
            Some(distance) if distance > 0.0 && distance >= target_km => {
                let pace = record.duration_minutes as f64 / distance;
                Some(pace * target_km)
            }
            _ => None,
        }
    }

    /// Fastest estimate for a target among eligible runs (earliest wins ties)
    pub fn best_distance_pr(runs: &[&CardioRecord], target_km: f64) -> Option<DistancePr> {
        let mut best: Option<DistancePr> = None;

        for run in runs {
            let Some(estimated) = Self::estimated_minutes(run, target_km) else {
                continue;
            };
            let Some(pace) = run.pace_minutes_per_km() else {
                continue;
            };

            if best.as_ref().map_or(true, |b| estimated < b.estimated_minutes) {
                best = Some(DistancePr {
                    target_distance_km: target_km,
                    estimated_minutes: estimated,
                    pace_minutes_per_km: pace,
                    source_record_id: run.id,
                });
            }
        }

        best
    }

    pub fn longest_run<'a>(runs: &[&'a CardioRecord]) -> Option<&'a CardioRecord> {
        let mut best: Option<&CardioRecord> = None;
        for run in runs {
            let distance = run.distance_km.unwrap_or(0.0);
            if best.map_or(true, |b| distance > b.distance_km.unwrap_or(0.0)) {
                best = Some(*run);
            }
        }
        best
    }

    pub fn fastest_pace_run<'a>(runs: &[&'a CardioRecord]) -> Option<&'a CardioRecord> {
        let mut best: Option<(&CardioRecord, f64)> = None;
        for run in runs {
            let Some(pace) = run.pace_minutes_per_km() else {
                continue;
            };
            if best.map_or(true, |(_, best_pace)| pace < best_pace) {
                best = Some((*run, pace));
            }
        }
        best.map(|(run, _)| run)
    }

    /// Every current record in the history
    pub fn personal_bests(history: &[CardioRecord]) -> PersonalBests {
        let runs = Self::eligible_runs(history);

        PersonalBests {
            one_k: Self::best_distance_pr(&runs, 1.0),
            five_k: Self::best_distance_pr(&runs, 5.0),
            ten_k: Self::best_distance_pr(&runs, 10.0),
            half_marathon: Self::best_distance_pr(&runs, HALF_MARATHON_KM),
            longest_run: Self::longest_run(&runs).cloned(),
            fastest_pace: Self::fastest_pace_run(&runs).cloned(),
        }
    }

    /// Ids of records that hold at least one PR
    pub fn pr_holder_ids(history: &[CardioRecord]) -> HashSet<Uuid> {
        let bests = Self::personal_bests(history);
        PrLabel::ALL
            .iter()
            .filter_map(|label| bests.holder(*label))
            .collect()
    }

    /// PRs currently held by `record` within `history`
    pub fn badges_for(record: &CardioRecord, history: &[CardioRecord]) -> Vec<PrLabel> {
        let bests = Self::personal_bests(history);
        PrLabel::ALL
            .iter()
            .copied()
            .filter(|label| bests.holder(*label) == Some(record.id))
            .collect()
    }

    /// PRs a created or edited run breaks against the rest of the history.
    ///
    /// When `is_edit` is set, the record's previous version is excluded from
    /// the baseline. Comparisons are strict: equalling a record is not a PR.
    pub fn evaluate_new_prs(
        candidate: &CardioRecord,
        history: &[CardioRecord],
        is_edit: bool,
    ) -> Vec<PrLabel> {
        if !Self::is_eligible(candidate) {
            return Vec::new();
        }

        let baseline: Vec<&CardioRecord> = history
            .iter()
            .filter(|r| Self::is_eligible(r))
            .filter(|r| !(is_edit && r.id == candidate.id))
            .collect();

        let mut labels = Vec::new();

        for label in PrLabel::DISTANCES {
            let Some(target_km) = label.target_km() else {
                continue;
            };
            let Some(new_time) = Self::estimated_minutes(candidate, target_km) else {
                continue;
            };
            let is_pr = match Self::best_distance_pr(&baseline, target_km) {
                Some(old) => new_time < old.estimated_minutes,
                None => true,
            };
            if is_pr {
                labels.push(label);
            }
        }

        let new_distance = candidate.distance_km.unwrap_or(0.0);
        let longer = match Self::longest_run(&baseline).and_then(|r| r.distance_km) {
            Some(old) => new_distance > old,
            None => true,
        };
        if longer {
            labels.push(PrLabel::LongestRun);
        }

        if let Some(new_pace) = candidate.pace_minutes_per_km() {
            let faster = match Self::fastest_pace_run(&baseline).and_then(|r| r.pace_minutes_per_km())
            {
                Some(old) => new_pace < old,
                None => true,
            };
            if faster {
                labels.push(PrLabel::FastestPace);
            }
        }

        labels
    }
}

/// PRs a created or edited run breaks; see [`PrTracker::evaluate_new_prs`]
pub fn evaluate_new_prs(
    candidate: &CardioRecord,
    history: &[CardioRecord],
    is_edit: bool,
) -> Vec<PrLabel> {
    PrTracker::evaluate_new_prs(candidate, history, is_edit)
}

//! Core types for the Restrun engine
//!
//! This module defines the data structures that flow between the sample
//! provider, the sleep aggregator and the callers: raw stage-labelled samples,
//! stage breakdowns, resolution provenance and cardio records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AnalysisError;
use crate::interval::TimeInterval;
use crate::window::AnalysisWindow;

/// Seconds per hour, used for every seconds-to-hours conversion
pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// Category of samples requested from the health-data provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleCategory {
    SleepAnalysis,
}

/// Sleep stage label attached to a raw sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepStage {
    Rem,
    Deep,
    Core,
    Unspecified,
    InBed,
    Awake,
}

impl SleepStage {
    /// Stages that count as asleep, in exclusive-classification priority order
    pub const ASLEEP_BY_PRIORITY: [SleepStage; 4] = [
        SleepStage::Deep,
        SleepStage::Rem,
        SleepStage::Core,
        SleepStage::Unspecified,
    ];

    /// Whether time in this stage counts towards sleep totals
    pub fn is_asleep(&self) -> bool {
        matches!(
            self,
            SleepStage::Rem | SleepStage::Deep | SleepStage::Core | SleepStage::Unspecified
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SleepStage::Rem => "rem",
            SleepStage::Deep => "deep",
            SleepStage::Core => "core",
            SleepStage::Unspecified => "unspecified",
            SleepStage::InBed => "in_bed",
            SleepStage::Awake => "awake",
        }
    }
}

/// A stage-labelled time interval as reported by one data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Sample start (UTC)
    pub start: DateTime<Utc>,
    /// Sample end (UTC)
    pub end: DateTime<Utc>,
    /// Stage classification
    pub stage: SleepStage,
    /// Identifier of the app or device that wrote the sample
    pub source_id: String,
}

impl RawSample {
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        stage: SleepStage,
        source_id: impl Into<String>,
    ) -> Self {
        Self {
            start,
            end,
            stage,
            source_id: source_id.into(),
        }
    }

    /// The sample's time span, or `None` when the sample is reversed
    pub fn interval(&self) -> Option<TimeInterval> {
        TimeInterval::new(self.start, self.end)
    }
}

/// Per-stage sleep durations for one night
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SleepBreakdown {
    pub rem_seconds: f64,
    pub deep_seconds: f64,
    pub core_seconds: f64,
    pub unspecified_seconds: f64,
    /// Asleep duration; see the aggregator for how each view derives it
    pub total_seconds: f64,
}

impl SleepBreakdown {
    /// Sum of the four stage durations, in a fixed order
    pub fn stage_sum(&self) -> f64 {
        self.rem_seconds + self.deep_seconds + self.core_seconds + self.unspecified_seconds
    }

    /// Seconds attributed to a stage (zero for non-asleep stages)
    pub fn seconds_for(&self, stage: SleepStage) -> f64 {
        match stage {
            SleepStage::Rem => self.rem_seconds,
            SleepStage::Deep => self.deep_seconds,
            SleepStage::Core => self.core_seconds,
            SleepStage::Unspecified => self.unspecified_seconds,
            SleepStage::InBed | SleepStage::Awake => 0.0,
        }
    }

    /// Share of the total spent in a stage (0 when the total is 0)
    pub fn fraction_for(&self, stage: SleepStage) -> f64 {
        if self.total_seconds > 0.0 {
            self.seconds_for(stage) / self.total_seconds
        } else {
            0.0
        }
    }

    /// Hours attributed to a stage
    pub fn hours_for(&self, stage: SleepStage) -> f64 {
        self.seconds_for(stage) / SECONDS_PER_HOUR
    }

    pub fn total_hours(&self) -> f64 {
        self.total_seconds / SECONDS_PER_HOUR
    }
}

/// Which aggregation produced a breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum BreakdownView {
    /// Overlap-safe union restricted to a single source
    Union { source_id: String },
    /// Priority-partitioned breakdown across every source
    Exclusive,
}

/// A breakdown together with how it was obtained
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedBreakdown {
    pub breakdown: SleepBreakdown,
    pub view: BreakdownView,
    /// Source the preference policy asked for, if any
    pub requested_source: Option<String>,
    /// True when the requested source had no data and the exclusive view was used
    pub fell_back: bool,
}

/// Nightly summary consumed by the dashboard and widget sync
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepReport {
    pub window: AnalysisWindow,
    /// Merged asleep time across all sources (hours)
    pub total_sleep_hours: Option<f64>,
    pub breakdown: Option<ResolvedBreakdown>,
}

/// Cardio activity type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardioType {
    Run,
    Cycle,
    Row,
    Walk,
    Other,
}

/// A logged cardio session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardioRecord {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: CardioType,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    pub duration_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_heart_rate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CardioRecord {
    /// Create a record with a fresh id
    pub fn new(
        kind: CardioType,
        date: DateTime<Utc>,
        distance_km: Option<f64>,
        duration_minutes: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            date,
            distance_km,
            duration_minutes,
            avg_heart_rate: None,
            notes: None,
        }
    }

    /// Average pace in minutes per km, when a positive distance is known
    pub fn pace_minutes_per_km(&self) -> Option<f64> {
        match self.distance_km {
            Some(distance) if distance > 0.0 => Some(self.duration_minutes as f64 / distance),
            _ => None,
        }
    }

    /// Check the invariants a freshly entered record must satisfy
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.duration_minutes == 0 {
            return Err(AnalysisError::InvalidRecord(format!(
                "record {} has zero duration",
                self.id
            )));
        }
        if let Some(distance) = self.distance_km {
            if !distance.is_finite() || distance <= 0.0 {
                return Err(AnalysisError::InvalidRecord(format!(
                    "record {} has invalid distance {}",
                    self.id, distance
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakdown_fractions_and_hours() {
        let breakdown = SleepBreakdown {
            rem_seconds: 5400.0,
            deep_seconds: 3600.0,
            core_seconds: 16200.0,
            unspecified_seconds: 0.0,
            total_seconds: 25200.0,
        };

        assert!((breakdown.fraction_for(SleepStage::Rem) - 5400.0 / 25200.0).abs() < 1e-12);
        assert!((breakdown.hours_for(SleepStage::Deep) - 1.0).abs() < 1e-12);
        assert!((breakdown.total_hours() - 7.0).abs() < 1e-12);
        assert_eq!(breakdown.fraction_for(SleepStage::Unspecified), 0.0);
        assert_eq!(breakdown.hours_for(SleepStage::InBed), 0.0);
    }

    #[test]
    fn test_breakdown_zero_total_has_zero_fractions() {
        let breakdown = SleepBreakdown::default();
        assert_eq!(breakdown.fraction_for(SleepStage::Rem), 0.0);
        assert_eq!(breakdown.fraction_for(SleepStage::Core), 0.0);
    }

    #[test]
    fn test_only_sleep_stages_are_asleep() {
        assert!(SleepStage::Core.is_asleep());
        assert!(SleepStage::Unspecified.is_asleep());
        assert!(!SleepStage::InBed.is_asleep());
        assert!(!SleepStage::Awake.is_asleep());
    }

    #[test]
    fn test_pace_requires_positive_distance() {
        let date = Utc::now();
        let run = CardioRecord::new(CardioType::Run, date, Some(10.0), 50);
        assert_eq!(run.pace_minutes_per_km(), Some(5.0));

        let no_distance = CardioRecord::new(CardioType::Row, date, None, 30);
        assert_eq!(no_distance.pace_minutes_per_km(), None);

        let zero = CardioRecord::new(CardioType::Run, date, Some(0.0), 30);
        assert_eq!(zero.pace_minutes_per_km(), None);
    }

    #[test]
    fn test_record_validation() {
        let date = Utc::now();
        assert!(CardioRecord::new(CardioType::Run, date, Some(5.0), 25).validate().is_ok());
        assert!(CardioRecord::new(CardioType::Walk, date, None, 40).validate().is_ok());
        assert!(CardioRecord::new(CardioType::Run, date, Some(5.0), 0).validate().is_err());
        assert!(CardioRecord::new(CardioType::Run, date, Some(-1.0), 20).validate().is_err());
        assert!(CardioRecord::new(CardioType::Run, date, Some(f64::NAN), 20).validate().is_err());
    }

    #[test]
    fn test_sample_json_shape() {
        let json = r#"{
            "start": "2024-01-15T23:00:00Z",
            "end": "2024-01-16T01:00:00Z",
            "stage": "in_bed",
            "source_id": "com.apple.health"
        }"#;

        let sample: RawSample = serde_json::from_str(json).unwrap();
        assert_eq!(sample.stage, SleepStage::InBed);
        assert_eq!(sample.source_id, "com.apple.health");
        assert!(sample.interval().is_some());
    }

    #[test]
    fn test_cardio_record_json_shape() {
        let json = r#"{
            "id": "6f1c1a4e-3a0b-4a53-9d52-7d7f3a0c2b11",
            "type": "run",
            "date": "2024-01-15T07:00:00Z",
            "distance_km": 5.0,
            "duration_minutes": 25
        }"#;

        let record: CardioRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.kind, CardioType::Run);
        assert_eq!(record.distance_km, Some(5.0));
        assert_eq!(record.duration_minutes, 25);
        assert!(record.notes.is_none());

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["distance_km"], 5.0);
        assert_eq!(value["duration_minutes"], 25);
        assert!(value.get("distanceKm").is_none());
    }
}

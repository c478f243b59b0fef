//! Noon-anchored analysis window
//!
//! "Last night" is the 24 hours from yesterday 12:00 to today 12:00 in the
//! caller's local time. A noon boundary keeps one night's sleep in one window
//! even when it crosses midnight.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::types::RawSample;

/// Local hour at which one analysis day ends and the next begins
pub const DAY_BOUNDARY_HOUR: u32 = 12;

/// Half-open time window `[start, end)` used for a single night's analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl AnalysisWindow {
    /// Window for an explicit span
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, AnalysisError> {
        if start >= end {
            return Err(AnalysisError::InvalidWindow(format!(
                "window start {} is not before end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    /// `[yesterday 12:00, today 12:00)` in the time zone of `now`
    pub fn last_night<Tz: TimeZone>(now: &DateTime<Tz>) -> Result<Self, AnalysisError> {
        let tz = now.timezone();
        let today = now.date_naive();
        let yesterday = today.pred_opt().ok_or_else(|| {
            AnalysisError::InvalidWindow(format!("no calendar day before {}", today))
        })?;

        let start = local_noon(&tz, yesterday)?;
        let end = local_noon(&tz, today)?;
        Self::new(start, end)
    }

    /// Whether a sample's span intersects the window
    pub fn intersects(&self, sample: &RawSample) -> bool {
        sample.start < self.end && sample.end > self.start
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

fn local_noon<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Result<DateTime<Utc>, AnalysisError> {
    let noon = NaiveTime::from_hms_opt(DAY_BOUNDARY_HOUR, 0, 0)
        .ok_or_else(|| AnalysisError::InvalidWindow("invalid day boundary hour".to_string()))?;

    match tz.from_local_datetime(&date.and_time(noon)) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        // Repeated local time: take the earlier instant
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => Err(AnalysisError::InvalidWindow(format!(
            "{} 12:00 does not exist in the local time zone",
            date
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SleepStage;
    use chrono::FixedOffset;

    #[test]
    fn test_last_night_utc() {
        let now = Utc.with_ymd_and_hms(2024, 1, 16, 8, 30, 0).unwrap();
        let window = AnalysisWindow::last_night(&now).unwrap();

        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2024, 1, 16, 12, 0, 0).unwrap());
        assert_eq!(window.duration(), Duration::hours(24));
    }

    #[test]
    fn test_last_night_after_noon_is_still_anchored_to_today() {
        let now = Utc.with_ymd_and_hms(2024, 1, 16, 18, 0, 0).unwrap();
        let window = AnalysisWindow::last_night(&now).unwrap();
        assert_eq!(window.end, Utc.with_ymd_and_hms(2024, 1, 16, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_last_night_uses_local_noon() {
        let pst = FixedOffset::west_opt(8 * 3600).unwrap();
        let now = pst.with_ymd_and_hms(2024, 1, 16, 7, 0, 0).unwrap();
        let window = AnalysisWindow::last_night(&now).unwrap();

        // 12:00 PST is 20:00 UTC
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 1, 15, 20, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2024, 1, 16, 20, 0, 0).unwrap());
    }

    #[test]
    fn test_window_is_half_open() {
        let now = Utc.with_ymd_and_hms(2024, 1, 16, 8, 0, 0).unwrap();
        let window = AnalysisWindow::last_night(&now).unwrap();

        let at = |h: u32| Utc.with_ymd_and_hms(2024, 1, 16, h, 0, 0).unwrap();
        // Starts exactly at the window end: belongs to the next night
        let next = RawSample::new(at(12), at(13), SleepStage::Core, "src");
        // Ends exactly at the window end: still inside
        let last = RawSample::new(at(11), at(12), SleepStage::Core, "src");

        assert!(!window.intersects(&next));
        assert!(window.intersects(&last));
    }

    #[test]
    fn test_rejects_empty_window() {
        let t = Utc.with_ymd_and_hms(2024, 1, 16, 8, 0, 0).unwrap();
        assert!(AnalysisWindow::new(t, t).is_err());
    }

    #[test]
    fn test_intersects_sample_crossing_start() {
        let now = Utc.with_ymd_and_hms(2024, 1, 16, 8, 0, 0).unwrap();
        let window = AnalysisWindow::last_night(&now).unwrap();

        let crossing = RawSample::new(
            Utc.with_ymd_and_hms(2024, 1, 15, 11, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 13, 0, 0).unwrap(),
            SleepStage::Core,
            "src",
        );
        let before = RawSample::new(
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(),
            SleepStage::Core,
            "src",
        );

        assert!(window.intersects(&crossing));
        assert!(!window.intersects(&before));
    }
}

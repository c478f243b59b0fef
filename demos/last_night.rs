//! Summarize a fixed night of overlapping watch and Garmin samples, then check
//! a new run against a short history.
//!
//! Run with `cargo run --example last_night`.

use chrono::{DateTime, Duration, FixedOffset, Utc};

use restrun::format::{format_clock, format_hours, format_percent};
use restrun::{
    AnalysisError, AnalysisWindow, BreakdownView, CardioRecord, CardioType, InMemoryProvider,
    PrLabel, PrTracker, SleepAnalyzer, SleepSettings, SleepStage,
};

const SAMPLES: &str = r#"
{"start":"2024-01-15T22:30:00Z","end":"2024-01-16T00:30:00Z","stage":"core","source_id":"com.apple.health.watch"}
{"start":"2024-01-16T00:30:00Z","end":"2024-01-16T01:30:00Z","stage":"deep","source_id":"com.apple.health.watch"}
{"start":"2024-01-16T01:30:00Z","end":"2024-01-16T03:00:00Z","stage":"rem","source_id":"com.apple.health.watch"}
{"start":"2024-01-16T03:00:00Z","end":"2024-01-16T06:00:00Z","stage":"core","source_id":"com.apple.health.watch"}
{"start":"2024-01-16T06:00:00Z","end":"2024-01-16T06:20:00Z","stage":"awake","source_id":"com.apple.health.watch"}
{"start":"2024-01-15T22:45:00Z","end":"2024-01-16T01:00:00Z","stage":"deep","source_id":"com.garmin.connect"}
{"start":"2024-01-16T01:00:00Z","end":"2024-01-16T05:45:00Z","stage":"core","source_id":"com.garmin.connect"}
"#;

fn main() -> Result<(), AnalysisError> {
    let now: DateTime<FixedOffset> = DateTime::parse_from_rfc3339("2024-01-16T09:00:00+00:00")
        .map_err(|e| AnalysisError::InvalidWindow(e.to_string()))?;
    let window = AnalysisWindow::last_night(&now)?;
    println!("Night {} .. {}", window.start, window.end);

    let analyzer = SleepAnalyzer::new(InMemoryProvider::from_ndjson(SAMPLES)?);
    match analyzer.detect_preferred_source(&window)? {
        Some(source) => println!("Preferred source: {}", source),
        None => println!("No preferred source"),
    }

    let report = analyzer.nightly_report(&window, &SleepSettings::default())?;
    if let Some(hours) = report.total_sleep_hours {
        println!("Total sleep: {}", format_hours(hours));
    }
    if let Some(resolved) = &report.breakdown {
        match &resolved.view {
            BreakdownView::Union { source_id } => println!("Stages from {}", source_id),
            BreakdownView::Exclusive => println!("Stages from all sources"),
        }
        for stage in SleepStage::ASLEEP_BY_PRIORITY {
            println!(
                "  {:<12} {:>8} {:>6}",
                stage.as_str(),
                format_hours(resolved.breakdown.hours_for(stage)),
                format_percent(resolved.breakdown.fraction_for(stage))
            );
        }
    }

    let day = |days: i64| now.with_timezone(&Utc) - Duration::days(days);
    let history = vec![
        CardioRecord::new(CardioType::Run, day(10), Some(5.0), 27),
        CardioRecord::new(CardioType::Run, day(6), Some(10.0), 58),
        CardioRecord::new(CardioType::Cycle, day(4), Some(30.0), 75),
        CardioRecord::new(CardioType::Run, day(2), Some(3.0), 15),
    ];

    let bests = PrTracker::personal_bests(&history);
    for label in PrLabel::DISTANCES {
        if let Some(pr) = bests.distance_pr(label) {
            println!(
                "{}: {} ({} /km)",
                label,
                format_clock(pr.estimated_minutes),
                format_clock(pr.pace_minutes_per_km)
            );
        }
    }

    let todays_run = CardioRecord::new(CardioType::Run, day(0), Some(6.0), 31);
    let earned = PrTracker::evaluate_new_prs(&todays_run, &history, false);
    if earned.is_empty() {
        println!("Today's run: no new PRs");
    } else {
        let labels: Vec<String> = earned.iter().map(ToString::to_string).collect();
        println!("Today's run: {}", labels.join(", "));
    }

    Ok(())
}

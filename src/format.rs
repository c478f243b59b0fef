//! Display formatting for durations, paces and ratios

/// Hours as `"7 h"` or `"7 h 30 min"`, rounded to whole minutes
pub fn format_hours(hours: f64) -> String {
    if !hours.is_finite() || hours <= 0.0 {
        return "0 h".to_string();
    }

    let total_minutes = (hours * 60.0).round() as u64;
    let h = total_minutes / 60;
    let m = total_minutes % 60;

    if m == 0 {
        format!("{} h", h)
    } else {
        format!("{} h {} min", h, m)
    }
}

/// Minutes as `"m:ss"`; `"-"` for non-finite or negative input
pub fn format_clock(minutes: f64) -> String {
    if !minutes.is_finite() || minutes < 0.0 {
        return "-".to_string();
    }

    let total_seconds = (minutes * 60.0).round() as u64;
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Ratio in `[0, 1]` as a whole-number percentage
pub fn format_percent(ratio: f64) -> String {
    if !ratio.is_finite() {
        return "-".to_string();
    }
    format!("{}%", (ratio * 100.0).round() as i64)
}

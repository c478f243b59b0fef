//! Restrun CLI - Command-line interface for Restrun
//!
//! Commands:
//! - sleep: Summarize last night's sleep from exported samples
//! - detect: Print the preferred sleep source for last night
//! - prs: Print personal bests for a run history
//! - check-pr: Print the PRs a new or edited run earns

use chrono::{DateTime, FixedOffset, Local};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use restrun::format::{format_clock, format_hours, format_percent};
use restrun::{
    AnalysisError, AnalysisWindow, CardioRecord, InMemoryProvider, PersonalBests, PrLabel,
    PrTracker, SleepAnalyzer, SleepBreakdown, SleepReport, SleepSettings, SleepStage,
    SourcePreference, RESTRUN_VERSION,
};

/// Restrun - Sleep-stage aggregation and running PRs
#[derive(Parser)]
#[command(name = "restrun")]
#[command(version = RESTRUN_VERSION)]
#[command(about = "Summarize sleep stages and track running PRs", long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize last night's sleep
    Sleep {
        #[command(flatten)]
        night: NightArgs,

        /// Source policy (overrides the config file)
        #[arg(long)]
        preference: Option<PreferenceArg>,

        /// Custom source id (overrides the config file)
        #[arg(long)]
        source: Option<String>,

        /// Which view to print
        #[arg(long, default_value = "resolved")]
        view: SleepView,

        /// Sleep settings file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,
    },

    /// Print the preferred sleep source
    Detect {
        #[command(flatten)]
        night: NightArgs,

        /// Sleep settings file (JSON), for the vendor registry
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,
    },

    /// Print personal bests for a run history
    Prs {
        /// History file, a JSON array of cardio records (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,
    },

    /// Print the PRs a new or edited run earns
    CheckPr {
        /// History file, a JSON array of cardio records
        #[arg(long)]
        history: PathBuf,

        /// Candidate record file (JSON object, use - for stdin)
        #[arg(long)]
        candidate: PathBuf,

        /// The candidate replaces an existing record with the same id
        #[arg(long)]
        edit: bool,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,
    },
}

#[derive(clap::Args)]
struct NightArgs {
    /// Samples file path (use - for stdin)
    #[arg(short, long)]
    input: PathBuf,

    /// Input format
    #[arg(long, default_value = "ndjson")]
    input_format: InputFormat,

    /// Reference time (RFC 3339); defaults to the current local time
    #[arg(long)]
    now: Option<String>,
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one sample per line)
    Ndjson,
    /// JSON array of samples
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
    /// Human-readable summary
    Text,
}

#[derive(Clone, Copy, ValueEnum)]
enum SleepView {
    /// Total hours plus the preference-resolved breakdown
    Resolved,
    /// Merged asleep hours only
    Total,
    /// Union breakdown (filtered by --source when given)
    Union,
    /// Priority-exclusive breakdown across all sources
    Exclusive,
}

#[derive(Clone, Copy, ValueEnum)]
enum PreferenceArg {
    Auto,
    GarminOnly,
    AppleOnly,
    CombineExclusive,
}

impl From<PreferenceArg> for SourcePreference {
    fn from(arg: PreferenceArg) -> Self {
        match arg {
            PreferenceArg::Auto => SourcePreference::Auto,
            PreferenceArg::GarminOnly => SourcePreference::GarminOnly,
            PreferenceArg::AppleOnly => SourcePreference::AppleOnly,
            PreferenceArg::CombineExclusive => SourcePreference::CombineExclusive,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), RestrunCliError> {
    match cli.command {
        Commands::Sleep {
            night,
            preference,
            source,
            view,
            config,
            output_format,
        } => {
            let mut settings = load_settings(config.as_deref())?;
            if let Some(preference) = preference {
                settings.preference = preference.into();
            }
            if source.is_some() {
                settings.custom_source_id = source;
            }
            cmd_sleep(&night, &settings, view, output_format)
        }

        Commands::Detect {
            night,
            config,
            output_format,
        } => {
            let settings = load_settings(config.as_deref())?;
            cmd_detect(&night, &settings, output_format)
        }

        Commands::Prs {
            input,
            output_format,
        } => cmd_prs(&input, output_format),

        Commands::CheckPr {
            history,
            candidate,
            edit,
            output_format,
        } => cmd_check_pr(&history, &candidate, edit, output_format),
    }
}

fn cmd_sleep(
    night: &NightArgs,
    settings: &SleepSettings,
    view: SleepView,
    output_format: OutputFormat,
) -> Result<(), RestrunCliError> {
    let window = night_window(night.now.as_deref())?;
    let provider = load_samples(&night.input, &night.input_format)?;
    debug!(samples = provider.samples().len(), "loaded sleep samples");

    let analyzer = SleepAnalyzer::with_registry(provider, settings.registry.clone());

    match view {
        SleepView::Resolved => {
            let report = analyzer.nightly_report(&window, settings)?;
            match output_format {
                OutputFormat::Text => print!("{}", report_text(&report)),
                _ => println!("{}", to_json(&report, &output_format)?),
            }
        }
        SleepView::Total => {
            let hours = analyzer.compute_total_sleep_hours(&window)?;
            match output_format {
                OutputFormat::Text => match hours {
                    Some(h) => println!("Total sleep: {}", format_hours(h)),
                    None => println!("No sleep data"),
                },
                _ => println!(
                    "{}",
                    to_json(
                        &json!({ "window": window, "total_sleep_hours": hours }),
                        &output_format
                    )?
                ),
            }
        }
        SleepView::Union | SleepView::Exclusive => {
            let breakdown = match view {
                SleepView::Union => {
                    analyzer.compute_union_breakdown(&window, settings.effective_custom_source())?
                }
                _ => analyzer.compute_exclusive_breakdown(&window)?,
            };
            match output_format {
                OutputFormat::Text => match breakdown {
                    Some(b) => print!("{}", breakdown_text(&b)),
                    None => println!("No sleep data"),
                },
                _ => println!("{}", to_json(&breakdown, &output_format)?),
            }
        }
    }

    Ok(())
}

fn cmd_detect(
    night: &NightArgs,
    settings: &SleepSettings,
    output_format: OutputFormat,
) -> Result<(), RestrunCliError> {
    let window = night_window(night.now.as_deref())?;
    let provider = load_samples(&night.input, &night.input_format)?;
    let analyzer = SleepAnalyzer::with_registry(provider, settings.registry.clone());

    let source = analyzer.detect_preferred_source(&window)?;
    println!("{}", detect_output(source.as_deref(), &output_format)?);
    Ok(())
}

fn cmd_prs(input: &Path, output_format: OutputFormat) -> Result<(), RestrunCliError> {
    let history = load_history(input)?;
    let bests = PrTracker::personal_bests(&history);

    match output_format {
        OutputFormat::Text => print!("{}", bests_text(&bests)),
        _ => println!("{}", to_json(&bests, &output_format)?),
    }
    Ok(())
}

fn cmd_check_pr(
    history: &Path,
    candidate: &Path,
    edit: bool,
    output_format: OutputFormat,
) -> Result<(), RestrunCliError> {
    let history = load_history(history)?;
    let candidate: CardioRecord = serde_json::from_str(&read_input(candidate)?)?;
    candidate.validate()?;

    let labels = PrTracker::evaluate_new_prs(&candidate, &history, edit);

    match output_format {
        OutputFormat::Text => {
            if labels.is_empty() {
                println!("No new PRs");
            }
            for label in &labels {
                println!("{}", label);
            }
        }
        _ => println!("{}", to_json(&labels, &output_format)?),
    }
    Ok(())
}

// Helper functions

fn read_input(path: &Path) -> Result<String, RestrunCliError> {
    if path.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(RestrunCliError::InteractiveStdin);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn load_samples(path: &Path, format: &InputFormat) -> Result<InMemoryProvider, RestrunCliError> {
    let data = read_input(path)?;
    let provider = match format {
        InputFormat::Ndjson => InMemoryProvider::from_ndjson(&data)?,
        InputFormat::Json => InMemoryProvider::from_json_array(&data)?,
    };
    Ok(provider)
}

fn load_history(path: &Path) -> Result<Vec<CardioRecord>, RestrunCliError> {
    Ok(serde_json::from_str(&read_input(path)?)?)
}

fn load_settings(path: Option<&Path>) -> Result<SleepSettings, RestrunCliError> {
    match path {
        Some(path) => Ok(SleepSettings::from_json(&fs::read_to_string(path)?)?),
        None => Ok(SleepSettings::default()),
    }
}

fn night_window(now: Option<&str>) -> Result<AnalysisWindow, RestrunCliError> {
    let window = match now {
        Some(now) => {
            let now: DateTime<FixedOffset> = DateTime::parse_from_rfc3339(now)
                .map_err(|e| RestrunCliError::BadTimestamp(e.to_string()))?;
            AnalysisWindow::last_night(&now)?
        }
        None => AnalysisWindow::last_night(&Local::now())?,
    };
    debug!(start = %window.start, end = %window.end, "analysis window");
    Ok(window)
}

fn to_json<T: serde::Serialize>(
    value: &T,
    format: &OutputFormat,
) -> Result<String, RestrunCliError> {
    let json = match format {
        OutputFormat::JsonPretty => serde_json::to_string_pretty(value)?,
        _ => serde_json::to_string(value)?,
    };
    Ok(json)
}

/// A missing source is a normal outcome: `null` in JSON, a sentence in text
fn detect_output(source: Option<&str>, format: &OutputFormat) -> Result<String, RestrunCliError> {
    match format {
        OutputFormat::Text => Ok(source.unwrap_or("No preferred source").to_string()),
        _ => to_json(&source, format),
    }
}

fn breakdown_text(b: &SleepBreakdown) -> String {
    let mut out = format!("Asleep: {}\n", format_hours(b.total_hours()));
    for stage in SleepStage::ASLEEP_BY_PRIORITY {
        out.push_str(&format!(
            "  {}: {} ({})\n",
            stage.as_str(),
            format_hours(b.hours_for(stage)),
            format_percent(b.fraction_for(stage))
        ));
    }
    out
}

fn report_text(report: &SleepReport) -> String {
    let mut out = match report.total_sleep_hours {
        Some(h) => format!("Total sleep: {}\n", format_hours(h)),
        None => "No sleep data\n".to_string(),
    };

    if let Some(resolved) = &report.breakdown {
        let source = match &resolved.view {
            restrun::BreakdownView::Union { source_id } => source_id.as_str(),
            restrun::BreakdownView::Exclusive => "all sources",
        };
        out.push_str(&format!("Stages from {}", source));
        if resolved.fell_back {
            out.push_str(" (preferred source had no data)");
        }
        out.push('\n');
        out.push_str(&breakdown_text(&resolved.breakdown));
    }

    out
}

fn bests_text(bests: &PersonalBests) -> String {
    if bests.is_empty() {
        return "No runs with distance and duration yet\n".to_string();
    }

    let mut out = String::new();
    for label in PrLabel::DISTANCES {
        if let Some(pr) = bests.distance_pr(label) {
            out.push_str(&format!(
                "{}: {} ({} /km)\n",
                label,
                format_clock(pr.estimated_minutes),
                format_clock(pr.pace_minutes_per_km)
            ));
        }
    }
    if let Some(run) = &bests.longest_run {
        out.push_str(&format!(
            "{}: {:.2} km\n",
            PrLabel::LongestRun,
            run.distance_km.unwrap_or(0.0)
        ));
    }
    if let Some(pace) = bests.fastest_pace.as_ref().and_then(|r| r.pace_minutes_per_km()) {
        out.push_str(&format!("{}: {} /km\n", PrLabel::FastestPace, format_clock(pace)));
    }
    out
}

// Error types

#[derive(Debug)]
enum RestrunCliError {
    Io(io::Error),
    Analysis(AnalysisError),
    Json(serde_json::Error),
    BadTimestamp(String),
    InteractiveStdin,
}

impl From<io::Error> for RestrunCliError {
    fn from(e: io::Error) -> Self {
        RestrunCliError::Io(e)
    }
}

impl From<AnalysisError> for RestrunCliError {
    fn from(e: AnalysisError) -> Self {
        RestrunCliError::Analysis(e)
    }
}

impl From<serde_json::Error> for RestrunCliError {
    fn from(e: serde_json::Error) -> Self {
        RestrunCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<RestrunCliError> for CliError {
    fn from(e: RestrunCliError) -> Self {
        match e {
            RestrunCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            RestrunCliError::Analysis(e) => {
                let (code, hint) = match &e {
                    AnalysisError::ParseError(_) | AnalysisError::JsonError(_) => {
                        ("PARSE_ERROR", "Ensure input matches the sample schema")
                    }
                    AnalysisError::ProviderError(_) => ("PROVIDER_ERROR", "Retry the export"),
                    AnalysisError::InvalidWindow(_) => {
                        ("INVALID_WINDOW", "Pass an explicit --now timestamp")
                    }
                    AnalysisError::InvalidRecord(_) => (
                        "INVALID_RECORD",
                        "Runs need a positive duration and distance",
                    ),
                    AnalysisError::ConfigError(_) => ("CONFIG_ERROR", "Check the --config file"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            RestrunCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            RestrunCliError::BadTimestamp(msg) => CliError {
                code: "BAD_TIMESTAMP".to_string(),
                message: msg,
                hint: Some("Use RFC 3339, e.g. 2024-01-16T09:00:00+01:00".to_string()),
            },
            RestrunCliError::InteractiveStdin => CliError {
                code: "NO_INPUT".to_string(),
                message: "Refusing to read samples from an interactive terminal".to_string(),
                hint: Some("Pipe data into stdin or pass a file path".to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_detect_without_source_is_not_an_error() {
        assert_eq!(detect_output(None, &OutputFormat::Json).unwrap(), "null");
        assert_eq!(detect_output(None, &OutputFormat::JsonPretty).unwrap(), "null");
        assert_eq!(
            detect_output(None, &OutputFormat::Text).unwrap(),
            "No preferred source"
        );
    }

    #[test]
    fn test_detect_prints_source_id() {
        assert_eq!(
            detect_output(Some("com.garmin.connect"), &OutputFormat::Json).unwrap(),
            "\"com.garmin.connect\""
        );
        assert_eq!(
            detect_output(Some("com.garmin.connect"), &OutputFormat::Text).unwrap(),
            "com.garmin.connect"
        );
    }

    #[test]
    fn test_breakdown_text_lists_stages_by_priority() {
        let breakdown = SleepBreakdown {
            rem_seconds: 3600.0,
            deep_seconds: 3600.0,
            core_seconds: 7200.0,
            unspecified_seconds: 0.0,
            total_seconds: 14400.0,
        };

        let text = breakdown_text(&breakdown);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("Asleep: "));
        assert!(lines[1].trim_start().starts_with("deep: "));
        assert!(lines[2].trim_start().starts_with("rem: "));
        assert!(lines[3].trim_start().starts_with("core: "));
        assert!(lines[4].trim_start().starts_with("unspecified: "));
    }
}

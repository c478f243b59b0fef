//! Restrun - On-device sleep aggregation and running PR engine
//!
//! Restrun turns raw stage-labelled sleep samples from several wearable sources
//! into a single nightly picture, and tracks personal records across a running
//! history:
//!
//! - **Sleep**: window selection → stage classification → interval merging →
//!   union or priority-exclusive breakdown, with source-preference resolution
//! - **Running**: estimated distance PRs, longest run and fastest pace, with
//!   new-PR detection for created and edited runs

pub mod aggregator;
pub mod config;
pub mod error;
pub mod format;
pub mod interval;
pub mod pipeline;
pub mod provider;
pub mod running;
pub mod sources;
pub mod types;
pub mod window;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use aggregator::SleepAggregator;
pub use config::SleepSettings;
pub use error::AnalysisError;
pub use interval::{merge_intervals, TimeInterval};
pub use pipeline::SleepAnalyzer;
pub use provider::{InMemoryProvider, SampleProvider};
pub use running::{evaluate_new_prs, PersonalBests, PrLabel, PrTracker};
pub use sources::{SourcePreference, SourceRegistry};
pub use types::{
    BreakdownView, CardioRecord, CardioType, RawSample, ResolvedBreakdown, SleepBreakdown,
    SleepReport, SleepStage,
};
pub use window::AnalysisWindow;

/// Library version
pub const RESTRUN_VERSION: &str = env!("CARGO_PKG_VERSION");

//! Health-data sample providers
//!
//! The engine never talks to a platform health store directly. Callers inject a
//! [`SampleProvider`] that returns a snapshot of stage-labelled samples for a
//! window; retries and cancellation are the provider's concern.

use crate::error::AnalysisError;
use crate::types::{RawSample, SampleCategory};
use crate::window::AnalysisWindow;

/// Source of raw category samples
pub trait SampleProvider {
    /// Fetch every sample of `category` that intersects `window`
    fn fetch_category_samples(
        &self,
        category: SampleCategory,
        window: &AnalysisWindow,
    ) -> Result<Vec<RawSample>, AnalysisError>;
}

impl<P: SampleProvider + ?Sized> SampleProvider for &P {
    fn fetch_category_samples(
        &self,
        category: SampleCategory,
        window: &AnalysisWindow,
    ) -> Result<Vec<RawSample>, AnalysisError> {
        (**self).fetch_category_samples(category, window)
    }
}

/// Provider over samples already held in memory (exports, tests, FFI input)
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    samples: Vec<RawSample>,
}

impl InMemoryProvider {
    pub fn new(samples: Vec<RawSample>) -> Self {
        Self { samples }
    }

    /// Parse a JSON array of samples
    pub fn from_json_array(json: &str) -> Result<Self, AnalysisError> {
        let samples: Vec<RawSample> = serde_json::from_str(json)?;
        Ok(Self::new(samples))
    }

    /// Parse NDJSON (one sample per line, blank lines skipped)
    pub fn from_ndjson(ndjson: &str) -> Result<Self, AnalysisError> {
        let mut samples = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<RawSample>(trimmed) {
                Ok(sample) => samples.push(sample),
                Err(e) => {
                    return Err(AnalysisError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(Self::new(samples))
    }

    pub fn samples(&self) -> &[RawSample] {
        &self.samples
    }
}

impl SampleProvider for InMemoryProvider {
    fn fetch_category_samples(
        &self,
        category: SampleCategory,
        window: &AnalysisWindow,
    ) -> Result<Vec<RawSample>, AnalysisError> {
        match category {
            SampleCategory::SleepAnalysis => Ok(self
                .samples
                .iter()
                .filter(|s| window.intersects(s))
                .cloned()
                .collect()),
        }
    }
}

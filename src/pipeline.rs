//! Pipeline orchestration
//!
//! This module provides the caller-facing sleep API. It ties together the
//! injected sample provider, source detection and the aggregator:
//!
//! 1. SampleProvider - Fetch the window's raw samples
//! 2. SourceDetection - Find Garmin/platform candidates among the sources
//! 3. plan_resolution - Apply the user's preference
//! 4. SleepAggregator - Compute the union or exclusive view
//!
//! Provider failures propagate as errors; a night without data is `Ok(None)`.

use tracing::{info, warn};

use crate::aggregator::SleepAggregator;
use crate::config::SleepSettings;
use crate::error::AnalysisError;
use crate::provider::SampleProvider;
use crate::sources::{
    plan_resolution, ResolutionPlan, SourceDetection, SourcePreference, SourceRegistry,
};
use crate::types::{
    BreakdownView, RawSample, ResolvedBreakdown, SampleCategory, SleepBreakdown, SleepReport,
};
use crate::window::AnalysisWindow;

/// Sleep analysis over an injected health-data provider
pub struct SleepAnalyzer<P: SampleProvider> {
    provider: P,
    registry: SourceRegistry,
}

impl<P: SampleProvider> SleepAnalyzer<P> {
    /// Create an analyzer with the default vendor registry
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            registry: SourceRegistry::default(),
        }
    }

    /// Create an analyzer with a custom vendor registry
    pub fn with_registry(provider: P, registry: SourceRegistry) -> Self {
        Self { provider, registry }
    }

    fn fetch(&self, window: &AnalysisWindow) -> Result<Vec<RawSample>, AnalysisError> {
        self.provider
            .fetch_category_samples(SampleCategory::SleepAnalysis, window)
    }

    /// Merged asleep hours across every source
    pub fn compute_total_sleep_hours(
        &self,
        window: &AnalysisWindow,
    ) -> Result<Option<f64>, AnalysisError> {
        let samples = self.fetch(window)?;
        Ok(SleepAggregator::total_asleep_hours(&samples))
    }

    /// Union breakdown, optionally restricted to one source id
    pub fn compute_union_breakdown(
        &self,
        window: &AnalysisWindow,
        source_filter: Option<&str>,
    ) -> Result<Option<SleepBreakdown>, AnalysisError> {
        let samples = self.fetch(window)?;
        Ok(SleepAggregator::union_breakdown(&samples, source_filter))
    }

    /// Exclusive breakdown across every source
    pub fn compute_exclusive_breakdown(
        &self,
        window: &AnalysisWindow,
    ) -> Result<Option<SleepBreakdown>, AnalysisError> {
        let samples = self.fetch(window)?;
        Ok(SleepAggregator::exclusive_breakdown(&samples))
    }

    /// Garmin source if present, else the platform source, else `None`
    pub fn detect_preferred_source(
        &self,
        window: &AnalysisWindow,
    ) -> Result<Option<String>, AnalysisError> {
        let samples = self.fetch(window)?;
        let detection = SourceDetection::from_samples(&samples, &self.registry);
        Ok(detection.preferred().map(str::to_string))
    }

    /// Breakdown honouring the user's source preference.
    ///
    /// A filtered breakdown that finds no data degrades to the exclusive view.
    pub fn resolve_breakdown(
        &self,
        window: &AnalysisWindow,
        preference: SourcePreference,
        custom_source_id: Option<&str>,
    ) -> Result<Option<ResolvedBreakdown>, AnalysisError> {
        let samples = self.fetch(window)?;
        Ok(self.resolve_samples(&samples, preference, custom_source_id))
    }

    /// Total hours plus the resolved breakdown, from one fetch.
    ///
    /// Preference and override come from `settings`; vendor ids come from the
    /// analyzer's own registry.
    pub fn nightly_report(
        &self,
        window: &AnalysisWindow,
        settings: &SleepSettings,
    ) -> Result<SleepReport, AnalysisError> {
        let samples = self.fetch(window)?;

        Ok(SleepReport {
            window: *window,
            total_sleep_hours: SleepAggregator::total_asleep_hours(&samples),
            breakdown: self.resolve_samples(
                &samples,
                settings.preference,
                settings.effective_custom_source(),
            ),
        })
    }

    fn resolve_samples(
        &self,
        samples: &[RawSample],
        preference: SourcePreference,
        custom_source_id: Option<&str>,
    ) -> Option<ResolvedBreakdown> {
        let detection = SourceDetection::from_samples(samples, &self.registry);
        let plan = plan_resolution(preference, custom_source_id, &detection, &self.registry);

        match plan {
            ResolutionPlan::Exclusive => {
                info!(preference = preference.as_str(), "using exclusive sleep breakdown");
                SleepAggregator::exclusive_breakdown(samples).map(|breakdown| ResolvedBreakdown {
                    breakdown,
                    view: BreakdownView::Exclusive,
                    requested_source: None,
                    fell_back: false,
                })
            }
            ResolutionPlan::Filtered(source_id) => {
                info!(
                    preference = preference.as_str(),
                    source_id = source_id.as_str(),
                    "using source-filtered sleep breakdown"
                );

                if let Some(breakdown) =
                    SleepAggregator::union_breakdown(samples, Some(source_id.as_str()))
                {
                    return Some(ResolvedBreakdown {
                        breakdown,
                        view: BreakdownView::Union {
                            source_id: source_id.clone(),
                        },
                        requested_source: Some(source_id),
                        fell_back: false,
                    });
                }

                warn!(
                    source_id = source_id.as_str(),
                    "no sleep data from preferred source, combining all sources"
                );
                SleepAggregator::exclusive_breakdown(samples).map(|breakdown| ResolvedBreakdown {
                    breakdown,
                    view: BreakdownView::Exclusive,
                    requested_source: Some(source_id),
                    fell_back: true,
                })
            }
        }
    }
}

//! Sleep source preference
//!
//! Several apps and devices may write sleep samples for the same night. This
//! module detects which sources are present and, given the user's preference,
//! decides whether to read one source's samples or combine every source.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::RawSample;

/// Best-effort Garmin source id used when none is detected
pub const DEFAULT_GARMIN_SOURCE: &str = "com.garmin.connect";

/// Best-effort platform health source id used when none is detected
pub const DEFAULT_PLATFORM_SOURCE: &str = "com.apple.health";

/// Reverse-domain prefix of platform-vendor sources
pub const DEFAULT_PLATFORM_PREFIX: &str = "com.apple";

/// User-selected sleep source policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourcePreference {
    /// Prefer a detected source, otherwise combine all sources
    #[default]
    Auto,
    GarminOnly,
    AppleOnly,
    /// Always combine every source with the exclusive breakdown
    CombineExclusive,
}

impl SourcePreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourcePreference::Auto => "auto",
            SourcePreference::GarminOnly => "garmin_only",
            SourcePreference::AppleOnly => "apple_only",
            SourcePreference::CombineExclusive => "combine_exclusive",
        }
    }
}

/// Known vendor source ids used for detection and forced-preference fallbacks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceRegistry {
    pub garmin_fallback: String,
    pub platform_fallback: String,
    pub platform_prefix: String,
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self {
            garmin_fallback: DEFAULT_GARMIN_SOURCE.to_string(),
            platform_fallback: DEFAULT_PLATFORM_SOURCE.to_string(),
            platform_prefix: DEFAULT_PLATFORM_PREFIX.to_string(),
        }
    }
}

impl SourceRegistry {
    fn is_garmin(&self, source_id: &str) -> bool {
        source_id.to_lowercase().contains("garmin")
    }

    fn is_platform(&self, source_id: &str) -> bool {
        let lower = source_id.to_lowercase();
        lower.contains("watch") || lower.starts_with(&self.platform_prefix.to_lowercase())
    }
}

/// Candidate sources found among a night's samples
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceDetection {
    pub garmin: Option<String>,
    pub platform: Option<String>,
}

impl SourceDetection {
    /// Scan source ids in sorted order so the result does not depend on sample order
    pub fn from_source_ids<'a, I>(source_ids: I, registry: &SourceRegistry) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let distinct: BTreeSet<&str> = source_ids.into_iter().collect();

        Self {
            garmin: distinct
                .iter()
                .find(|id| registry.is_garmin(id))
                .map(|id| id.to_string()),
            platform: distinct
                .iter()
                .find(|id| registry.is_platform(id))
                .map(|id| id.to_string()),
        }
    }

    pub fn from_samples(samples: &[RawSample], registry: &SourceRegistry) -> Self {
        Self::from_source_ids(samples.iter().map(|s| s.source_id.as_str()), registry)
    }

    /// Garmin wins over the platform source
    pub fn preferred(&self) -> Option<&str> {
        self.garmin.as_deref().or(self.platform.as_deref())
    }
}

/// What the aggregator should compute for a preference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionPlan {
    /// Union breakdown of one source, degrading to exclusive when it is empty
    Filtered(String),
    /// Exclusive breakdown across every source
    Exclusive,
}

/// Trimmed custom source id, or `None` when blank
pub fn effective_override(custom_source_id: Option<&str>) -> Option<&str> {
    custom_source_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

/// Decide the aggregation for a preference.
///
/// A non-empty custom source id wins over every mode.
pub fn plan_resolution(
    preference: SourcePreference,
    custom_source_id: Option<&str>,
    detection: &SourceDetection,
    registry: &SourceRegistry,
) -> ResolutionPlan {
    if let Some(custom) = effective_override(custom_source_id) {
        return ResolutionPlan::Filtered(custom.to_string());
    }

    match preference {
        SourcePreference::CombineExclusive => ResolutionPlan::Exclusive,
        SourcePreference::Auto => match detection.preferred() {
            Some(source) => ResolutionPlan::Filtered(source.to_string()),
            None => ResolutionPlan::Exclusive,
        },
        SourcePreference::GarminOnly => ResolutionPlan::Filtered(
            detection
                .garmin
                .clone()
                .unwrap_or_else(|| registry.garmin_fallback.clone()),
        ),
        SourcePreference::AppleOnly => ResolutionPlan::Filtered(
            detection
                .platform
                .clone()
                .unwrap_or_else(|| registry.platform_fallback.clone()),
        ),
    }
}

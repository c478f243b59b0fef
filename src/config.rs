//! Sleep source settings
//!
//! Persisted user choices for where sleep data comes from. Stored as JSON next
//! to the rest of the app's preferences; every field has a default so older or
//! partial files still load.

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::sources::{effective_override, SourcePreference, SourceRegistry};

/// Sleep source configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepSettings {
    /// Source policy
    pub preference: SourcePreference,
    /// Advanced override; any non-blank value wins over `preference`
    pub custom_source_id: Option<String>,
    /// Vendor ids used by forced preferences
    pub registry: SourceRegistry,
}

impl SleepSettings {
    pub fn new(preference: SourcePreference) -> Self {
        Self {
            preference,
            ..Default::default()
        }
    }

    pub fn with_custom_source(mut self, source_id: impl Into<String>) -> Self {
        self.custom_source_id = Some(source_id.into());
        self
    }

    /// Trimmed override, `None` when unset or blank
    pub fn effective_custom_source(&self) -> Option<&str> {
        effective_override(self.custom_source_id.as_deref())
    }

    /// Load settings from JSON
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        let settings: SleepSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize settings to JSON
    pub fn to_json(&self) -> Result<String, AnalysisError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<(), AnalysisError> {
        let registry = &self.registry;
        for (name, value) in [
            ("garmin_fallback", &registry.garmin_fallback),
            ("platform_fallback", &registry.platform_fallback),
            ("platform_prefix", &registry.platform_prefix),
        ] {
            if value.trim().is_empty() {
                return Err(AnalysisError::ConfigError(format!(
                    "registry.{} must not be empty",
                    name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::DEFAULT_GARMIN_SOURCE;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_json_uses_defaults() {
        let settings = SleepSettings::from_json("{}").unwrap();
        assert_eq!(settings, SleepSettings::default());
        assert_eq!(settings.preference, SourcePreference::Auto);
        assert_eq!(settings.registry.garmin_fallback, DEFAULT_GARMIN_SOURCE);
    }

    #[test]
    fn test_partial_registry() {
        let json = r#"{
            "preference": "garmin_only",
            "registry": { "garmin_fallback": "com.garmin.connect.mobile" }
        }"#;
        let settings = SleepSettings::from_json(json).unwrap();

        assert_eq!(settings.preference, SourcePreference::GarminOnly);
        assert_eq!(settings.registry.garmin_fallback, "com.garmin.connect.mobile");
        assert_eq!(settings.registry.platform_prefix, "com.apple");
    }

    #[test]
    fn test_round_trip() {
        let settings =
            SleepSettings::new(SourcePreference::CombineExclusive).with_custom_source("com.example");
        let loaded = SleepSettings::from_json(&settings.to_json().unwrap()).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_blank_registry_entry_rejected() {
        let json = r#"{ "registry": { "platform_prefix": " " } }"#;
        let err = SleepSettings::from_json(json).unwrap_err();
        assert!(matches!(err, AnalysisError::ConfigError(_)));
    }

    #[test]
    fn test_effective_custom_source() {
        assert_eq!(
            SleepSettings::default()
                .with_custom_source("  ")
                .effective_custom_source(),
            None
        );
        assert_eq!(
            SleepSettings::default()
                .with_custom_source(" com.oura.ring ")
                .effective_custom_source(),
            Some("com.oura.ring")
        );
    }
}

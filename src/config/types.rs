//! Engine configuration types

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use crate::ambiguity::{CanonicalPolicy, TimeWindow};
use crate::annotation::DEFAULT_TIMEOUT_MS;
use crate::cast::{TemporalDirection, TimeField};
use crate::context::{ResolveContext, DEFAULT_DIMENSIONS};
use crate::error::ContextError;
use crate::filter::FilterMode;
use crate::temporal::parse_timezone;

/// Default annotation service endpoint
pub const DEFAULT_ANNOTATION_URL: &str = "http://0.0.0.0:8000/parse";

/// Static engine configuration, typically loaded from YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub dimensions: BTreeSet<String>,
    pub locale: String,
    pub timezone: String,
    pub annotation_url: String,
    pub timeout_ms: u64,
    /// Intent name (or `_any_`) to cast direction
    pub temporal_intents: HashMap<String, TemporalDirection>,
    pub datetime_filter: Option<FilterMode>,
    pub threshold: f64,
    pub activate_latent_entities: bool,
    pub canonical_policy: CanonicalPolicy,
    pub numeric_time_field: Option<TimeField>,
    pub time_window: Option<TimeWindow>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_DIMENSIONS.iter().map(|d| d.to_string()).collect(),
            locale: "en_IN".to_string(),
            timezone: "UTC".to_string(),
            annotation_url: DEFAULT_ANNOTATION_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            temporal_intents: HashMap::new(),
            datetime_filter: None,
            threshold: 0.0,
            activate_latent_entities: false,
            canonical_policy: CanonicalPolicy::default(),
            numeric_time_field: None,
            time_window: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Load configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_yaml::from_str(content).context("Failed to parse engine config YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values that would otherwise fail every resolve call
    pub fn validate(&self) -> Result<(), ContextError> {
        parse_timezone(&self.timezone)?;
        if let Some(window) = &self.time_window {
            window.validate()?;
        }
        if self.threshold.is_nan() || !(0.0..=1.0).contains(&self.threshold) {
            return Err(ContextError::InvalidThreshold {
                threshold: self.threshold,
            });
        }
        Ok(())
    }

    /// Per-request context from this configuration
    pub fn context(&self, reference_time_ms: Option<i64>, intent: Option<&str>) -> ResolveContext {
        ResolveContext {
            reference_time_ms,
            timezone: self.timezone.clone(),
            locale: self.locale.clone(),
            detected_intent_name: intent.map(str::to_string),
            temporal_intents: self.temporal_intents.clone(),
            datetime_filter: self.datetime_filter.map(|mode| mode.to_string()),
            score_threshold: self.threshold,
            activate_latent_entities: self.activate_latent_entities,
            dimensions: self.dimensions.clone(),
            canonical_policy: self.canonical_policy,
            numeric_time_field: self.numeric_time_field,
            time_window: self.time_window,
        }
    }
}

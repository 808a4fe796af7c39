//! Request-level resolution context

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::aggregate::Aggregator;
use crate::ambiguity::{AmbiguityResolver, CanonicalPolicy, TimeWindow};
use crate::builder::EntityBuilder;
use crate::cast::{direction_for, Caster, TemporalDirection, TimeField};
use crate::error::ContextError;
use crate::filter::DatetimeFilter;
use crate::temporal::{instant_from_millis, parse_timezone};

/// Dimensions requested when the caller names none
pub const DEFAULT_DIMENSIONS: [&str; 6] = [
    "time",
    "duration",
    "number",
    "people",
    "amount-of-money",
    "credit-card-number",
];

/// Everything a single `resolve` call needs besides the raw records.
///
/// Unknown keys are rejected so a mis-keyed field cannot silently disable
/// a cast or a filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolveContext {
    /// Unix milliseconds of the conversation turn
    #[serde(default)]
    pub reference_time_ms: Option<i64>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default)]
    pub detected_intent_name: Option<String>,
    /// Intent name (or [`crate::cast::ANY_INTENT`]) to cast direction
    #[serde(default, rename = "temporal_intent_direction_map", alias = "temporal_intents")]
    pub temporal_intents: HashMap<String, TemporalDirection>,
    /// One of `future`, `past`, `ge`
    #[serde(default, rename = "datetime_filter_mode", alias = "datetime_filter")]
    pub datetime_filter: Option<String>,
    #[serde(default)]
    pub score_threshold: f64,
    #[serde(default)]
    pub activate_latent_entities: bool,
    #[serde(default = "default_dimensions")]
    pub dimensions: BTreeSet<String>,
    #[serde(default)]
    pub canonical_policy: CanonicalPolicy,
    #[serde(default)]
    pub numeric_time_field: Option<TimeField>,
    /// Time of day that ambiguous time candidates should fall in
    #[serde(default)]
    pub time_window: Option<TimeWindow>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_locale() -> String {
    "en_IN".to_string()
}

fn default_dimensions() -> BTreeSet<String> {
    DEFAULT_DIMENSIONS.iter().map(|d| d.to_string()).collect()
}

impl Default for ResolveContext {
    fn default() -> Self {
        Self {
            reference_time_ms: None,
            timezone: default_timezone(),
            locale: default_locale(),
            detected_intent_name: None,
            temporal_intents: HashMap::new(),
            datetime_filter: None,
            score_threshold: 0.0,
            activate_latent_entities: false,
            dimensions: default_dimensions(),
            canonical_policy: CanonicalPolicy::default(),
            numeric_time_field: None,
            time_window: None,
        }
    }
}

impl ResolveContext {
    /// Decode a context from JSON; ill-typed fields reject the whole call
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ContextError> {
        serde_json::from_value(value.clone()).map_err(|e| ContextError::MalformedContext {
            reason: e.to_string(),
        })
    }

    pub fn with_reference_time(mut self, reference_time_ms: i64) -> Self {
        self.reference_time_ms = Some(reference_time_ms);
        self
    }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.detected_intent_name = Some(intent.into());
        self
    }

    /// Cast direction for the detected intent, if any applies
    pub fn direction(&self) -> Option<TemporalDirection> {
        direction_for(&self.temporal_intents, self.detected_intent_name.as_deref())
    }

    /// Validate the context and assemble the per-call pipeline stages
    pub(crate) fn stages(&self) -> Result<Stages, ContextError> {
        let timezone = parse_timezone(&self.timezone)?;
        if let Some(ms) = self.reference_time_ms {
            instant_from_millis(ms)?;
        }
        if let Some(window) = &self.time_window {
            window.validate()?;
        }
        let filter = self
            .datetime_filter
            .as_deref()
            .map(|mode| DatetimeFilter::new(mode, self.reference_time_ms))
            .transpose()?;

        Ok(Stages {
            builder: EntityBuilder::new(self.dimensions.iter().cloned()),
            resolver: AmbiguityResolver::new(self.canonical_policy).with_window(self.time_window),
            caster: Caster::new(self.reference_time_ms, timezone)
                .with_direction(self.direction())
                .with_numeric_field(self.numeric_time_field),
            aggregator: Aggregator::new(self.score_threshold)?,
            filter,
        })
    }
}

/// Validated stages of one resolution call
#[derive(Debug, Clone)]
pub(crate) struct Stages {
    pub builder: EntityBuilder,
    pub resolver: AmbiguityResolver,
    pub caster: Caster,
    pub aggregator: Aggregator,
    pub filter: Option<DatetimeFilter>,
}

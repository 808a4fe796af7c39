//! Datetime Filter
//!
//! Keeps time-shaped entities that compare correctly against the reference
//! instant. Everything else passes through untouched, in input order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use entity_types::Entity;

use crate::error::ContextError;
use crate::temporal::instant_from_millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// value > reference
    Future,
    /// value < reference
    Past,
    /// value >= reference
    Ge,
}

impl FilterMode {
    fn keeps(self, value_ms: i64, reference_ms: i64) -> bool {
        match self {
            FilterMode::Future => value_ms > reference_ms,
            FilterMode::Past => value_ms < reference_ms,
            FilterMode::Ge => value_ms >= reference_ms,
        }
    }
}

impl FromStr for FilterMode {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "future" => Ok(FilterMode::Future),
            "past" => Ok(FilterMode::Past),
            "ge" => Ok(FilterMode::Ge),
            other => Err(ContextError::InvalidFilterMode {
                mode: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FilterMode::Future => "future",
            FilterMode::Past => "past",
            FilterMode::Ge => "ge",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatetimeFilter {
    mode: FilterMode,
    reference_ms: i64,
}

impl DatetimeFilter {
    /// Validate a filter request. Both an unknown mode and a missing or
    /// unrepresentable reference time reject the whole call.
    pub fn new(mode: &str, reference_ms: Option<i64>) -> Result<Self, ContextError> {
        let mode = mode.parse::<FilterMode>()?;
        let reference_ms = reference_ms.ok_or_else(|| ContextError::MissingReferenceTime {
            operation: format!("apply the '{mode}' datetime filter"),
        })?;
        instant_from_millis(reference_ms)?;
        Ok(Self { mode, reference_ms })
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn apply(&self, entities: Vec<Entity>) -> Vec<Entity> {
        let before = entities.len();
        let kept: Vec<Entity> = entities
            .into_iter()
            .filter(|entity| match entity.canonical_instant() {
                Some(instant) => self.mode.keeps(instant.timestamp_millis(), self.reference_ms),
                None => true,
            })
            .collect();

        tracing::debug!(
            mode = %self.mode,
            before,
            after = kept.len(),
            "Applied datetime filter"
        );
        kept
    }
}

//! Raw annotation record shapes as returned by the annotation service
//!
//! These mirror the wire JSON loosely: every nested field is optional so
//! the builder can report precisely which part is missing.

use serde::Deserialize;
use serde_json::Value;

/// One annotation record over a span of text
#[derive(Debug, Clone, Deserialize)]
pub struct RawAnnotation {
    pub body: String,
    pub start: usize,
    pub end: usize,
    pub dim: String,
    #[serde(default)]
    pub latent: bool,
    #[serde(default)]
    pub value: RawValue,
}

/// The nested `value` object; its populated fields depend on the dimension
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawValue {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub value: Option<Value>,
    pub values: Option<Vec<RawCandidate>>,
    pub grain: Option<String>,
    pub from: Option<RawBound>,
    pub to: Option<RawBound>,
    pub unit: Option<String>,
    pub normalized: Option<RawNormalized>,
    pub issuer: Option<String>,
}

impl RawValue {
    pub fn is_interval(&self) -> bool {
        self.kind.as_deref() == Some("interval") || self.from.is_some() || self.to.is_some()
    }
}

/// One entry of `value.values`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCandidate {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub value: Option<Value>,
    pub grain: Option<String>,
    pub from: Option<RawBound>,
    pub to: Option<RawBound>,
}

impl RawCandidate {
    pub fn is_interval_shaped(&self) -> bool {
        self.value.is_none()
            && (self.from.is_some() || self.to.is_some() || self.kind.as_deref() == Some("interval"))
    }

    pub fn is_value_shaped(&self) -> bool {
        self.value.is_some()
    }
}

/// One bound of an interval
#[derive(Debug, Clone, Deserialize)]
pub struct RawBound {
    pub value: String,
    pub grain: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawNormalized {
    pub value: Option<f64>,
    pub unit: Option<String>,
}

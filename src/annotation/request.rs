//! Batch annotation request

use serde_json::Value;
use std::collections::BTreeSet;

use crate::context::ResolveContext;
use crate::error::InputShapeError;

/// One batch of text alternatives sent to the annotation service
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRequest {
    pub texts: Vec<String>,
    pub locale: String,
    pub timezone: String,
    pub reference_time_ms: Option<i64>,
    pub dimensions: BTreeSet<String>,
    /// Ask the service for latent detections too
    pub latent: bool,
}

impl AnnotationRequest {
    /// Request for `texts` using the locale, timezone, reference time,
    /// dimensions and latent setting of `ctx`
    pub fn new(texts: Vec<String>, ctx: &ResolveContext) -> Self {
        Self {
            texts,
            locale: ctx.locale.clone(),
            timezone: ctx.timezone.clone(),
            reference_time_ms: ctx.reference_time_ms,
            dimensions: ctx.dimensions.clone(),
            latent: ctx.activate_latent_entities,
        }
    }

    /// Accept a single string or a list of strings, nothing else
    pub fn from_json(input: &Value, ctx: &ResolveContext) -> Result<Self, InputShapeError> {
        let texts = match input {
            Value::String(text) => vec![text.clone()],
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(text) => Ok(text.clone()),
                    other => Err(InputShapeError::NotText {
                        found: describe(other).to_string(),
                    }),
                })
                .collect::<Result<Vec<_>, _>>()?,
            other => {
                return Err(InputShapeError::NotText {
                    found: describe(other).to_string(),
                })
            }
        };
        Ok(Self::new(texts, ctx))
    }

    /// `dims` form field: a JSON array of dimension names
    pub fn dims_json(&self) -> String {
        Value::from(self.dimensions.iter().cloned().collect::<Vec<_>>()).to_string()
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

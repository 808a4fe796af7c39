//! Entity Builder
//!
//! Converts one raw annotation record into a typed [`Entity`]:
//!
//! ```text
//! raw JSON record
//!     │
//!     ├─ shape check (serde)         → MalformedRecord
//!     ├─ body / span check           → EmptyBody, InvalidSpan
//!     ├─ dimension check             → DimensionNotRequested, UnsupportedDimension
//!     └─ per-dimension construction  → time | duration | number | people
//!                                      | amount-of-money | credit-card-number
//! ```
//!
//! Building is pure. A record whose every temporal candidate lies beyond
//! the representable year range yields `Ok(None)`.

mod raw;
mod scalar;
mod time;

pub use time::classify_time;

use std::collections::BTreeSet;

use entity_types::{Entity, Span};

use crate::error::StructuralError;
use raw::RawAnnotation;

/// Provenance tag added to every entity built from an annotation record
pub const PARSER_TAG: &str = "duckling";

/// Dimensions this builder knows how to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Time,
    Duration,
    Number,
    People,
    AmountOfMoney,
    CreditCardNumber,
}

impl Dimension {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "time" => Some(Dimension::Time),
            "duration" => Some(Dimension::Duration),
            "number" => Some(Dimension::Number),
            "people" => Some(Dimension::People),
            "amount-of-money" => Some(Dimension::AmountOfMoney),
            "credit-card-number" => Some(Dimension::CreditCardNumber),
            _ => None,
        }
    }
}

/// Builds entities for a fixed set of requested dimensions
#[derive(Debug, Clone)]
pub struct EntityBuilder {
    dimensions: BTreeSet<String>,
}

impl EntityBuilder {
    pub fn new<I, S>(dimensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dimensions: dimensions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn dimensions(&self) -> &BTreeSet<String> {
        &self.dimensions
    }

    /// Build one record. `text` is the alternative the record was extracted
    /// from; when known, the span must lie within it.
    pub fn build(
        &self,
        record: &serde_json::Value,
        text: Option<&str>,
    ) -> Result<Option<Entity>, StructuralError> {
        let raw: RawAnnotation = serde_json::from_value(record.clone()).map_err(|e| {
            StructuralError::MalformedRecord {
                reason: e.to_string(),
            }
        })?;

        if raw.body.is_empty() {
            return Err(StructuralError::EmptyBody);
        }
        let span = self.check_span(&raw, text)?;

        if !self.dimensions.contains(&raw.dim) {
            return Err(StructuralError::DimensionNotRequested {
                dimension: raw.dim.clone(),
            });
        }
        let dimension =
            Dimension::from_name(&raw.dim).ok_or_else(|| StructuralError::UnsupportedDimension {
                dimension: raw.dim.clone(),
            })?;

        let built = match dimension {
            Dimension::Time => time::build_time(&raw, span)?,
            Dimension::Duration => Some(scalar::build_duration(&raw, span)?),
            Dimension::Number => Some(scalar::build_number(&raw, span)?),
            Dimension::People => Some(scalar::build_people(&raw, span)?),
            Dimension::AmountOfMoney => Some(scalar::build_currency(&raw, span)?),
            Dimension::CreditCardNumber => Some(scalar::build_credit_card(&raw, span)?),
        };

        Ok(built.map(|entity| {
            let mut entity = entity.with_latent(raw.latent);
            entity.add_parser(PARSER_TAG);
            entity
        }))
    }

    fn check_span(&self, raw: &RawAnnotation, text: Option<&str>) -> Result<Span, StructuralError> {
        let text_len = text.map(|t| t.chars().count());
        let out_of_text = text_len.is_some_and(|len| raw.end > len);
        if raw.start >= raw.end || out_of_text {
            return Err(StructuralError::InvalidSpan {
                start: raw.start,
                end: raw.end,
                text_len: text_len.unwrap_or(raw.end),
            });
        }
        Ok(Span::new(raw.start, raw.end))
    }
}

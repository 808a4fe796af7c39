//! Entity Types - Level 1 Foundation Types
//!
//! Pure data structures shared by every stage of the entity engine: the
//! builder produces them, the resolver, caster, aggregator and filter
//! consume them, and callers receive them.
//!
//! ## Architecture Level: LEVEL 1 (Foundation)
//!
//! This crate depends on no other workspace crate. It holds no resolution
//! logic beyond constructors, accessors and canonical renderings.
//!
//! ## Contents
//!
//! - Character spans
//! - Temporal grains and the closed entity type enumeration
//! - Variant payloads (time, interval, duration, number, people, currency,
//!   credit card, keyword)
//! - The [`Entity`] record with shared fields and a tagged value payload

use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// ISO-8601 rendering used by the upstream annotation service
pub const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";

/// Largest calendar year an entity may carry
pub const MAX_YEAR: i32 = 9999;

// ============================================================================
// SPANS
// ============================================================================

/// Character offsets of an entity within its source text (end exclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// GRAIN AND ENTITY TYPE
// ============================================================================

/// Precision of a temporal value, ordered from finest to coarsest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grain {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl Grain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grain::Second => "second",
            Grain::Minute => "minute",
            Grain::Hour => "hour",
            Grain::Day => "day",
            Grain::Week => "week",
            Grain::Month => "month",
            Grain::Quarter => "quarter",
            Grain::Year => "year",
        }
    }

    /// Parse a grain name as reported by the annotation service
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "second" => Some(Grain::Second),
            "minute" => Some(Grain::Minute),
            "hour" => Some(Grain::Hour),
            "day" => Some(Grain::Day),
            "week" => Some(Grain::Week),
            "month" => Some(Grain::Month),
            "quarter" => Some(Grain::Quarter),
            "year" => Some(Grain::Year),
            _ => None,
        }
    }

    /// True for hour, minute and second
    pub fn is_sub_day(&self) -> bool {
        matches!(self, Grain::Second | Grain::Minute | Grain::Hour)
    }
}

impl fmt::Display for Grain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved semantic type of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityType {
    Date,
    Time,
    Datetime,
    Duration,
    Number,
    People,
    AmountOfMoney,
    CreditCardNumber,
    Keyword,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Date => "date",
            EntityType::Time => "time",
            EntityType::Datetime => "datetime",
            EntityType::Duration => "duration",
            EntityType::Number => "number",
            EntityType::People => "people",
            EntityType::AmountOfMoney => "amount-of-money",
            EntityType::CreditCardNumber => "credit-card-number",
            EntityType::Keyword => "keyword",
        }
    }

    /// Date, time and datetime
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            EntityType::Date | EntityType::Time | EntityType::Datetime
        )
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// VALUE PAYLOADS
// ============================================================================

/// An absolute instant together with its precision
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeValue {
    #[serde(with = "iso_instant")]
    pub value: DateTime<FixedOffset>,
    pub grain: Grain,
}

impl TimeValue {
    pub fn new(value: DateTime<FixedOffset>, grain: Grain) -> Self {
        Self { value, grain }
    }

    /// Render in the service's ISO-8601 shape
    pub fn to_iso(&self) -> String {
        self.value.format(ISO_FORMAT).to_string()
    }

    pub fn timestamp_millis(&self) -> i64 {
        self.value.timestamp_millis()
    }
}

/// A time interval; at least one bound is present once built
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntervalValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<TimeValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<TimeValue>,
}

impl IntervalValue {
    pub fn new(from: Option<TimeValue>, to: Option<TimeValue>) -> Self {
        Self { from, to }
    }

    /// The bound used for comparisons: `from` when present, else `to`
    pub fn anchor(&self) -> Option<&TimeValue> {
        self.from.as_ref().or(self.to.as_ref())
    }

    pub fn is_open(&self) -> bool {
        self.from.is_none() || self.to.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationValue {
    pub amount: f64,
    pub unit: Grain,
    pub normalized_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberValue {
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeopleValue {
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyValue {
    pub value: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl CurrencyValue {
    /// Unit followed by the amount to two decimal places, e.g. `$5.25`
    pub fn display(&self) -> String {
        format!(
            "{}{:.2}",
            self.unit.as_deref().unwrap_or_default(),
            self.value
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditCardValue {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
}

/// A keyword or pattern detection; `label` names the keyword list it matched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordValue {
    pub value: String,
    pub label: String,
}

/// Variant-specific payload of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityValue {
    Time(TimeValue),
    Interval(IntervalValue),
    Duration(DurationValue),
    Number(NumberValue),
    People(PeopleValue),
    Currency(CurrencyValue),
    CreditCard(CreditCardValue),
    Keyword(KeywordValue),
}

impl EntityValue {
    /// Instant used for temporal comparison, if this is a time-shaped value
    pub fn anchor_instant(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            EntityValue::Time(time) => Some(time.value),
            EntityValue::Interval(interval) => interval.anchor().map(|bound| bound.value),
            _ => None,
        }
    }

    pub fn is_time_shaped(&self) -> bool {
        matches!(self, EntityValue::Time(_) | EntityValue::Interval(_))
    }

    /// Stable textual rendering used as part of the deduplication key
    pub fn canonical_key(&self) -> String {
        match self {
            EntityValue::Time(time) => time.to_iso(),
            EntityValue::Interval(interval) => format!(
                "{}/{}",
                interval.from.as_ref().map(TimeValue::to_iso).unwrap_or_default(),
                interval.to.as_ref().map(TimeValue::to_iso).unwrap_or_default()
            ),
            EntityValue::Duration(duration) => format!("{} {}", duration.amount, duration.unit),
            EntityValue::Number(number) => number.value.to_string(),
            EntityValue::People(people) => format!(
                "{} {}",
                people.value,
                people.unit.as_deref().unwrap_or_default()
            ),
            EntityValue::Currency(currency) => currency.display(),
            EntityValue::CreditCard(card) => card.value.clone(),
            EntityValue::Keyword(keyword) => format!("{}:{}", keyword.label, keyword.value),
        }
    }
}

// ============================================================================
// ENTITY
// ============================================================================

/// One typed detection over a span of an alternative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Exact substring that triggered the detection
    pub body: String,
    pub range: Span,
    /// Category reported by the annotation service, never rewritten
    pub dimension: String,
    pub entity_type: EntityType,
    /// Canonical value
    pub value: EntityValue,
    /// Candidate values in service-reported order
    pub values: Vec<EntityValue>,
    /// Confidence in [0, 1]
    pub score: f64,
    pub latent: bool,
    /// Stage tags that produced or transformed this entity
    #[serde(default)]
    pub parsers: BTreeSet<String>,
    /// Lowest alternative this entity was detected in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_index: Option<usize>,
    /// Every alternative this entity was detected in (sorted, unique)
    #[serde(default)]
    pub alternative_indices: Vec<usize>,
}

impl Entity {
    /// Create an entity with a single candidate value and full confidence
    pub fn new(
        body: impl Into<String>,
        range: Span,
        dimension: impl Into<String>,
        entity_type: EntityType,
        value: EntityValue,
    ) -> Self {
        Self {
            body: body.into(),
            range,
            dimension: dimension.into(),
            entity_type,
            values: vec![value.clone()],
            value,
            score: 1.0,
            latent: false,
            parsers: BTreeSet::new(),
            alternative_index: None,
            alternative_indices: Vec::new(),
        }
    }

    /// Create an entity from an ordered candidate list; the first candidate is canonical.
    ///
    /// Returns `None` when `values` is empty.
    pub fn with_candidates(
        body: impl Into<String>,
        range: Span,
        dimension: impl Into<String>,
        entity_type: EntityType,
        values: Vec<EntityValue>,
    ) -> Option<Self> {
        let value = values.first()?.clone();
        let mut entity = Self::new(body, range, dimension, entity_type, value);
        entity.values = values;
        Some(entity)
    }

    /// Keyword or pattern detection produced outside the annotation service
    pub fn keyword(
        body: impl Into<String>,
        range: Span,
        label: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::new(
            body,
            range,
            "keyword",
            EntityType::Keyword,
            EntityValue::Keyword(KeywordValue {
                value: value.into(),
                label: label.into(),
            }),
        )
    }

    pub fn add_parser(&mut self, parser: impl Into<String>) -> &mut Self {
        self.parsers.insert(parser.into());
        self
    }

    pub fn with_latent(mut self, latent: bool) -> Self {
        self.latent = latent;
        self
    }

    /// Record the alternative this entity was detected in
    pub fn with_alternative(mut self, index: usize) -> Self {
        self.alternative_index = Some(index);
        self.alternative_indices = vec![index];
        self
    }

    /// Instant of the canonical value when it is time-shaped
    pub fn canonical_instant(&self) -> Option<DateTime<FixedOffset>> {
        self.value.anchor_instant()
    }

    /// `(entity_type, canonical value, body)`
    pub fn grouping_key(&self) -> (EntityType, String, String) {
        (self.entity_type, self.value.canonical_key(), self.body.clone())
    }
}

mod iso_instant {
    use super::ISO_FORMAT;
    use chrono::{DateTime, FixedOffset};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<FixedOffset>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(ISO_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn instant(raw: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(raw).unwrap()
    }

    #[test]
    fn test_grain_names_round_trip() {
        for grain in [
            Grain::Second,
            Grain::Minute,
            Grain::Hour,
            Grain::Day,
            Grain::Week,
            Grain::Month,
            Grain::Quarter,
            Grain::Year,
        ] {
            assert_eq!(Grain::from_name(grain.as_str()), Some(grain));
        }
        assert_eq!(Grain::from_name("fortnight"), None);
    }

    #[test]
    fn test_grain_sub_day() {
        assert!(Grain::Hour.is_sub_day());
        assert!(!Grain::Day.is_sub_day());
        assert!(Grain::Minute < Grain::Year);
    }

    #[test]
    fn test_time_value_iso_rendering() {
        let time = TimeValue::new(instant("2021-04-17T16:00:00.000+05:30"), Grain::Hour);
        assert_eq!(time.to_iso(), "2021-04-17T16:00:00.000+05:30");

        let encoded = serde_json::to_value(&time).unwrap();
        assert_eq!(
            encoded,
            json!({"value": "2021-04-17T16:00:00.000+05:30", "grain": "hour"})
        );
    }

    #[test]
    fn test_interval_anchor_prefers_from() {
        let from = TimeValue::new(instant("2021-04-16T16:00:00.000+05:30"), Grain::Hour);
        let to = TimeValue::new(instant("2021-04-16T18:00:00.000+05:30"), Grain::Hour);

        let closed = IntervalValue::new(Some(from.clone()), Some(to.clone()));
        assert_eq!(closed.anchor(), Some(&from));
        assert!(!closed.is_open());

        let open = IntervalValue::new(None, Some(to.clone()));
        assert_eq!(open.anchor(), Some(&to));
        assert!(open.is_open());
    }

    #[test]
    fn test_currency_display() {
        let currency = CurrencyValue {
            value: Decimal::new(525, 2),
            unit: Some("$".to_string()),
        };
        assert_eq!(currency.display(), "$5.25");
    }

    #[test]
    fn test_entity_new_mirrors_value_into_values() {
        let entity = Entity::new(
            "twelve",
            Span::new(0, 6),
            "number",
            EntityType::Number,
            EntityValue::Number(NumberValue { value: 12.0 }),
        );
        assert_eq!(entity.values, vec![entity.value.clone()]);
        assert_eq!(entity.score, 1.0);
        assert_eq!(
            entity.grouping_key(),
            (EntityType::Number, "12".to_string(), "twelve".to_string())
        );
    }

    #[test]
    fn test_with_candidates_requires_one_value() {
        assert!(Entity::with_candidates(
            "monday",
            Span::new(0, 6),
            "time",
            EntityType::Date,
            vec![]
        )
        .is_none());
    }

    #[test]
    fn test_entity_type_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_value(EntityType::AmountOfMoney).unwrap(),
            json!("amount-of-money")
        );
        assert_eq!(EntityType::CreditCardNumber.to_string(), "credit-card-number");
    }

    #[test]
    fn test_keyword_entity() {
        let entity = Entity::keyword("apples", Span::new(17, 23), "fruits", "apple");
        assert_eq!(entity.entity_type, EntityType::Keyword);
        assert_eq!(entity.value.canonical_key(), "fruits:apple");
        assert!(entity.canonical_instant().is_none());
    }
}

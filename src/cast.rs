//! Cross-Type Caster
//!
//! Reinterprets durations (and, on request, bare numbers) as absolute
//! times relative to the conversation's reference instant.

use chrono::{DateTime, Datelike, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use entity_types::{
    DurationValue, Entity, EntityType, EntityValue, Grain, NumberValue, TimeValue, MAX_YEAR,
};

use crate::error::{ContextError, EngineError, StructuralError};
use crate::temporal::{in_timezone, instant_from_millis, shift_seconds};

/// Provenance tag added to every cast entity
pub const CAST_TAG: &str = "cast";

/// Key of the temporal intent map that applies to every intent
pub const ANY_INTENT: &str = "_any_";

// ============================================================================
// DIRECTION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemporalDirection {
    Past,
    Future,
}

impl FromStr for TemporalDirection {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "past" => Ok(TemporalDirection::Past),
            "future" => Ok(TemporalDirection::Future),
            other => Err(ContextError::InvalidDirection {
                direction: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for TemporalDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemporalDirection::Past => f.write_str("past"),
            TemporalDirection::Future => f.write_str("future"),
        }
    }
}

/// Direction for `intent`: exact match first, then the wildcard key
pub fn direction_for(
    temporal_intents: &HashMap<String, TemporalDirection>,
    intent: Option<&str>,
) -> Option<TemporalDirection> {
    intent
        .and_then(|name| temporal_intents.get(name))
        .or_else(|| temporal_intents.get(ANY_INTENT))
        .copied()
}

// ============================================================================
// NUMERIC TIME FIELD
// ============================================================================

/// Field of the reference datetime replaced by a number cast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeField {
    Hour,
    Day,
    Month,
}

impl TimeField {
    fn grain(self) -> Grain {
        match self {
            TimeField::Hour => Grain::Hour,
            TimeField::Day => Grain::Day,
            TimeField::Month => Grain::Month,
        }
    }
}

impl FromStr for TimeField {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hour" => Ok(TimeField::Hour),
            "day" => Ok(TimeField::Day),
            "month" => Ok(TimeField::Month),
            other => Err(ContextError::InvalidCastField {
                field: other.to_string(),
            }),
        }
    }
}

// ============================================================================
// CASTER
// ============================================================================

/// Request-scoped caster
#[derive(Debug, Clone)]
pub struct Caster {
    reference_time_ms: Option<i64>,
    timezone: Tz,
    direction: Option<TemporalDirection>,
    numeric_field: Option<TimeField>,
}

impl Caster {
    pub fn new(reference_time_ms: Option<i64>, timezone: Tz) -> Self {
        Self {
            reference_time_ms,
            timezone,
            direction: None,
            numeric_field: None,
        }
    }

    /// Enable duration casts in `direction`
    pub fn with_direction(mut self, direction: Option<TemporalDirection>) -> Self {
        self.direction = direction;
        self
    }

    /// Enable number casts onto `field`
    pub fn with_numeric_field(mut self, field: Option<TimeField>) -> Self {
        self.numeric_field = field;
        self
    }

    /// Cast `entity` if a cast applies, otherwise return it unchanged.
    ///
    /// A missing or unrepresentable reference time is a [`ContextError`]; a
    /// value that cannot be placed on the calendar is a [`StructuralError`].
    /// A cast landing beyond year [`MAX_YEAR`] gives `Ok(None)`, like the
    /// builder does for such timestamps.
    pub fn cast(&self, entity: Entity) -> Result<Option<Entity>, EngineError> {
        let time = match (&entity.value, self.direction, self.numeric_field) {
            (EntityValue::Duration(duration), Some(direction), _) => {
                self.cast_duration(&entity, duration, direction)?
            }
            (EntityValue::Number(number), _, Some(field)) => {
                Some(self.cast_number(&entity, number, field)?)
            }
            _ => return Ok(Some(entity)),
        };
        Ok(time.map(|time| cast_entity(entity, time)))
    }

    fn reference(&self, operation: &str) -> Result<DateTime<Utc>, ContextError> {
        let ms = self
            .reference_time_ms
            .ok_or_else(|| ContextError::MissingReferenceTime {
                operation: operation.to_string(),
            })?;
        instant_from_millis(ms)
    }

    fn cast_duration(
        &self,
        entity: &Entity,
        duration: &DurationValue,
        direction: TemporalDirection,
    ) -> Result<Option<TimeValue>, EngineError> {
        let reference = self.reference("cast a duration")?;
        let forward = direction == TemporalDirection::Future;
        let shifted = shift_seconds(reference, duration.normalized_seconds, forward).ok_or_else(|| {
            StructuralError::InvalidNumber {
                dimension: entity.dimension.clone(),
                reason: format!(
                    "{} seconds {} the reference time is out of range",
                    duration.normalized_seconds,
                    if forward { "after" } else { "before" }
                ),
            }
        })?;

        let local = in_timezone(shifted, self.timezone);
        if !(0..=MAX_YEAR).contains(&local.year()) {
            tracing::debug!(body = %entity.body, year = local.year(), "Cast lands outside representable years");
            return Ok(None);
        }

        tracing::debug!(
            body = %entity.body,
            direction = %direction,
            seconds = duration.normalized_seconds,
            "Casting duration to time"
        );
        Ok(Some(TimeValue::new(local, duration.unit)))
    }

    fn cast_number(
        &self,
        entity: &Entity,
        number: &NumberValue,
        field: TimeField,
    ) -> Result<TimeValue, EngineError> {
        let reference = self.reference("cast a number")?.with_timezone(&self.timezone);
        let invalid = |reason: String| StructuralError::InvalidNumber {
            dimension: entity.dimension.clone(),
            reason,
        };

        if number.value.fract() != 0.0 || number.value < 0.0 || number.value > u32::MAX as f64 {
            return Err(invalid(format!("{} is not a whole calendar value", number.value)).into());
        }
        let whole = number.value as u32;

        let replaced = match field {
            TimeField::Hour => reference.with_hour(whole),
            TimeField::Day => reference.with_day(whole),
            TimeField::Month => reference.with_month(whole),
        }
        .ok_or_else(|| invalid(format!("{whole} is not a valid {:?} of the reference time", field)))?;

        tracing::debug!(body = %entity.body, field = ?field, value = whole, "Casting number to time");
        Ok(TimeValue::new(
            in_timezone(replaced.with_timezone(&Utc), self.timezone),
            field.grain(),
        ))
    }
}

fn cast_entity(source: Entity, time: TimeValue) -> Entity {
    let entity_type = if time.grain.is_sub_day() {
        EntityType::Datetime
    } else {
        EntityType::Date
    };
    let value = EntityValue::Time(time);

    let mut cast = Entity {
        entity_type,
        values: vec![value.clone()],
        value,
        ..source
    };
    cast.add_parser(CAST_TAG);
    cast
}

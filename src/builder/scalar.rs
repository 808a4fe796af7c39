//! Scalar dimensions: number, people, amount-of-money, credit-card-number, duration

use rust_decimal::Decimal;
use serde_json::Value;

use entity_types::{
    CreditCardValue, CurrencyValue, DurationValue, Entity, EntityType, EntityValue, Grain,
    NumberValue, PeopleValue, Span,
};

use super::raw::RawAnnotation;
use crate::error::StructuralError;

pub(super) fn build_number(raw: &RawAnnotation, span: Span) -> Result<Entity, StructuralError> {
    let value = numeric(raw, scalar(raw)?)?;
    Ok(entity(raw, span, EntityType::Number, EntityValue::Number(NumberValue { value })))
}

pub(super) fn build_people(raw: &RawAnnotation, span: Span) -> Result<Entity, StructuralError> {
    let value = numeric(raw, scalar(raw)?)?;
    Ok(entity(
        raw,
        span,
        EntityType::People,
        EntityValue::People(PeopleValue {
            value,
            unit: raw.value.unit.clone(),
        }),
    ))
}

pub(super) fn build_currency(raw: &RawAnnotation, span: Span) -> Result<Entity, StructuralError> {
    let value = match scalar(raw)? {
        Value::Number(n) => decimal(raw, &n.to_string())?,
        Value::String(s) => decimal(raw, s)?,
        other => return Err(invalid(raw, format!("expected an amount, found {other}"))),
    };
    Ok(entity(
        raw,
        span,
        EntityType::AmountOfMoney,
        EntityValue::Currency(CurrencyValue {
            value,
            unit: raw.value.unit.clone(),
        }),
    ))
}

pub(super) fn build_credit_card(raw: &RawAnnotation, span: Span) -> Result<Entity, StructuralError> {
    let value = match scalar(raw)? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => return Err(invalid(raw, format!("expected a card number, found {other}"))),
    };
    Ok(entity(
        raw,
        span,
        EntityType::CreditCardNumber,
        EntityValue::CreditCard(CreditCardValue {
            value,
            issuer: raw.value.issuer.clone(),
        }),
    ))
}

pub(super) fn build_duration(raw: &RawAnnotation, span: Span) -> Result<Entity, StructuralError> {
    let amount = numeric(raw, scalar(raw)?)?;

    let unit_name = raw.value.unit.as_deref().ok_or_else(|| missing(raw, "unit"))?;
    let unit = Grain::from_name(unit_name).ok_or_else(|| StructuralError::InvalidGrain {
        grain: unit_name.to_string(),
    })?;

    let normalized = raw
        .value
        .normalized
        .as_ref()
        .ok_or_else(|| missing(raw, "normalized.value"))?;
    if let Some(unit) = normalized.unit.as_deref().filter(|unit| *unit != "second") {
        return Err(invalid(raw, format!("normalized unit must be second, found '{unit}'")));
    }
    let normalized_seconds = normalized.value.ok_or_else(|| missing(raw, "normalized.value"))?;
    if !normalized_seconds.is_finite() {
        return Err(invalid(raw, "normalized seconds must be finite".to_string()));
    }

    Ok(entity(
        raw,
        span,
        EntityType::Duration,
        EntityValue::Duration(DurationValue {
            amount,
            unit,
            normalized_seconds,
        }),
    ))
}

// ============================================================================
// HELPERS
// ============================================================================

fn entity(raw: &RawAnnotation, span: Span, entity_type: EntityType, value: EntityValue) -> Entity {
    Entity::new(raw.body.clone(), span, raw.dim.clone(), entity_type, value)
}

fn scalar(raw: &RawAnnotation) -> Result<&Value, StructuralError> {
    match &raw.value.value {
        Some(Value::Null) | None => Err(missing(raw, "value")),
        Some(value) => Ok(value),
    }
}

fn numeric(raw: &RawAnnotation, value: &Value) -> Result<f64, StructuralError> {
    value
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(raw, format!("expected a number, found {value}")))
}

fn decimal(raw: &RawAnnotation, text: &str) -> Result<Decimal, StructuralError> {
    text.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|e| invalid(raw, e.to_string()))
}

fn missing(raw: &RawAnnotation, field: &str) -> StructuralError {
    StructuralError::MissingValue {
        dimension: raw.dim.clone(),
        field: field.to_string(),
    }
}

fn invalid(raw: &RawAnnotation, reason: String) -> StructuralError {
    StructuralError::InvalidNumber {
        dimension: raw.dim.clone(),
        reason,
    }
}

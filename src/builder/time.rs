//! Time and time-interval entities

use regex::Regex;
use std::sync::LazyLock;

use entity_types::{Entity, EntityType, EntityValue, Grain, IntervalValue, Span, TimeValue};

use super::raw::{RawAnnotation, RawBound, RawCandidate, RawValue};
use crate::error::StructuralError;
use crate::temporal::parse_instant;

/// Explicit clock readings: "10:30", "5 pm", "7 o'clock", "1800 hrs"
static CLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d{1,2}[:.]\d{2}|\b\d{1,2}\s*(?:am|pm|a\.m\.|p\.m\.|o'?clock)|\b\d{3,4}\s*(?:hrs|hours)\b")
        .unwrap()
});

/// Classify a time entity from the grain of its canonical candidate.
///
/// Day and coarser grains are dates. A second-level grain without an
/// explicit clock reading in the body is "now"-relative and becomes a
/// datetime. Every other sub-day grain is a time.
pub fn classify_time(grain: Grain, body: &str) -> EntityType {
    if !grain.is_sub_day() {
        EntityType::Date
    } else if grain == Grain::Second && !CLOCK_RE.is_match(body) {
        EntityType::Datetime
    } else {
        EntityType::Time
    }
}

pub(super) fn build_time(raw: &RawAnnotation, span: Span) -> Result<Option<Entity>, StructuralError> {
    let candidates = collect_candidates(&raw.value);

    let any_interval = raw.value.is_interval() || candidates.iter().any(RawCandidate::is_interval_shaped);
    if any_interval && candidates.iter().any(RawCandidate::is_value_shaped) {
        return Err(StructuralError::HybridInterval {
            body: raw.body.clone(),
        });
    }

    let (grain, values) = if any_interval {
        match interval_candidates(raw, &candidates)? {
            Some(found) => found,
            None => return Ok(None),
        }
    } else {
        match instant_candidates(raw, &candidates)? {
            Some(found) => found,
            None => return Ok(None),
        }
    };

    Ok(Entity::with_candidates(
        raw.body.clone(),
        span,
        raw.dim.clone(),
        classify_time(grain, &raw.body),
        values,
    ))
}

/// `value.values` when present, otherwise the top-level value as a single candidate
fn collect_candidates(value: &RawValue) -> Vec<RawCandidate> {
    match &value.values {
        Some(values) if !values.is_empty() => values.clone(),
        _ => vec![RawCandidate {
            kind: value.kind.clone(),
            value: value.value.clone(),
            grain: value.grain.clone(),
            from: value.from.clone(),
            to: value.to.clone(),
        }],
    }
}

type Candidates = (Grain, Vec<EntityValue>);

fn instant_candidates(
    raw: &RawAnnotation,
    candidates: &[RawCandidate],
) -> Result<Option<Candidates>, StructuralError> {
    let mut values = Vec::with_capacity(candidates.len());
    let mut canonical_grain = None;

    for candidate in candidates {
        let iso = match &candidate.value {
            Some(serde_json::Value::String(iso)) => iso,
            Some(other) => {
                return Err(StructuralError::MalformedRecord {
                    reason: format!("time value must be an ISO-8601 string, found {other}"),
                })
            }
            None => return Err(missing(raw, "value")),
        };
        let grain_name = candidate
            .grain
            .as_deref()
            .or(raw.value.grain.as_deref())
            .ok_or_else(|| missing(raw, "grain"))?;
        let grain = parse_grain(grain_name)?;

        let Some(instant) = parse_instant(iso)? else {
            tracing::debug!(body = %raw.body, value = %iso, "Dropping out-of-range time candidate");
            continue;
        };
        canonical_grain.get_or_insert(grain);
        values.push(EntityValue::Time(TimeValue::new(instant, grain)));
    }

    Ok(canonical_grain.map(|grain| (grain, values)))
}

fn interval_candidates(
    raw: &RawAnnotation,
    candidates: &[RawCandidate],
) -> Result<Option<Candidates>, StructuralError> {
    let mut values = Vec::with_capacity(candidates.len());
    let mut canonical_grain = None;

    'candidates: for candidate in candidates {
        if candidate.from.is_none() && candidate.to.is_none() {
            return Err(StructuralError::IntervalWithoutBounds {
                body: raw.body.clone(),
            });
        }

        let mut bounds = [None, None];
        for (slot, bound) in bounds.iter_mut().zip([&candidate.from, &candidate.to]) {
            if let Some(bound) = bound {
                match parse_bound(raw, bound)? {
                    Some(time) => *slot = Some(time),
                    None => {
                        tracing::debug!(body = %raw.body, value = %bound.value, "Dropping out-of-range interval candidate");
                        continue 'candidates;
                    }
                }
            }
        }

        let [from, to] = bounds;
        let interval = IntervalValue::new(from, to);
        if let Some(anchor) = interval.anchor() {
            canonical_grain.get_or_insert(anchor.grain);
        }
        values.push(EntityValue::Interval(interval));
    }

    Ok(canonical_grain.map(|grain| (grain, values)))
}

fn parse_bound(raw: &RawAnnotation, bound: &RawBound) -> Result<Option<TimeValue>, StructuralError> {
    let grain_name = bound.grain.as_deref().ok_or_else(|| missing(raw, "grain"))?;
    let grain = parse_grain(grain_name)?;
    Ok(parse_instant(&bound.value)?.map(|instant| TimeValue::new(instant, grain)))
}

fn parse_grain(name: &str) -> Result<Grain, StructuralError> {
    Grain::from_name(name).ok_or_else(|| StructuralError::InvalidGrain {
        grain: name.to_string(),
    })
}

fn missing(raw: &RawAnnotation, field: &str) -> StructuralError {
    StructuralError::MissingValue {
        dimension: raw.dim.clone(),
        field: field.to_string(),
    }
}

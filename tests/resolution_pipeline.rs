//! Integration tests for the resolution pipeline
//!
//! Tests verify:
//! 1. Duration casts in both directions against the reference time
//! 2. Datetime filtering of time entities, leaving other entities alone
//! 3. Consensus scoring and thresholds across alternatives
//! 4. Exclusion of out-of-range years
//! 5. Serialized entities keep the service's ISO instant and grain
//! 6. Contexts decoded from the wire field names drive casts and filters

use entity_engine::{
    Alternative, ContextError, EngineError, EntityEngine, EntityType, EntityValue, ResolveContext,
    StructuralError, TemporalDirection,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::HashMap;

// 2022-01-01T12:00:00+05:30
const REFERENCE_MS: i64 = 1_641_018_600_000;

// ============================================================================
// TEST FIXTURES - Records in the annotation service's wire shape
// ============================================================================

fn time_record(body: &str, start: usize, iso: &str, grain: &str) -> Value {
    json!({
        "body": body,
        "start": start,
        "end": start + body.chars().count(),
        "dim": "time",
        "latent": false,
        "value": {
            "values": [{"value": iso, "grain": grain, "type": "value"}],
            "value": iso,
            "grain": grain,
            "type": "value"
        }
    })
}

fn duration_record(body: &str, amount: u64, unit: &str, seconds: u64) -> Value {
    json!({
        "body": body,
        "start": 0,
        "end": body.chars().count(),
        "dim": "duration",
        "latent": false,
        "value": {
            "value": amount,
            "type": "value",
            "unit": unit,
            "normalized": {"value": seconds, "unit": "second"}
        }
    })
}

fn number_record(body: &str, start: usize, value: f64) -> Value {
    json!({
        "body": body,
        "start": start,
        "end": start + body.chars().count(),
        "dim": "number",
        "latent": false,
        "value": {"value": value, "type": "value"}
    })
}

fn kolkata() -> ResolveContext {
    ResolveContext {
        timezone: "Asia/Kolkata".to_string(),
        ..Default::default()
    }
    .with_reference_time(REFERENCE_MS)
}

fn canonical_iso(value: &EntityValue) -> String {
    match value {
        EntityValue::Time(time) => time.to_iso(),
        other => panic!("expected a time value, found {other:?}"),
    }
}

// ============================================================================
// CASTING
// ============================================================================

#[test]
fn test_duration_cast_follows_intent_direction() {
    let mut intents = HashMap::new();
    intents.insert("_cancel_".to_string(), TemporalDirection::Past);
    intents.insert("_any_".to_string(), TemporalDirection::Future);

    let ctx = ResolveContext {
        temporal_intents: intents,
        ..kolkata()
    };
    let records = || vec![Alternative::from(vec![duration_record("2 hours", 2, "hour", 7200)])];

    let past = EntityEngine::new()
        .resolve(records(), &ctx.clone().with_intent("_cancel_"))
        .unwrap();
    assert_eq!(past.len(), 1);
    assert_eq!(past[0].entity_type, EntityType::Datetime);
    assert_eq!(canonical_iso(&past[0].value), "2022-01-01T10:00:00.000+05:30");

    let future = EntityEngine::new()
        .resolve(records(), &ctx.with_intent("_book_"))
        .unwrap();
    assert_eq!(canonical_iso(&future[0].value), "2022-01-01T14:00:00.000+05:30");
    assert!(future[0].parsers.contains("cast"));
    assert!(future[0].parsers.contains("duckling"));
}

#[test]
fn test_duration_cast_beyond_max_year_is_excluded() {
    let mut intents = HashMap::new();
    intents.insert("_any_".to_string(), TemporalDirection::Future);
    let ctx = ResolveContext {
        temporal_intents: intents,
        ..kolkata()
    };

    let resolution = EntityEngine::new()
        .resolve_detailed(
            vec![vec![
                duration_record("in 10000 years", 10000, "year", 315_360_000_000),
                number_record("4", 20, 4.0),
            ]
            .into()],
            &ctx,
        )
        .unwrap();
    assert_eq!(resolution.entities.len(), 1);
    assert_eq!(resolution.entities[0].entity_type, EntityType::Number);
    assert!(resolution.rejected.is_empty());
}

#[test]
fn test_duration_without_direction_stays_duration() {
    let entities = EntityEngine::new()
        .resolve(
            vec![vec![duration_record("2 hours", 2, "hour", 7200)].into()],
            &kolkata(),
        )
        .unwrap();
    assert_eq!(entities[0].entity_type, EntityType::Duration);
}

#[test]
fn test_cast_without_reference_time_fails_call() {
    let mut intents = HashMap::new();
    intents.insert("_any_".to_string(), TemporalDirection::Future);
    let ctx = ResolveContext {
        temporal_intents: intents,
        ..Default::default()
    };

    let err = EntityEngine::new()
        .resolve(
            vec![vec![
                number_record("two", 0, 2.0),
                duration_record("2 hours", 2, "hour", 7200),
            ]
            .into()],
            &ctx,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Context(ContextError::MissingReferenceTime { .. })
    ));
}

// ============================================================================
// FILTERING
// ============================================================================

#[test]
fn test_future_filter_keeps_later_time_and_numbers() {
    let ctx = ResolveContext {
        datetime_filter: Some("future".to_string()),
        ..kolkata()
    };
    let entities = EntityEngine::new()
        .resolve(
            vec![vec![
                time_record("at 10 am", 0, "2022-01-01T10:00:00.000+05:30", "hour"),
                number_record("4", 12, 4.0),
                time_record("at 2 pm", 20, "2022-01-01T14:00:00.000+05:30", "hour"),
            ]
            .into()],
            &ctx,
        )
        .unwrap();

    let bodies: Vec<&str> = entities.iter().map(|e| e.body.as_str()).collect();
    assert_eq!(bodies, vec!["4", "at 2 pm"]);
}

#[test]
fn test_ge_filter_keeps_reference_instant() {
    let ctx = ResolveContext {
        datetime_filter: Some("ge".to_string()),
        ..kolkata()
    };
    let entities = EntityEngine::new()
        .resolve(
            vec![vec![time_record("at noon", 0, "2022-01-01T12:00:00.000+05:30", "hour")].into()],
            &ctx,
        )
        .unwrap();
    assert_eq!(entities.len(), 1);
}

#[test]
fn test_wire_context_drives_filter_and_cast() {
    let ctx = ResolveContext::from_json(&json!({
        "reference_time_ms": REFERENCE_MS,
        "timezone": "Asia/Kolkata",
        "detected_intent_name": "_cancel_",
        "temporal_intent_direction_map": {"_cancel_": "past"},
        "datetime_filter_mode": "future"
    }))
    .unwrap();

    let entities = EntityEngine::new()
        .resolve(
            vec![vec![
                time_record("at 10 am", 0, "2022-01-01T10:00:00.000+05:30", "hour"),
                time_record("at 2 pm", 12, "2022-01-01T14:00:00.000+05:30", "hour"),
            ]
            .into()],
            &ctx,
        )
        .unwrap();
    let bodies: Vec<&str> = entities.iter().map(|e| e.body.as_str()).collect();
    assert_eq!(bodies, vec!["at 2 pm"]);

    // Cast to the past, then dropped by the future filter
    let cast = EntityEngine::new()
        .resolve(vec![vec![duration_record("2 hours", 2, "hour", 7200)].into()], &ctx)
        .unwrap();
    assert!(cast.is_empty());
}

#[test]
fn test_mis_keyed_context_is_rejected() {
    let err = ResolveContext::from_json(&json!({
        "reference_time_ms": REFERENCE_MS,
        "datetime_filter_modes": "future"
    }))
    .unwrap_err();
    assert!(matches!(err, ContextError::MalformedContext { .. }));
}

#[test]
fn test_filter_with_ill_typed_reference_time_is_rejected() {
    let err = ResolveContext::from_json(&json!({
        "datetime_filter": "future",
        "reference_time_ms": "noon"
    }))
    .unwrap_err();
    assert!(matches!(err, ContextError::MalformedContext { .. }));
}

// ============================================================================
// AGGREGATION
// ============================================================================

fn three_of_four() -> Vec<Alternative> {
    vec![
        Alternative::new("table for 5", vec![number_record("5", 10, 5.0)]),
        Alternative::new("table for 5", vec![number_record("5", 10, 5.0)]),
        Alternative::new("table for", vec![]),
        Alternative::new("table for 5", vec![number_record("5", 10, 5.0)]),
    ]
}

#[test]
fn test_consensus_score_and_threshold() {
    let kept = EntityEngine::new()
        .resolve(three_of_four(), &ResolveContext::default())
        .unwrap();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].score, 0.75);
    assert_eq!(kept[0].alternative_indices, vec![0, 1, 3]);

    let strict = ResolveContext {
        score_threshold: 1.0,
        ..Default::default()
    };
    assert!(EntityEngine::new().resolve(three_of_four(), &strict).unwrap().is_empty());

    let lenient = ResolveContext {
        score_threshold: 0.5,
        ..Default::default()
    };
    assert_eq!(EntityEngine::new().resolve(three_of_four(), &lenient).unwrap().len(), 1);
}

#[test]
fn test_latent_survives_when_seen_non_latent_elsewhere() {
    let mut latent = number_record("5", 0, 5.0);
    latent["latent"] = json!(true);

    let entities = EntityEngine::new()
        .resolve(
            vec![vec![latent].into(), vec![number_record("5", 0, 5.0)].into()],
            &ResolveContext::default(),
        )
        .unwrap();
    assert_eq!(entities.len(), 1);
    assert!(!entities[0].latent);
    assert_eq!(entities[0].score, 1.0);
}

// ============================================================================
// STRUCTURAL EDGE CASES
// ============================================================================

#[test]
fn test_year_ten_thousand_is_excluded_silently() {
    let resolution = EntityEngine::new()
        .resolve_detailed(
            vec![vec![
                time_record("in 10000", 0, "10000-01-01T00:00:00.000+05:30", "year"),
                number_record("4", 10, 4.0),
            ]
            .into()],
            &kolkata(),
        )
        .unwrap();
    assert_eq!(resolution.entities.len(), 1);
    assert_eq!(resolution.entities[0].entity_type, EntityType::Number);
    assert!(resolution.rejected.is_empty());

    let alone = EntityEngine::new()
        .resolve(
            vec![vec![time_record("in 10000", 0, "10000-01-01T00:00:00.000+05:30", "year")].into()],
            &kolkata(),
        )
        .unwrap();
    assert!(alone.is_empty());
}

#[test]
fn test_interval_without_bounds_is_rejected() {
    let record = json!({
        "body": "between", "start": 0, "end": 7, "dim": "time", "latent": false,
        "value": {"type": "interval", "values": [{"type": "interval"}]}
    });
    let resolution = EntityEngine::new()
        .resolve_detailed(
            vec![vec![record, number_record("4", 10, 4.0)].into()],
            &kolkata(),
        )
        .unwrap();
    assert_eq!(resolution.entities.len(), 1);
    assert_eq!(
        resolution.rejected[0].error,
        StructuralError::IntervalWithoutBounds {
            body: "between".to_string()
        }
    );
}

#[test]
fn test_time_window_picks_daytime_candidate() {
    let record = json!({
        "body": "kal 12:00", "start": 0, "end": 9, "dim": "time", "latent": false,
        "value": {
            "values": [
                {"value": "2022-03-06T00:00:00.000+05:30", "grain": "minute", "type": "value"},
                {"value": "2022-03-06T12:00:00.000+05:30", "grain": "minute", "type": "value"}
            ],
            "value": "2022-03-06T00:00:00.000+05:30",
            "grain": "minute",
            "type": "value"
        }
    });
    let ctx = ResolveContext::from_json(&json!({
        "time_window": {"gte": {"hour": 7, "minute": 0}, "lte": {"hour": 21, "minute": 59}}
    }))
    .unwrap();

    let entities = EntityEngine::new()
        .resolve(vec![vec![record.clone()].into()], &ctx)
        .unwrap();
    assert_eq!(canonical_iso(&entities[0].value), "2022-03-06T12:00:00.000+05:30");
    assert_eq!(entities[0].values.len(), 2);

    let unconstrained = EntityEngine::new()
        .resolve(vec![vec![record].into()], &ResolveContext::default())
        .unwrap();
    assert_eq!(canonical_iso(&unconstrained[0].value), "2022-03-06T00:00:00.000+05:30");
}

#[test]
fn test_serialized_entity_keeps_iso_and_grain() {
    let entities = EntityEngine::new()
        .resolve(
            vec![vec![time_record(
                "tomorrow at 4 pm",
                0,
                "2022-01-02T16:00:00.000+05:30",
                "hour",
            )]
            .into()],
            &kolkata(),
        )
        .unwrap();

    let encoded = serde_json::to_value(&entities[0]).unwrap();
    assert_eq!(encoded["entity_type"], json!("time"));
    assert_eq!(encoded["dimension"], json!("time"));
    assert_eq!(encoded["value"]["value"], json!("2022-01-02T16:00:00.000+05:30"));
    assert_eq!(encoded["value"]["grain"], json!("hour"));
}

//! Entity Engine - Entity Resolution & Aggregation
//!
//! Turns raw, weakly-typed annotation records attached to spans of text
//! into typed entities, and merges the entities found in several competing
//! transcriptions of one utterance into a single scored list.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Annotation service (Duckling-compatible, external)             │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │  raw records, one list per alternative
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Entity Builder       raw record → Entity (per record)          │
//! │  Ambiguity Resolver   choose canonical candidate                │
//! │  Cross-Type Caster    duration/number → date/time               │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │  per-alternative entity lists
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Cross-Alternative Aggregator   dedupe + score by consensus     │
//! │  Datetime Filter                future | past | ge              │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//!                        final entity list
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use entity_engine::{ConfigLoader, DucklingClient, AnnotationRequest, EntityEngine};
//!
//! let config = ConfigLoader::from_env().load()?;
//! let client = DucklingClient::new(&config.annotation_url, Duration::from_millis(config.timeout_ms))?;
//! let ctx = config.context(Some(reference_ms), Some("_cancel_"));
//!
//! let request = AnnotationRequest::new(vec!["cancel my order from 2 hours ago".into()], &ctx);
//! let resolution = EntityEngine::new().extract(&client, &request, &ctx).await?;
//! ```

pub mod aggregate;
pub mod ambiguity;
pub mod annotation;
pub mod builder;
pub mod cast;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod filter;
pub mod temporal;

pub use entity_types::{
    CreditCardValue, CurrencyValue, DurationValue, Entity, EntityType, EntityValue, Grain,
    IntervalValue, KeywordValue, NumberValue, PeopleValue, Span, TimeValue, ISO_FORMAT,
};

pub use aggregate::Aggregator;
pub use ambiguity::{nearest_candidate, AmbiguityResolver, CanonicalPolicy, ClockTime, TimeWindow};
pub use annotation::{
    AnnotationClient, AnnotationRequest, DucklingClient, StaticClient, TextAnnotation,
};
pub use builder::{EntityBuilder, PARSER_TAG};
pub use cast::{Caster, TemporalDirection, TimeField, ANY_INTENT, CAST_TAG};
pub use config::{ConfigLoader, EngineConfig};
pub use context::ResolveContext;
pub use engine::{Alternative, EntityEngine, RejectedRecord, Resolution};
pub use error::{
    AnnotationError, ContextError, EngineError, ErrorClass, InputShapeError, Result,
    StructuralError,
};
pub use filter::{DatetimeFilter, FilterMode};

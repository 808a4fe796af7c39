//! Error handling for the entity engine
//!
//! Errors fall into four classes. Structural errors belong to a single raw
//! record; contextual and input-shape errors fail the whole call; upstream
//! errors come from the annotation service collaborator.

use thiserror::Error;

/// Main error type for the entity engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Structural error: {0}")]
    Structural(#[from] StructuralError),

    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    #[error("Input shape error: {0}")]
    InputShape(#[from] InputShapeError),

    #[error("Annotation error: {0}")]
    Annotation(#[from] AnnotationError),
}

/// Coarse classification of an [`EngineError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Structural,
    Contextual,
    InputShape,
    Upstream,
}

impl EngineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            EngineError::Structural(_) => ErrorClass::Structural,
            EngineError::Context(_) => ErrorClass::Contextual,
            EngineError::InputShape(_) => ErrorClass::InputShape,
            EngineError::Annotation(_) => ErrorClass::Upstream,
        }
    }
}

/// A raw annotation record that cannot become an entity
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructuralError {
    #[error("Malformed annotation record: {reason}")]
    MalformedRecord { reason: String },

    #[error("Annotation record has an empty body")]
    EmptyBody,

    #[error("Invalid span {start}..{end} for text of length {text_len}")]
    InvalidSpan {
        start: usize,
        end: usize,
        text_len: usize,
    },

    #[error("Dimension '{dimension}' was not requested")]
    DimensionNotRequested { dimension: String },

    #[error("Unsupported dimension '{dimension}'")]
    UnsupportedDimension { dimension: String },

    #[error("Missing required '{field}' for dimension '{dimension}'")]
    MissingValue { dimension: String, field: String },

    #[error("Interval '{body}' has neither a 'from' nor a 'to' bound")]
    IntervalWithoutBounds { body: String },

    #[error("Time entity '{body}' mixes interval and plain value candidates")]
    HybridInterval { body: String },

    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("Unknown grain '{grain}'")]
    InvalidGrain { grain: String },

    #[error("Invalid numeric value for '{dimension}': {reason}")]
    InvalidNumber { dimension: String, reason: String },
}

/// Request-level context that makes the whole call unresolvable
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContextError {
    #[error("Reference time (unix ms) is required to {operation}")]
    MissingReferenceTime { operation: String },

    #[error("Reference time {value} is not a representable unix ms timestamp")]
    InvalidReferenceTime { value: i64 },

    #[error("The timezone '{timezone}' is not a valid IANA timezone")]
    InvalidTimezone { timezone: String },

    #[error("Expected datetime filter to be one of future, past or ge, found '{mode}'")]
    InvalidFilterMode { mode: String },

    #[error("Expected temporal direction to be past or future, found '{direction}'")]
    InvalidDirection { direction: String },

    #[error("Expected numeric cast field to be one of hour, day or month, found '{field}'")]
    InvalidCastField { field: String },

    #[error("Invalid time window: {reason}")]
    InvalidTimeWindow { reason: String },

    #[error("Score threshold {threshold} is outside [0, 1]")]
    InvalidThreshold { threshold: f64 },

    #[error("Malformed resolve context: {reason}")]
    MalformedContext { reason: String },
}

/// Caller input rejected before any network call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputShapeError {
    #[error("Expected a string or a list of strings, found {found}")]
    NotText { found: String },

    #[error("Expected {expected} annotation lists, one per alternative, found {found}")]
    AlternativeCountMismatch { expected: usize, found: usize },
}

/// Failures of the annotation service collaborator
#[derive(Error, Debug)]
pub enum AnnotationError {
    #[error("Invalid annotation service url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Annotation service unreachable: {message}")]
    Transport { message: String },

    #[error("Annotation service call failed [{status}]: {body}")]
    Status { status: u16, body: String },

    #[error("Annotation service response could not be decoded: {message}")]
    Decode { message: String },
}

pub type Result<T> = std::result::Result<T, EngineError>;

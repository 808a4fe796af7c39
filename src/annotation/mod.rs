//! Annotation service seam
//!
//! The engine consumes raw records from an external annotation service.
//! [`AnnotationClient`] is the boundary; [`DucklingClient`] talks HTTP to a
//! Duckling-compatible server, [`StaticClient`] replays recorded payloads.

mod client;
mod request;

pub use client::{
    AnnotationClient, DucklingClient, StaticClient, TextAnnotation, DEFAULT_TIMEOUT_MS,
};
pub use request::AnnotationRequest;

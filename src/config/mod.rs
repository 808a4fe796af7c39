//! Engine configuration
//!
//! YAML-backed [`EngineConfig`] plus the [`ConfigLoader`] that finds it.

mod loader;
mod types;

pub use loader::{ConfigLoader, CONFIG_ENV_VAR, DEFAULT_CONFIG_PATH};
pub use types::{EngineConfig, DEFAULT_ANNOTATION_URL};

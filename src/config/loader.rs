//! Configuration loader
//!
//! Path resolution order:
//! 1. `ENTITY_ENGINE_CONFIG` (after loading `.env`)
//! 2. `config/entity_engine.yaml` relative to the working directory
//! 3. Built-in defaults

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::info;

use super::types::EngineConfig;

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "ENTITY_ENGINE_CONFIG";

/// Config file used when the environment names none
pub const DEFAULT_CONFIG_PATH: &str = "config/entity_engine.yaml";

pub struct ConfigLoader {
    path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Loader that always yields the built-in defaults
    pub fn defaults() -> Self {
        Self { path: None }
    }

    /// Resolve the config path from the environment
    pub fn from_env() -> Self {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!(error = %e, "No .env file loaded");
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::new(path);
        }

        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            return Self::new(DEFAULT_CONFIG_PATH);
        }

        Self::defaults()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Load and validate the configuration
    pub fn load(&self) -> Result<EngineConfig> {
        match &self.path {
            Some(path) => {
                info!(path = %path.display(), "Loading engine configuration");
                EngineConfig::from_file(path)
            }
            None => {
                info!("Using default engine configuration");
                Ok(EngineConfig::default())
            }
        }
    }
}

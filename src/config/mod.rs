//! Configuration for lovit
//!
//! Two layers live here:
//!
//! - [`LovitConfig`] - The in-process configuration of modules, tasks,
//!   handlers and entry functions handed to `configure`. It is validated
//!   as a whole before anything is wrapped.
//! - [`Settings`] - Static settings (HTTP transport, default status path,
//!   custom status codes) loaded from defaults, a TOML file and the
//!   environment.
//!
//! # Usage
//!
//! ```no_run
//! use lovit::config::Settings;
//!
//! let settings = Settings::load().expect("Failed to load settings");
//! println!("Default status path: {}", settings.status.path);
//! ```
//!
//! # Environment Variables
//!
//! Settings can be overridden using environment variables with the pattern:
//! `LOVIT__<section>__<key>`
//!
//! Examples:
//! - `LOVIT__HTTP__REQUEST_TIMEOUT_MS=5000`
//! - `LOVIT__STATUS__PATH=status.code`
//!
//! # Settings File
//!
//! By default, settings are loaded from `config/lovit.toml`.
//! This can be overridden using the `LOVIT_CONFIG` environment variable.

mod models;
mod settings;
mod sources;
mod validation;

pub use models::{GlobalConfig, LovitConfig, ModuleConfig, Profile, ProfileConfig, create_profile};
pub use settings::{HttpSettings, Settings, StatusSettings};
pub use validation::{ValidationError, validate, validate_fetch_config};

pub(crate) use validation::{register_global, register_profile};

use thiserror::Error;

/// An invalid configuration or fetch descriptor, reported before any call runs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing required {0}.")]
    Missing(String),

    #[error("Invalid type for {target}. Expected {expected}.")]
    InvalidType { target: String, expected: String },

    #[error("Invalid usage: {0}.")]
    InvalidUsage(String),

    #[error("Incorrect {0}.")]
    Incorrect(String),
}

impl ConfigError {
    pub(crate) fn missing(path: &str, config_name: &str) -> Self {
        ConfigError::Missing(format!("path: \"{path}\" in the {config_name}"))
    }

    pub(crate) fn invalid_type(path: &str, config_name: &str, expected: impl Into<String>) -> Self {
        ConfigError::InvalidType {
            target: format!("\"{path}\" in the {config_name}"),
            expected: expected.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to load settings: {0}")]
    LoadError(#[from] ::config::ConfigError),

    #[error("Settings validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Settings {
    /// Load settings from all sources (file + environment)
    ///
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`LOVIT__*`)
    /// 2. TOML file (default: `config/lovit.toml`)
    /// 3. Default values
    pub fn load() -> Result<Self, SettingsError> {
        let settings = sources::load()?;
        validation::validate_settings(&settings)?;
        Ok(settings)
    }

    /// Load settings from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, SettingsError> {
        let settings = sources::load_from_sources(path)?;
        validation::validate_settings(&settings)?;
        Ok(settings)
    }
}

//! Layered configuration and persona registry for the video generation
//! pipeline.
//!
//! Settings are assembled in three layers, lowest to highest priority:
//! `Settings::default()` baked into `Default` impls, an optional
//! `config/{default,<env>}.yaml` file, then `VIDEOGEN_`-prefixed environment
//! variables.

pub mod persona;
pub mod settings;

pub use persona::{PersonaEntry, PersonaRegistry, PersonaRegistryError};
pub use settings::{
    load_settings, ModelConfig, OutputConfig, RuntimeEnvironment, ServerConfig, Settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

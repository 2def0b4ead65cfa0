//! Layered application settings.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Selects plain vs JSON log output in the server binary's `init_tracing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// HTTP front-end bind address and CORS/timeout knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub cors_allow_any_origin: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout_secs(),
            cors_allow_any_origin: false,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout_secs() -> u64 {
    300
}

/// Model identifiers/endpoints consumed by `videogen-llm` and
/// `videogen-pipeline`'s adapters. API keys are read from the environment
/// only (never written to a config file on disk), per the external
/// interface's config surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    #[serde(default = "default_llm_endpoint")]
    pub llm_endpoint: String,
    #[serde(default)]
    pub llm_api_key: String,

    #[serde(default = "default_tts_sample_rate")]
    pub tts_native_sample_rate: u32,
    #[serde(default = "default_tts_endpoint")]
    pub tts_endpoint: String,
    #[serde(default = "default_tts_model")]
    pub tts_model: String,

    #[serde(default = "default_coeff_endpoint")]
    pub coeff_endpoint: String,
    #[serde(default = "default_coeff_model")]
    pub coeff_model: String,

    #[serde(default = "default_render_endpoint")]
    pub render_endpoint: String,
    #[serde(default = "default_render_model")]
    pub render_model: String,

    #[serde(default = "default_asset_dir")]
    pub asset_dir: String,

    #[serde(default = "default_fps")]
    pub default_fps: u32,
    #[serde(default = "default_resolution")]
    pub default_resolution: u32,
    #[serde(default = "default_style_preset")]
    pub default_style_preset: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            llm_model: default_llm_model(),
            llm_endpoint: default_llm_endpoint(),
            llm_api_key: String::new(),
            tts_native_sample_rate: default_tts_sample_rate(),
            tts_endpoint: default_tts_endpoint(),
            tts_model: default_tts_model(),
            coeff_endpoint: default_coeff_endpoint(),
            coeff_model: default_coeff_model(),
            render_endpoint: default_render_endpoint(),
            render_model: default_render_model(),
            asset_dir: default_asset_dir(),
            default_fps: default_fps(),
            default_resolution: default_resolution(),
            default_style_preset: default_style_preset(),
        }
    }
}

fn default_tts_endpoint() -> String {
    "http://localhost:9100".to_string()
}
fn default_tts_model() -> String {
    "xtts-like".to_string()
}
fn default_coeff_endpoint() -> String {
    "http://localhost:9000".to_string()
}
fn default_coeff_model() -> String {
    "sadtalker-like".to_string()
}
fn default_render_endpoint() -> String {
    "http://localhost:9001".to_string()
}
fn default_render_model() -> String {
    "render-backend".to_string()
}

fn default_llm_model() -> String {
    "claude-script-writer".to_string()
}
fn default_llm_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}
fn default_tts_sample_rate() -> u32 {
    24_000
}
fn default_asset_dir() -> String {
    "assets".to_string()
}
fn default_fps() -> u32 {
    25
}
fn default_resolution() -> u32 {
    256
}
fn default_style_preset() -> String {
    "calm_tech".to_string()
}

/// Where generated artifacts are written, per the persisted state layout
/// (`outputs/<request_id>/{script.json,timing.json,audio.wav,video.mp4}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default)]
    pub retain_on_error: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            retain_on_error: true,
        }
    }
}

fn default_output_dir() -> String {
    "outputs".to_string()
}

/// Top-level settings assembled from defaults, an optional YAML file, and
/// `VIDEOGEN_`-prefixed environment variables.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub models: ModelConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// Path to the persona registry YAML (reference audio/image paths, LLM
    /// style hints, default style profile per persona).
    #[serde(default = "default_persona_registry_path")]
    pub persona_registry_path: String,
}

fn default_persona_registry_path() -> String {
    "config/personas.yaml".to_string()
}

impl Settings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.models.default_fps == 0 {
            return Err(ConfigError::InvalidValue {
                field: "models.default_fps".to_string(),
                message: "must be > 0".to_string(),
            });
        }
        if self.models.default_resolution == 0 {
            return Err(ConfigError::InvalidValue {
                field: "models.default_resolution".to_string(),
                message: "must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Load settings with a three-layer precedence: defaults,
/// `config/{default,<env>}.yaml`, then `VIDEOGEN_` environment variables
/// (double underscore as the nesting separator, e.g.
/// `VIDEOGEN_MODELS__LLM_API_KEY`).
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("VIDEOGEN")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;
    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        let settings = Settings::default();
        assert_eq!(settings.models.default_fps, 25);
        assert_eq!(settings.server.port, 8080);
    }

    #[test]
    fn rejects_zero_fps() {
        let mut settings = Settings::default();
        settings.models.default_fps = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn env_override_wins_over_default() {
        std::env::set_var("VIDEOGEN_MODELS__DEFAULT_FPS", "30");
        let settings = load_settings(None).unwrap();
        assert_eq!(settings.models.default_fps, 30);
        std::env::remove_var("VIDEOGEN_MODELS__DEFAULT_FPS");
    }
}

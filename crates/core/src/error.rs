//! Pipeline-wide error kinds.
//!
//! Each variant corresponds to one of the error *kinds* named in the
//! pipeline's error handling design, not to a specific crate's internal
//! failure type. Crate-local errors (`LlmError`, `TtsError`, `AnimError`,
//! `StyleError`) convert into this enum at the orchestrator boundary via
//! `From`, the same way each crate's own top-level error bridges its internal
//! failure types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Missing prompt, unknown persona, missing reference asset.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// LLM/TTS/animation call failed after retries.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Style extraction could not gather enough valid samples.
    #[error("insufficient reference data: {0}")]
    InsufficientReferenceData(String),

    /// Persisting or reading an artifact on disk failed.
    #[error("artifact I/O error: {0}")]
    Artifact(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Cancellation token fired at a stage boundary.
    #[error("request cancelled")]
    Cancelled,
}

impl PipelineError {
    /// The stable error kind string returned to callers, per the external
    /// interface contract (`{error_kind, message, request_id}`).
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidInput(_) => "InvalidInput",
            PipelineError::UpstreamUnavailable(_) => "UpstreamUnavailable",
            PipelineError::InsufficientReferenceData(_) => "InsufficientReferenceData",
            PipelineError::Artifact(_) => "Artifact",
            PipelineError::Io(_) => "Io",
            PipelineError::Serde(_) => "Serde",
            PipelineError::Cancelled => "Cancelled",
        }
    }
}

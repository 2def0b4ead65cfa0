//! LLM client error kinds. Bridges into `videogen_core::PipelineError` at
//! the orchestrator boundary via `From`, a common pattern for crate-local error boundaries
//! to bridge its own `LlmError` into the top-level application error.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM backend is not configured: {0}")]
    Configuration(String),

    #[error("network error contacting LLM provider: {0}")]
    Network(String),

    #[error("LLM provider returned an error: {0}")]
    Api(String),

    #[error("invalid response from LLM provider: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Network(err.to_string())
    }
}

impl From<LlmError> for videogen_core::PipelineError {
    fn from(err: LlmError) -> Self {
        videogen_core::PipelineError::UpstreamUnavailable(err.to_string())
    }
}

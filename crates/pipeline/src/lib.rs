//! Segmented synthesis (C3), animation adapters (C4/C6), the motion
//! governor (C5), the model registry (A3), and the pipeline orchestrator
//! (C8) that sequences them.

pub mod anim;
pub mod governor;
pub mod orchestrator;
pub mod registry;
pub mod synth;
pub mod tts_http;

pub use anim::{FfmpegRenderModel, HttpCoefficientModel};
pub use governor::{govern, govern_with_report, GovernorReport};
pub use orchestrator::{
    GenerateMetadata, GenerateOptions, GenerateResult, GenerationError, PipelineOrchestrator,
};
pub use registry::{ModelHandle, ModelRegistry};
pub use synth::{shape_text_for_emphasis, synthesize_with_intent, TtsSamplingParams};
pub use tts_http::HttpTtsModel;

/// Re-exported so callers can build a live `GenerateOptions::cancellation`
/// without depending on `tokio-util` directly.
pub use tokio_util::sync::CancellationToken;

//! Trait seams for every external collaborator: the LLM
//! provider, the TTS acoustic model, the face-animation model's two stages,
//! and a reference-video frame source used by style extraction. Each is a
//! thin, `Send + Sync + 'static` async interface so the pipeline crate can
//! depend on behaviour without depending on any concrete backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::coeff::CoefficientBundle;

/// A mono PCM waveform at a fixed sample rate. The synthesizer never
/// resamples; downstream stages receive whatever rate the TTS model
/// produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    pub fn silence(duration_secs: f32, sample_rate: u32) -> Self {
        let n = (duration_secs * sample_rate as f32).round() as usize;
        Self {
            samples: vec![0.0; n],
            sample_rate,
        }
    }

    pub fn append(&mut self, mut other: Waveform) {
        assert_eq!(
            self.sample_rate, other.sample_rate,
            "cannot concatenate waveforms at different sample rates without resampling"
        );
        self.samples.append(&mut other.samples);
    }
}

/// A single request to the LLM client's structured-intent generation.
#[derive(Debug, Clone)]
pub struct ScriptRequest {
    pub prompt: String,
    /// Persona-specific style instructions prepended to the user prompt.
    pub style_hint: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Whether this call should ask the backend for strict JSON mode, if the
    /// backend supports it. Backends that don't support it ignore the flag
    /// and the caller falls through to the permissive retry.
    pub force_json: bool,
}

/// Raw, unvalidated completion text from an LLM backend, before the robust
/// JSON extractor runs over it.
#[derive(Debug, Clone)]
pub struct RawCompletion {
    pub text: String,
    pub used_json_mode: bool,
}

/// The LLM provider interface (C2's external collaborator). Implementations
/// talk to a specific provider's HTTP API; `videogen-llm::ScriptClient` owns
/// the retry/fallback cascade on top of this trait.
#[async_trait]
pub trait ScriptModel: Send + Sync + 'static {
    async fn complete(&self, request: &ScriptRequest) -> Result<RawCompletion, crate::error::PipelineError>;

    fn model_name(&self) -> &str;
}

/// The TTS acoustic model interface (C3's external collaborator).
#[async_trait]
pub trait TtsModel: Send + Sync + 'static {
    async fn synthesize(
        &self,
        text: &str,
        reference_audio: &str,
        language: &str,
    ) -> Result<Waveform, crate::error::PipelineError>;

    fn native_sample_rate(&self) -> u32;

    fn model_name(&self) -> &str;
}

/// The face-animation model's audio-to-motion stage (C4's external
/// collaborator). Pure adapter: returns the raw, possibly-stochastic
/// proposal and does not attempt to seed the model.
#[async_trait]
pub trait CoefficientModel: Send + Sync + 'static {
    async fn generate_coeffs(
        &self,
        audio_path: &str,
        reference_image: &str,
    ) -> Result<CoefficientBundle, crate::error::PipelineError>;

    fn model_name(&self) -> &str;
}

/// Render options accepted by the face-animation model's render stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    pub enhance: bool,
    pub fps: u32,
    pub resolution: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            enhance: false,
            fps: 25,
            resolution: 256,
        }
    }
}

/// The face-animation model's render stage (C6's external collaborator).
/// Receives the *governed* bundle; must not mutate coefficients itself.
#[async_trait]
pub trait RenderModel: Send + Sync + 'static {
    async fn render(
        &self,
        bundle: &CoefficientBundle,
        reference_image: &str,
        audio_path: &str,
        output_path: &str,
        options: RenderOptions,
    ) -> Result<String, crate::error::PipelineError>;

    fn model_name(&self) -> &str;
}

/// A single frame sampled from a reference video, decoded to RGB8.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
    pub frame_index: u64,
    pub timestamp_secs: f64,
}

/// Source of decoded frames from an arbitrary video container, used only by
/// the reference-style extractor. Frame dimensions and pixel data are the
/// only information the extractor reads from the container.
pub trait VideoFrameSource: Send + Sync {
    /// Sample the next frame at least `stride` frames after the last one
    /// returned (3-5 per the extraction algorithm). Returns `None` at
    /// end-of-stream.
    fn next_sampled_frame(&mut self, stride: u32) -> Option<VideoFrame>;

    fn duration_secs(&self) -> f64;
}

/// A single `(yaw, pitch, roll)` pose measurement derived from one sampled
/// frame, in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandmarkSample {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

/// Strategy for deriving a pose measurement from a single video frame. Two
/// variants exist (dense landmarks, bounding-box tracking); callers pin one
/// at construction for deterministic test runs rather than relying on
/// runtime auto-detection.
pub trait LandmarkBackend: Send + Sync {
    /// Attempt to measure `(yaw, pitch, roll)` from one frame. `roll` is
    /// `0.0` for backends that cannot estimate it (bounding-box tracking).
    /// Returns `None` when detection fails on this frame.
    fn measure(&self, frame: &VideoFrame) -> Option<LandmarkSample>;

    fn name(&self) -> &str;
}

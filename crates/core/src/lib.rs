//! Core data model and trait contracts for the intent-aware video generation
//! pipeline.
//!
//! This crate has no business logic of its own: it defines the typed
//! contract (`ScriptIntent`, `IntentTimingMap`, `IntentMask`, `StyleProfile`,
//! `CoefficientBundle`) that flows between stages, the trait seams each
//! external collaborator (LLM, TTS, face-animation model, reference-video
//! decoder) is consumed through, and the error kinds named in the pipeline's
//! error handling design.

pub mod coeff;
pub mod error;
pub mod intent;
pub mod persona;
pub mod style;
pub mod timing;
pub mod traits;

pub use coeff::{CoefficientBundle, FormatDescriptor, PoseAxis};
pub use error::{PipelineError, Result};
pub use intent::{IntentConstructionError, ScriptIntent, SegmentIntent};
pub use persona::Persona;
pub use style::StyleProfile;
pub use timing::{IntentMask, IntentTimingMap, TimingMapError, TimingSegment};
pub use traits::{
    CoefficientModel, LandmarkBackend, LandmarkSample, RawCompletion, RenderModel, RenderOptions,
    ScriptModel, ScriptRequest, TtsModel, VideoFrame, VideoFrameSource, Waveform,
};

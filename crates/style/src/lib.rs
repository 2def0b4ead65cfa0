//! Reference-style extraction (C7): derives a `StyleProfile` from an
//! existing video's observed pose variation.

pub mod extractor;
pub mod ffmpeg_source;
pub mod landmark;

pub use extractor::ReferenceStyleExtractor;
pub use ffmpeg_source::FfmpegFrameSource;
pub use landmark::{BoundingBoxTracking, DenseLandmarks};

//! Reference-style extraction (C7): derives a `StyleProfile` from an
//! existing video by sampling frames, measuring per-frame pose, and
//! aggregating statistics across sampled frames.

use videogen_core::{LandmarkBackend, PipelineError, StyleProfile, VideoFrameSource};

use crate::landmark::{BoundingBoxTracking, DenseLandmarks};

/// Minimum valid samples required before a profile can be derived.
const MIN_VALID_FRAMES: usize = 10;

/// Frame stride between samples (one every 3-5 frames).
const SAMPLE_STRIDE: u32 = 4;

pub struct ReferenceStyleExtractor {
    primary: Box<dyn LandmarkBackend>,
    fallback: Option<Box<dyn LandmarkBackend>>,
}

impl Default for ReferenceStyleExtractor {
    fn default() -> Self {
        Self {
            primary: Box::new(DenseLandmarks),
            fallback: Some(Box::new(BoundingBoxTracking)),
        }
    }
}

impl ReferenceStyleExtractor {
    /// Pin a single backend for deterministic test runs, per REDESIGN
    /// FLAGS — no per-frame fallback is attempted.
    pub fn with_backend(backend: Box<dyn LandmarkBackend>) -> Self {
        Self {
            primary: backend,
            fallback: None,
        }
    }

    pub fn build_style_from_reference(
        &self,
        mut source: impl VideoFrameSource,
        name: impl Into<String>,
    ) -> Result<StyleProfile, PipelineError> {
        let duration = source.duration_secs();

        let mut yaws = Vec::new();
        let mut pitches = Vec::new();
        let mut rolls = Vec::new();

        while let Some(frame) = source.next_sampled_frame(SAMPLE_STRIDE) {
            let sample = self.primary.measure(&frame).or_else(|| {
                self.fallback.as_ref().and_then(|b| b.measure(&frame))
            });
            if let Some(sample) = sample {
                yaws.push(sample.yaw);
                pitches.push(sample.pitch);
                rolls.push(sample.roll);
            }
        }

        if yaws.len() < MIN_VALID_FRAMES {
            return Err(PipelineError::InsufficientReferenceData(format!(
                "only {} of the required {} frames yielded a valid pose measurement",
                yaws.len(),
                MIN_VALID_FRAMES
            )));
        }

        let yaw_std = std_dev(&yaws);
        let pitch_std = std_dev(&pitches);
        let roll_std = std_dev(&rolls);

        let pose_max = [
            percentile_abs(&yaws, 95.0),
            percentile_abs(&pitches, 95.0),
            percentile_abs(&rolls, 95.0),
        ];
        let pose_scale = [
            (yaw_std / 0.3 * 0.8).clamp(0.3, 1.0),
            (pitch_std / 0.2 * 0.7).clamp(0.3, 1.0),
            (roll_std / 0.15 * 0.6).clamp(0.3, 1.0),
        ];

        let e = yaw_std + pitch_std + roll_std;
        let (smoothing, stillness_on_pause, expr_strength) = if e < 0.3 {
            (0.85, 0.90, 0.6)
        } else if e < 0.6 {
            (0.70, 0.75, 0.8)
        } else {
            (0.60, 0.60, 1.0)
        };

        let nod_rate = if duration > 0.0 {
            sign_changes(&pitches) as f32 / duration as f32
        } else {
            0.0
        };
        let nod_amplitude = pitch_std * 0.5;

        Ok(StyleProfile {
            name: name.into(),
            pose_max,
            pose_scale,
            expr_strength,
            smoothing,
            stillness_on_pause,
            stillness_expr_on_pause: stillness_on_pause,
            nod_rate,
            nod_amplitude,
        })
    }
}

fn std_dev(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    variance.sqrt() as f32
}

/// `P{p}(|values|)`: the p-th percentile of the absolute values, using
/// nearest-rank interpolation over the sorted magnitudes.
fn percentile_abs(values: &[f32], p: f64) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut abs: Vec<f32> = values.iter().map(|v| v.abs()).collect();
    abs.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let rank = ((p / 100.0) * (abs.len() - 1) as f64).round() as usize;
    abs[rank.min(abs.len() - 1)]
}

fn sign_changes(series: &[f32]) -> usize {
    let mut count = 0;
    let mut last_sign: Option<bool> = None;
    for &v in series {
        if v == 0.0 {
            continue;
        }
        let sign = v > 0.0;
        if let Some(prev) = last_sign {
            if prev != sign {
                count += 1;
            }
        }
        last_sign = Some(sign);
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use videogen_core::{LandmarkSample, VideoFrame};

    struct FixedSource {
        samples: Vec<(f32, f32, f32)>,
        idx: usize,
        duration: f64,
    }

    impl VideoFrameSource for FixedSource {
        fn next_sampled_frame(&mut self, _stride: u32) -> Option<VideoFrame> {
            if self.idx >= self.samples.len() {
                return None;
            }
            self.idx += 1;
            Some(VideoFrame {
                width: 1,
                height: 1,
                rgb: vec![self.idx as u8; 3],
                frame_index: self.idx as u64,
                timestamp_secs: 0.0,
            })
        }

        fn duration_secs(&self) -> f64 {
            self.duration
        }
    }

    struct FixedBackend(std::cell::RefCell<usize>, Vec<(f32, f32, f32)>);

    impl LandmarkBackend for FixedBackend {
        fn measure(&self, _frame: &VideoFrame) -> Option<LandmarkSample> {
            let mut i = self.0.borrow_mut();
            let sample = self.1.get(*i).copied();
            *i += 1;
            sample.map(|(yaw, pitch, roll)| LandmarkSample { yaw, pitch, roll })
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn rejects_fewer_than_ten_valid_frames() {
        let samples = vec![(0.05, 0.02, 0.0); 5];
        let source = FixedSource {
            samples: samples.clone(),
            idx: 0,
            duration: 10.0,
        };
        let extractor = ReferenceStyleExtractor::with_backend(Box::new(FixedBackend(
            std::cell::RefCell::new(0),
            samples,
        )));
        let err = extractor
            .build_style_from_reference(source, "test")
            .unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientReferenceData(_)));
    }

    #[test]
    fn low_variance_reference_yields_calm_bucket() {
        // yaw std ~0.08, pitch std ~0.05, roll std ~0.02 => E ~0.15 < 0.3
        let mut samples = Vec::new();
        for i in 0..20 {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            samples.push((0.08 * sign, 0.05 * sign, 0.02 * sign));
        }
        let source = FixedSource {
            samples: samples.clone(),
            idx: 0,
            duration: 10.0,
        };
        let extractor = ReferenceStyleExtractor::with_backend(Box::new(FixedBackend(
            std::cell::RefCell::new(0),
            samples,
        )));
        let profile = extractor
            .build_style_from_reference(source, "calm_ref")
            .unwrap();
        assert_eq!(profile.smoothing, 0.85);
        assert_eq!(profile.stillness_on_pause, 0.90);
        assert_eq!(profile.expr_strength, 0.6);
    }

    #[test]
    fn percentile_and_sign_change_helpers_behave() {
        assert_eq!(sign_changes(&[1.0, -1.0, 1.0, 1.0, -1.0]), 3);
        assert_eq!(percentile_abs(&[0.1, -0.2, 0.3], 100.0), 0.3);
    }
}

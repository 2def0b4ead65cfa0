//! Motion Governor (C5) — the algorithmic core. A pure function of its
//! inputs: clamp, intent-gate, style-scale, smooth, nod. No global
//! state; on any internal anomaly it returns the input bundle unchanged and
//! logs a single warning (`GovernorNoOp`), per the propagation policy that
//! C5 never fails.

mod audio_mask;

use hound::WavReader;
use videogen_core::{CoefficientBundle, IntentTimingMap, ScriptIntent, StyleProfile};

use audio_mask::audio_mask;

/// Safety envelope for expression channels, independent of any style
/// preset: a global clip applied before intent-gating in explicit mode.
const EXPRESSION_SAFETY_ENVELOPE: f32 = 3.0;

/// Operational telemetry alongside the governed bundle, for debug-build
/// visibility only (mirrors `GenerationResult` carrying
/// secondary fields like `tokens_per_second` next to the primary payload).
/// Never affects the returned `CoefficientBundle`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GovernorReport {
    pub pause_override_frames: usize,
    pub nods_accepted: usize,
    pub nods_rate_limited: usize,
    pub no_op: bool,
}

/// Never panics, never returns `Err`: any internal anomaly
/// (shape mismatch, unreadable audio, NaN input) short-circuits to the
/// input bundle unchanged, with a single `tracing::warn!`.
pub fn govern(
    bundle: CoefficientBundle,
    audio_path: &str,
    timing_map: &IntentTimingMap,
    script: &ScriptIntent,
    style: &StyleProfile,
) -> CoefficientBundle {
    govern_with_report(bundle, audio_path, timing_map, script, style).0
}

pub fn govern_with_report(
    bundle: CoefficientBundle,
    audio_path: &str,
    timing_map: &IntentTimingMap,
    script: &ScriptIntent,
    style: &StyleProfile,
) -> (CoefficientBundle, GovernorReport) {
    if !bundle.is_finite() {
        tracing::warn!(kind = "GovernorNoOp", reason = "non-finite input", "governor no-op");
        return (
            bundle,
            GovernorReport {
                no_op: true,
                ..Default::default()
            },
        );
    }

    if bundle.frame_count() != timing_map.frame_count() {
        tracing::warn!(
            kind = "GovernorNoOp",
            reason = "shape mismatch",
            bundle_frames = bundle.frame_count(),
            timing_frames = timing_map.frame_count(),
            "governor no-op"
        );
        return (
            bundle,
            GovernorReport {
                no_op: true,
                ..Default::default()
            },
        );
    }

    let (samples, sample_rate) = match load_wav_mono(audio_path) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(kind = "GovernorNoOp", reason = %e, "governor no-op: unreadable audio");
            return (
                bundle,
                GovernorReport {
                    no_op: true,
                    ..Default::default()
                },
            );
        }
    };

    let frame_count = bundle.frame_count();
    let a = audio_mask(&samples, sample_rate, timing_map.fps(), frame_count);
    let s = timing_map.build_mask_with_script(script);
    if s.len() != frame_count {
        tracing::warn!(kind = "GovernorNoOp", reason = "mask length mismatch", "governor no-op");
        return (
            bundle,
            GovernorReport {
                no_op: true,
                ..Default::default()
            },
        );
    }

    let fused: Vec<f32> = (0..frame_count)
        .map(|t| (a[t] * s.get(t).unwrap_or(0.0)).clamp(0.0, 1.3))
        .collect();

    let original = bundle.clone();

    let (governed, report) = match bundle {
        CoefficientBundle::Compact { mut data, format } => {
            for (t, mut row) in data.rows_mut().into_iter().enumerate() {
                let scalar = 0.7 + 0.25 * fused[t].clamp(0.0, 1.0);
                row.iter_mut().for_each(|v| *v *= scalar);
            }
            (
                CoefficientBundle::Compact { data, format },
                GovernorReport::default(),
            )
        }
        CoefficientBundle::Explicit {
            mut data,
            exp_range,
            pose_channels,
            lip_channels,
            identity_channels,
            format,
        } => {
            let mut report = GovernorReport::default();

            // Step 1: clamp.
            for k in 0..3 {
                let col = pose_channels[k];
                let max = style.pose_max[k];
                for t in 0..frame_count {
                    data[[t, col]] = data[[t, col]].clamp(-max, max);
                }
            }
            for col in exp_range.clone() {
                if lip_channels.contains(&col) || identity_channels.contains(&col) {
                    continue;
                }
                for t in 0..frame_count {
                    data[[t, col]] =
                        data[[t, col]].clamp(-EXPRESSION_SAFETY_ENVELOPE, EXPRESSION_SAFETY_ENVELOPE);
                }
            }

            // Step 3: intent gate.
            for k in 0..3 {
                let col = pose_channels[k];
                for t in 0..frame_count {
                    data[[t, col]] *= fused[t];
                }
            }
            for col in exp_range.clone() {
                if lip_channels.contains(&col) || identity_channels.contains(&col) {
                    continue;
                }
                for t in 0..frame_count {
                    data[[t, col]] *= fused[t];
                }
            }

            // Step 4: style scale.
            for k in 0..3 {
                let col = pose_channels[k];
                for t in 0..frame_count {
                    data[[t, col]] *= style.pose_scale[k];
                }
            }
            for col in exp_range.clone() {
                if lip_channels.contains(&col) || identity_channels.contains(&col) {
                    continue;
                }
                for t in 0..frame_count {
                    data[[t, col]] *= style.expr_strength;
                }
            }

            // Step 5: temporal smoothing (IIR), pose + expression only.
            let alpha = 1.0 - style.smoothing;
            let mut governed_channels: Vec<usize> = pose_channels.to_vec();
            governed_channels.extend(
                exp_range
                    .clone()
                    .filter(|c| !lip_channels.contains(c) && !identity_channels.contains(c)),
            );
            for &col in &governed_channels {
                let mut y_prev = data[[0, col]];
                for t in 0..frame_count {
                    let x = data[[t, col]];
                    let y = if t == 0 { x } else { alpha * x + (1.0 - alpha) * y_prev };
                    data[[t, col]] = y;
                    y_prev = y;
                }
            }

            // Step 6: pause-frame override.
            for t in 0..frame_count {
                let is_pause_frame = a[t] <= 0.05 + f32::EPSILON && s.get(t).unwrap_or(1.0) == 0.0;
                if is_pause_frame {
                    report.pause_override_frames += 1;
                    for k in 0..3 {
                        let col = pose_channels[k];
                        data[[t, col]] *= 1.0 - style.stillness_on_pause;
                    }
                    for col in exp_range.clone() {
                        if lip_channels.contains(&col) || identity_channels.contains(&col) {
                            continue;
                        }
                        data[[t, col]] *= 1.0 - style.stillness_expr_on_pause;
                    }
                }
            }

            // Step 7: sentence-end nod, globally rate-limited.
            if style.nod_rate > 0.0 {
                let pitch_col = pose_channels[1];
                let min_gap = 1.0 / style.nod_rate;
                let mut last_accepted: Option<f32> = None;
                let mut segments: Vec<_> = timing_map.segments().iter().collect();
                segments.sort_by(|a, b| a.end_time.partial_cmp(&b.end_time).unwrap());
                for seg in segments {
                    if !seg.sentence_end {
                        continue;
                    }
                    let accept = match last_accepted {
                        None => true,
                        Some(prev) => seg.end_time - prev >= min_gap,
                    };
                    if !accept {
                        report.nods_rate_limited += 1;
                        continue;
                    }
                    let frame_idx = (seg.end_time * timing_map.fps() as f32).round() as usize;
                    if frame_idx < frame_count {
                        data[[frame_idx, pitch_col]] += style.nod_amplitude;
                        report.nods_accepted += 1;
                        last_accepted = Some(seg.end_time);
                    }
                }
            }

            // Final clamp: the intent gate (step 3), style scale (step 4) and
            // nod addition (step 7) can each push a pose channel back past
            // `pose_max`, so the invariant is only guaranteed by re-clamping
            // here rather than at step 1.
            for k in 0..3 {
                let col = pose_channels[k];
                let max = style.pose_max[k];
                for t in 0..frame_count {
                    data[[t, col]] = data[[t, col]].clamp(-max, max);
                }
            }

            (
                CoefficientBundle::Explicit {
                    data,
                    exp_range,
                    pose_channels,
                    lip_channels,
                    identity_channels,
                    format,
                },
                report,
            )
        }
    };

    if !governed.is_finite() {
        tracing::warn!(kind = "GovernorNoOp", reason = "non-finite output", "governor no-op");
        return (
            original,
            GovernorReport {
                no_op: true,
                ..Default::default()
            },
        );
    }

    (governed, report)
}

fn load_wav_mono(path: &str) -> Result<(Vec<f32>, u32), String> {
    let mut reader = WavReader::open(path).map_err(|e| e.to_string())?;
    let spec = reader.spec();
    let samples: Result<Vec<f32>, _> = match spec.sample_format {
        hound::SampleFormat::Int => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / i16::MAX as f32))
            .collect(),
        hound::SampleFormat::Float => reader.samples::<f32>().collect(),
    };
    let samples = samples.map_err(|e| e.to_string())?;
    Ok((samples, spec.sample_rate))
}

//! Short-time RMS-energy audio mask (`a[t]`).

/// Percentile of a slice of `f64`s using nearest-rank interpolation over the
/// sorted values. `p` in `[0, 100]`.
fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let rank = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

/// Computes `a[t]` for `t in 0..frame_count`: `0.05` where short-time RMS
/// energy falls below `max(1e-4, 1.5 * P20(rms))`, `1.0` otherwise. `hop =
/// sample_rate / fps`. Frames beyond the waveform's length are treated as
/// silence.
pub fn audio_mask(samples: &[f32], sample_rate: u32, fps: u32, frame_count: usize) -> Vec<f32> {
    let hop = (sample_rate as f64 / fps.max(1) as f64).max(1.0) as usize;

    let mut rms = vec![0.0f64; frame_count];
    for t in 0..frame_count {
        let start = t * hop;
        let end = (start + hop).min(samples.len());
        if start >= samples.len() {
            rms[t] = 0.0;
            continue;
        }
        let window = &samples[start..end];
        if window.is_empty() {
            rms[t] = 0.0;
            continue;
        }
        let sum_sq: f64 = window.iter().map(|&s| (s as f64) * (s as f64)).sum();
        rms[t] = (sum_sq / window.len() as f64).sqrt();
    }

    let p20 = percentile(&rms, 20.0);
    let threshold = (1.5 * p20).max(1e-4);

    rms.into_iter()
        .map(|v| if v < threshold { 0.05 } else { 1.0 })
        .collect()
}

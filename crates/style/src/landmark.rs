//! Two `LandmarkBackend` strategy variants: dense
//! landmark geometry vs. bounding-box centroid tracking. Both derive a
//! `(yaw, pitch, roll)` estimate from luma moments of the sampled frame
//! rather than linking a full face-detection model, which belongs to the
//! external-collaborator surface this crate adapts over, not to the pose
//! math itself. Callers pin one variant at construction so tests are
//! deterministic.

use videogen_core::{LandmarkBackend, LandmarkSample, VideoFrame};

/// Below this luma variance a frame is treated as too flat/uniform to carry
/// a reliable pose signal (e.g. a black frame, an out-of-focus blur).
const MIN_LUMA_VARIANCE: f64 = 4.0;

fn luma(frame: &VideoFrame, x: u32, y: u32) -> f64 {
    let idx = ((y * frame.width + x) * 3) as usize;
    let r = frame.rgb[idx] as f64;
    let g = frame.rgb[idx + 1] as f64;
    let b = frame.rgb[idx + 2] as f64;
    0.299 * r + 0.587 * g + 0.114 * b
}

/// Luma-weighted centroid `(cx, cy)` in pixel coordinates, and the raw luma
/// variance, computed in one pass.
fn luma_moments(frame: &VideoFrame) -> (f64, f64, f64) {
    let mut sum_w = 0.0f64;
    let mut sum_x = 0.0f64;
    let mut sum_y = 0.0f64;
    let mut sum_l = 0.0f64;
    let mut sum_l2 = 0.0f64;
    let mut n = 0.0f64;

    for y in 0..frame.height {
        for x in 0..frame.width {
            let l = luma(frame, x, y);
            sum_w += l;
            sum_x += l * x as f64;
            sum_y += l * y as f64;
            sum_l += l;
            sum_l2 += l * l;
            n += 1.0;
        }
    }
    if sum_w <= f64::EPSILON || n <= 0.0 {
        return (frame.width as f64 / 2.0, frame.height as f64 / 2.0, 0.0);
    }
    let mean = sum_l / n;
    let variance = (sum_l2 / n) - mean * mean;
    (sum_x / sum_w, sum_y / sum_w, variance)
}

/// Second-order central moment of luma around the centroid, used by the
/// dense backend as a cheap proxy for facial tilt (roll). `mu_xy` is the
/// covariance term; its sign/magnitude relative to `mu_xx - mu_yy` gives an
/// orientation angle the way image-moment ellipse fitting does.
fn central_moments(frame: &VideoFrame, cx: f64, cy: f64) -> (f64, f64, f64) {
    let mut mu_xx = 0.0f64;
    let mut mu_yy = 0.0f64;
    let mut mu_xy = 0.0f64;
    let mut sum_w = 0.0f64;
    for y in 0..frame.height {
        for x in 0..frame.width {
            let l = luma(frame, x, y);
            let dx = x as f64 - cx;
            let dy = y as f64 - cy;
            mu_xx += l * dx * dx;
            mu_yy += l * dy * dy;
            mu_xy += l * dx * dy;
            sum_w += l;
        }
    }
    if sum_w <= f64::EPSILON {
        return (0.0, 0.0, 0.0);
    }
    (mu_xx / sum_w, mu_yy / sum_w, mu_xy / sum_w)
}

/// Dense facial landmark geometry (nominal strategy). Falls back to `None`
/// (caller switches to bounding-box tracking) when the frame's luma
/// variance is too low to trust.
pub struct DenseLandmarks;

impl LandmarkBackend for DenseLandmarks {
    fn measure(&self, frame: &VideoFrame) -> Option<LandmarkSample> {
        if frame.width == 0 || frame.height == 0 {
            return None;
        }
        let (cx, cy, variance) = luma_moments(frame);
        if variance < MIN_LUMA_VARIANCE {
            return None;
        }
        let (mu_xx, mu_yy, mu_xy) = central_moments(frame, cx, cy);

        let half_w = frame.width as f64 / 2.0;
        let half_h = frame.height as f64 / 2.0;
        let yaw = ((cx - half_w) / half_w) as f32;
        let pitch = ((cy - half_h) / half_h) as f32;
        // Orientation of the luma moment ellipse's major axis, halved per
        // the standard image-moment formula; used directly as a roll
        // estimate in radians (small-angle regime).
        let roll = if (mu_xx - mu_yy).abs() > f64::EPSILON || mu_xy.abs() > f64::EPSILON {
            (0.5 * (2.0 * mu_xy).atan2(mu_xx - mu_yy)) as f32
        } else {
            0.0
        };

        Some(LandmarkSample { yaw, pitch, roll })
    }

    fn name(&self) -> &str {
        "dense_landmarks"
    }
}

/// Bounding-box centroid tracking (fallback strategy). Yields yaw/pitch
/// only; roll is always `0.0`.
pub struct BoundingBoxTracking;

impl LandmarkBackend for BoundingBoxTracking {
    fn measure(&self, frame: &VideoFrame) -> Option<LandmarkSample> {
        if frame.width == 0 || frame.height == 0 {
            return None;
        }
        let (cx, cy, variance) = luma_moments(frame);
        if variance < MIN_LUMA_VARIANCE {
            return None;
        }
        let half_w = frame.width as f64 / 2.0;
        let half_h = frame.height as f64 / 2.0;
        let yaw = ((cx - half_w) / half_w) as f32;
        let pitch = ((cy - half_h) / half_h) as f32;
        Some(LandmarkSample { yaw, pitch, roll: 0.0 })
    }

    fn name(&self) -> &str {
        "bounding_box_tracking"
    }
}

//! Coefficient bundle: the per-frame motion parameters consumed by the
//! face-animation renderer.
//!
//! Two coefficient layouts exist in the wild and this crate refuses to unify
//! them into one struct (per the design notes): a low-dimensional latent
//! vector (`Compact`) produced by some animation models, and a classical
//! per-channel 3DMM-style table (`Explicit`) produced by others. The
//! governor branches on the variant once at the top of `govern` rather than
//! per-channel-detecting a layout.

use std::collections::BTreeSet;
use std::ops::Range;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Convenience indices into a `[f32; 3]` pose triple (`pose_max`,
/// `pose_scale`, and an `Explicit` bundle's `pose_channels`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseAxis {
    Yaw = 0,
    Pitch = 1,
    Roll = 2,
}

/// Threshold, in columns, below which a bundle is treated as `Compact`
/// (latent) rather than `Explicit` (classical per-channel).
pub const COMPACT_DIM_THRESHOLD: usize = 200;

/// Provenance stamped onto a bundle by whichever model produced it, carried
/// through governance and persisted alongside the rendered artifacts for
/// debugging. Purely informational; the governor never branches on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    pub model_name: String,
    pub model_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layout")]
pub enum CoefficientBundle {
    /// `T x D` with `D < COMPACT_DIM_THRESHOLD`. Opaque latent vector; the
    /// governor must not reshape or slice it.
    Compact {
        data: Array2<f32>,
        format: FormatDescriptor,
    },
    /// `T x D` with `D >= COMPACT_DIM_THRESHOLD`, with declared index ranges
    /// for expression, pose (one column per axis), lip (pass-through), and
    /// identity (pass-through) channels. The exact split is model-specific
    /// and must be supplied by the caller, never hard-coded.
    Explicit {
        data: Array2<f32>,
        exp_range: Range<usize>,
        pose_channels: [usize; 3],
        lip_channels: BTreeSet<usize>,
        identity_channels: BTreeSet<usize>,
        format: FormatDescriptor,
    },
}

impl CoefficientBundle {
    pub fn is_compact(&self) -> bool {
        matches!(self, CoefficientBundle::Compact { .. })
    }

    pub fn data(&self) -> &Array2<f32> {
        match self {
            CoefficientBundle::Compact { data, .. } => data,
            CoefficientBundle::Explicit { data, .. } => data,
        }
    }

    pub fn data_mut(&mut self) -> &mut Array2<f32> {
        match self {
            CoefficientBundle::Compact { data, .. } => data,
            CoefficientBundle::Explicit { data, .. } => data,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        let dim = self.data().dim();
        (dim.0, dim.1)
    }

    pub fn frame_count(&self) -> usize {
        self.shape().0
    }

    pub fn channel_count(&self) -> usize {
        self.shape().1
    }

    pub fn format(&self) -> &FormatDescriptor {
        match self {
            CoefficientBundle::Compact { format, .. } => format,
            CoefficientBundle::Explicit { format, .. } => format,
        }
    }

    /// All values are finite (no NaN, no +/-inf). Checked by the governor
    /// before returning, per the "output is finite" invariant.
    pub fn is_finite(&self) -> bool {
        self.data().iter().all(|v| v.is_finite())
    }

    /// Construct a bundle, inferring `Compact` vs `Explicit` purely from
    /// column count, per `COMPACT_DIM_THRESHOLD`. `Explicit`'s channel
    /// layout is only filled in when the caller supplies one via
    /// `CoefficientBundle::explicit`; this constructor is for compact
    /// bundles (the common adapter-return shape for latent models).
    pub fn compact(data: Array2<f32>, format: FormatDescriptor) -> Self {
        debug_assert!(
            data.dim().1 < COMPACT_DIM_THRESHOLD,
            "compact bundle must have fewer than {COMPACT_DIM_THRESHOLD} channels"
        );
        CoefficientBundle::Compact { data, format }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn explicit(
        data: Array2<f32>,
        exp_range: Range<usize>,
        pose_channels: [usize; 3],
        lip_channels: BTreeSet<usize>,
        identity_channels: BTreeSet<usize>,
        format: FormatDescriptor,
    ) -> Self {
        debug_assert!(
            data.dim().1 >= COMPACT_DIM_THRESHOLD,
            "explicit bundle must have at least {COMPACT_DIM_THRESHOLD} channels"
        );
        CoefficientBundle::Explicit {
            data,
            exp_range,
            pose_channels,
            lip_channels,
            identity_channels,
            format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    fn fmt() -> FormatDescriptor {
        FormatDescriptor {
            model_name: "test-model".to_string(),
            model_version: "0".to_string(),
        }
    }

    #[test]
    fn compact_bundle_reports_compact() {
        let data = Array::zeros((10, 70));
        let bundle = CoefficientBundle::compact(data, fmt());
        assert!(bundle.is_compact());
        assert_eq!(bundle.shape(), (10, 70));
    }

    #[test]
    fn explicit_bundle_reports_not_compact() {
        let data = Array::zeros((10, 257));
        let bundle = CoefficientBundle::explicit(
            data,
            80..144,
            [224, 225, 226],
            BTreeSet::new(),
            BTreeSet::new(),
            fmt(),
        );
        assert!(!bundle.is_compact());
    }

    #[test]
    fn is_finite_detects_nan() {
        let mut data: Array2<f32> = Array::zeros((2, 70));
        data[[0, 0]] = f32::NAN;
        let bundle = CoefficientBundle::compact(data, fmt());
        assert!(!bundle.is_finite());
    }
}

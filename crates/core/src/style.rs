//! Style profile: a named motion recipe consumed by the motion governor.

use serde::{Deserialize, Serialize};

/// A named bundle of numeric parameters controlling the governor's scaling,
/// smoothing, and nodding behaviour. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleProfile {
    pub name: String,
    /// Absolute radian ceilings for (yaw, pitch, roll).
    pub pose_max: [f32; 3],
    /// Amplitude scaling in `[0, 1]` for (yaw, pitch, roll).
    pub pose_scale: [f32; 3],
    /// Scalar on non-mouth expression coefficients.
    pub expr_strength: f32,
    /// IIR retention factor in `[0, 1)`.
    pub smoothing: f32,
    /// Pose reduction factor applied on forced-stillness pause frames.
    pub stillness_on_pause: f32,
    /// Expression reduction factor applied on forced-stillness pause frames.
    pub stillness_expr_on_pause: f32,
    /// Nods per second; `0.0` disables nodding entirely.
    pub nod_rate: f32,
    /// Radian pitch impulse applied on an accepted sentence-end nod.
    pub nod_amplitude: f32,
}

impl StyleProfile {
    pub fn calm_tech() -> Self {
        Self {
            name: "calm_tech".to_string(),
            pose_max: [0.35, 0.25, 0.20],
            pose_scale: [0.5, 0.4, 0.3],
            expr_strength: 0.6,
            smoothing: 0.80,
            stillness_on_pause: 0.90,
            stillness_expr_on_pause: 0.90,
            nod_rate: 0.0,
            nod_amplitude: 0.0,
        }
    }

    pub fn energetic() -> Self {
        Self {
            name: "energetic".to_string(),
            pose_max: [0.55, 0.45, 0.35],
            pose_scale: [0.9, 0.8, 0.7],
            expr_strength: 1.1,
            smoothing: 0.60,
            stillness_on_pause: 0.60,
            stillness_expr_on_pause: 0.60,
            nod_rate: 0.5,
            nod_amplitude: 0.08,
        }
    }

    pub fn lecturer() -> Self {
        Self {
            name: "lecturer".to_string(),
            pose_max: [0.45, 0.35, 0.25],
            pose_scale: [0.7, 0.6, 0.5],
            expr_strength: 0.8,
            smoothing: 0.70,
            stillness_on_pause: 0.75,
            stillness_expr_on_pause: 0.75,
            nod_rate: 0.3,
            nod_amplitude: 0.06,
        }
    }

    /// Resolve a preset by name. Returns `None` for anything that isn't one
    /// of the three built-in presets; callers fall back to a persisted,
    /// extracted profile or a hard error (`InvalidInput`).
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "calm_tech" => Some(Self::calm_tech()),
            "energetic" => Some(Self::energetic()),
            "lecturer" => Some(Self::lecturer()),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json_bit_exact() {
        for profile in [StyleProfile::calm_tech(), StyleProfile::energetic(), StyleProfile::lecturer()] {
            let json = profile.to_json().unwrap();
            let back = StyleProfile::from_json(&json).unwrap();
            assert_eq!(profile, back);
        }
    }

    #[test]
    fn preset_lookup_matches_named_constructors() {
        assert_eq!(StyleProfile::preset("calm_tech"), Some(StyleProfile::calm_tech()));
        assert_eq!(StyleProfile::preset("unknown"), None);
    }
}

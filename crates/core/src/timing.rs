//! Intent timing map: the projection of a script intent onto the time axis
//! after speech synthesis, and the per-frame intent mask derived from it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::intent::ScriptIntent;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimingMapError {
    #[error("segment {0}: end_time ({1}) < start_time ({2})")]
    EndBeforeStart(usize, f32, f32),

    #[error("segment {0} starts at {1} before segment {2} ends ({3}) plus its pause ({4})")]
    OverlapsPreviousPause(usize, f32, usize, f32, f32),

    #[error("total_duration ({0}) is less than the last segment's end_time + pause_after ({1})")]
    TotalDurationTooShort(f32, f32),

    #[error("timing map must contain at least one segment")]
    Empty,
}

/// Per-segment temporal placement after synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingSegment {
    pub segment_idx: usize,
    pub start_time: f32,
    pub end_time: f32,
    pub pause_after: f32,
    pub emphasis: BTreeSet<String>,
    pub sentence_end: bool,
}

/// Ordered `TimingSegment`s plus total duration and fps, emitted by the
/// segmented synthesizer and read-only downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentTimingMap {
    segments: Vec<TimingSegment>,
    total_duration: f32,
    fps: u32,
}

impl IntentTimingMap {
    /// Construct and validate the invariants from the testable-properties
    /// list: `end_time >= start_time`, each segment starts no earlier than
    /// the previous segment's end plus its pause, and `total_duration` covers
    /// the last segment's end plus pause.
    pub fn new(
        segments: Vec<TimingSegment>,
        total_duration: f32,
        fps: u32,
    ) -> Result<Self, TimingMapError> {
        if segments.is_empty() {
            return Err(TimingMapError::Empty);
        }
        for (i, seg) in segments.iter().enumerate() {
            if seg.end_time < seg.start_time {
                return Err(TimingMapError::EndBeforeStart(i, seg.end_time, seg.start_time));
            }
            if i > 0 {
                let prev = &segments[i - 1];
                let earliest = prev.end_time + prev.pause_after;
                if seg.start_time < earliest {
                    return Err(TimingMapError::OverlapsPreviousPause(
                        i,
                        seg.start_time,
                        i - 1,
                        prev.end_time,
                        prev.pause_after,
                    ));
                }
            }
        }
        let last = segments.last().expect("checked non-empty above");
        let required = last.end_time + last.pause_after;
        if total_duration < required {
            return Err(TimingMapError::TotalDurationTooShort(total_duration, required));
        }
        Ok(Self {
            segments,
            total_duration,
            fps,
        })
    }

    pub fn segments(&self) -> &[TimingSegment] {
        &self.segments
    }

    pub fn total_duration(&self) -> f32 {
        self.total_duration
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Number of frames spanning `total_duration` at `fps`.
    pub fn frame_count(&self) -> usize {
        (self.total_duration * self.fps as f32).round() as usize
    }

    /// Returns the `TimingSegment` covering frame `t`, if `t` falls within a
    /// spoken span (not a pause window).
    pub fn segment_at_frame(&self, t: usize) -> Option<&TimingSegment> {
        let time = t as f32 / self.fps as f32;
        self.segments
            .iter()
            .find(|s| time >= s.start_time && time < s.end_time)
    }

    /// Build the script mask `s[t]`: `0.0` during pauses,
    /// `1.0` within a segment, boosted up to `1.3` when the segment carries
    /// emphasis. This is the pure, audio-independent half of the governor's
    /// fused intent mask; `m[t] = a[t] * s[t]` is computed once the governor
    /// also has the waveform's audio mask.
    ///
    /// Uses `seg_token_count` as a lower-bound proxy for the emphasis
    /// density's denominator, since a bare `IntentTimingMap` (e.g. one
    /// reloaded from `timing.json` without the originating `ScriptIntent`)
    /// no longer carries segment text. The governor always has the
    /// `ScriptIntent` in hand and calls `build_mask_with_script` instead;
    /// this method exists for callers without it.
    pub fn build_mask(&self) -> IntentMask {
        let len = self.frame_count();
        let mut mask = vec![0.0f32; len];
        for t in 0..len {
            if let Some(seg) = self.segment_at_frame(t) {
                let base = 1.0f32;
                let boosted = if seg.emphasis.is_empty() {
                    base
                } else {
                    let token_count = seg_token_count(seg);
                    let boost = 0.3 * (seg.emphasis.len() as f32 / token_count.max(1) as f32);
                    (base + boost).min(1.3)
                };
                mask[t] = boosted;
            }
        }
        IntentMask(mask)
    }
}

fn seg_token_count(seg: &TimingSegment) -> usize {
    // TimingSegment doesn't carry the raw text (only script-level metadata
    // survives synthesis), so emphasis density is computed against the
    // number of distinct emphasis tokens as a lower-bound proxy when no
    // richer token count is available. Callers that still have the source
    // `ScriptIntent` should prefer `IntentTimingMap::build_mask_with_script`.
    seg.emphasis.len().max(1)
}

impl IntentTimingMap {
    /// Like `build_mask`, but uses the original `ScriptIntent`'s per-segment
    /// token counts for the emphasis-density boost, matching the governor exactly
    /// (`|emphasis| / max(1, token_count(text))`) instead of the lossy proxy
    /// `build_mask` falls back to once text has been dropped.
    pub fn build_mask_with_script(&self, script: &ScriptIntent) -> IntentMask {
        let len = self.frame_count();
        let mut mask = vec![0.0f32; len];
        for t in 0..len {
            if let Some(seg) = self.segment_at_frame(t) {
                let base = 1.0f32;
                let boosted = if seg.emphasis.is_empty() {
                    base
                } else {
                    let token_count = script
                        .segments()
                        .get(seg.segment_idx)
                        .map(|s| s.token_count())
                        .unwrap_or(1);
                    let boost = 0.3 * (seg.emphasis.len() as f32 / token_count.max(1) as f32);
                    (base + boost).min(1.3)
                };
                mask[t] = boosted;
            }
        }
        IntentMask(mask)
    }
}

/// A dense per-frame motion-authority vector. `0.0` forces stillness, `1.0`
/// is nominal speech, values above `1.0` (bounded at `1.3`) are an emphasis
/// boost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentMask(Vec<f32>);

impl IntentMask {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values.into_iter().map(|v| v.clamp(0.0, 1.3)).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, t: usize) -> Option<f32> {
        self.0.get(t).copied()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Multiplicative (AND-logic) fusion with another mask of equal length:
    /// either source vetoing motion wins.
    pub fn fuse(&self, other: &IntentMask) -> IntentMask {
        assert_eq!(self.len(), other.len(), "masks must be the same length to fuse");
        let values: Vec<f32> = self
            .0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a * b).clamp(0.0, 1.3))
            .collect();
        IntentMask(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(idx: usize, start: f32, end: f32, pause: f32, emphasis: &[&str], sentence_end: bool) -> TimingSegment {
        TimingSegment {
            segment_idx: idx,
            start_time: start,
            end_time: end,
            pause_after: pause,
            emphasis: emphasis.iter().map(|s| s.to_string()).collect(),
            sentence_end,
        }
    }

    #[test]
    fn rejects_overlapping_segments() {
        let segs = vec![
            seg(0, 0.0, 1.0, 0.3, &[], true),
            seg(1, 1.0, 2.0, 0.0, &[], true), // should start at >= 1.3
        ];
        let err = IntentTimingMap::new(segs, 2.0, 25).unwrap_err();
        assert!(matches!(err, TimingMapError::OverlapsPreviousPause(..)));
    }

    #[test]
    fn rejects_short_total_duration() {
        let segs = vec![seg(0, 0.0, 1.0, 0.3, &[], true)];
        let err = IntentTimingMap::new(segs, 1.0, 25).unwrap_err();
        assert!(matches!(err, TimingMapError::TotalDurationTooShort(..)));
    }

    #[test]
    fn mask_length_matches_round_total_duration_times_fps() {
        let segs = vec![seg(0, 0.0, 1.0, 0.3, &[], true)];
        let map = IntentTimingMap::new(segs, 1.3, 25).unwrap();
        let mask = map.build_mask();
        assert_eq!(mask.len(), map.frame_count());
        assert_eq!(mask.len(), (1.3f32 * 25.0).round() as usize);
    }

    #[test]
    fn mask_is_zero_during_pause_and_bounded_at_1_3() {
        let segs = vec![
            seg(0, 0.0, 1.0, 1.0, &["big"], true),
            seg(1, 2.0, 3.0, 0.0, &[], true),
        ];
        let map = IntentTimingMap::new(segs, 3.0, 10).unwrap();
        let mask = map.build_mask();
        for t in 0..mask.len() {
            let v = mask.get(t).unwrap();
            assert!((0.0..=1.3).contains(&v));
        }
        // frame 15 (t=1.5s) falls in the pause window.
        assert_eq!(mask.get(15), Some(0.0));
    }

    #[test]
    fn empty_emphasis_never_raises_mask_above_one() {
        let segs = vec![seg(0, 0.0, 1.0, 0.0, &[], true)];
        let map = IntentTimingMap::new(segs, 1.0, 10).unwrap();
        let mask = map.build_mask();
        for t in 0..mask.len() {
            assert_eq!(mask.get(t), Some(1.0));
        }
    }

    #[test]
    fn fuse_is_and_logic_either_zero_wins() {
        let a = IntentMask::new(vec![0.0, 1.0, 1.3]);
        let b = IntentMask::new(vec![1.0, 0.0, 1.0]);
        let fused = a.fuse(&b);
        assert_eq!(fused.as_slice(), &[0.0, 0.0, 1.3]);
    }
}

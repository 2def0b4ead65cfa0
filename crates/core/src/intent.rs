//! Script intent: the typed representation of a generated script as an
//! ordered sequence of segments carrying semantic annotations.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntentConstructionError {
    #[error("segment text must not be empty")]
    EmptySegmentText,

    #[error("pause_after must be >= 0, got {0}")]
    NegativePause(String),

    #[error("a script intent must contain at least one segment")]
    EmptyScript,
}

/// A single script unit with pause, emphasis and sentence-boundary
/// annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentIntent {
    text: String,
    pause_after: f32,
    emphasis: BTreeSet<String>,
    sentence_end: bool,
}

impl SegmentIntent {
    /// Construct a segment, enforcing the invariants named in the data
    /// model: non-empty text, non-negative pause.
    pub fn new(
        text: impl Into<String>,
        pause_after: f32,
        emphasis: BTreeSet<String>,
        sentence_end: bool,
    ) -> Result<Self, IntentConstructionError> {
        let text = text.into();
        if text.is_empty() {
            return Err(IntentConstructionError::EmptySegmentText);
        }
        if !(pause_after >= 0.0) {
            return Err(IntentConstructionError::NegativePause(pause_after.to_string()));
        }
        Ok(Self {
            text,
            pause_after,
            emphasis,
            sentence_end,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn pause_after(&self) -> f32 {
        self.pause_after
    }

    pub fn emphasis(&self) -> &BTreeSet<String> {
        &self.emphasis
    }

    pub fn sentence_end(&self) -> bool {
        self.sentence_end
    }

    /// Number of whitespace-delimited tokens in `text`, used by the script
    /// mask's emphasis boost (`|emphasis| / max(1, token_count)`).
    pub fn token_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Ordered sequence of `SegmentIntent`s produced by the LLM client.
/// Immutable after construction; `total_duration` is populated only after
/// synthesis by the segmented synthesizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptIntent {
    segments: Vec<SegmentIntent>,
    total_duration: Option<f32>,
}

impl ScriptIntent {
    pub fn new(segments: Vec<SegmentIntent>) -> Result<Self, IntentConstructionError> {
        if segments.is_empty() {
            return Err(IntentConstructionError::EmptyScript);
        }
        Ok(Self {
            segments,
            total_duration: None,
        })
    }

    pub fn segments(&self) -> &[SegmentIntent] {
        &self.segments
    }

    pub fn total_duration(&self) -> Option<f32> {
        self.total_duration
    }

    /// Fill in `total_duration` after synthesis. The schema never permits a
    /// caller to construct a `ScriptIntent` with a duration directly, so this
    /// is the only way duration enters the type once segments are fixed.
    pub fn with_total_duration(mut self, duration: f32) -> Self {
        self.total_duration = Some(duration);
        self
    }

    /// Concatenation of segment texts: the canonical plain-text script.
    /// Joined with a single space rather than butted together, since
    /// segment text carries no trailing whitespace of its own and this is
    /// the string handed to single-shot TTS fallback and to sentence
    /// re-splitting, both of which need a word boundary between segments.
    pub fn plain_text(&self) -> String {
        self.segments
            .iter()
            .map(SegmentIntent::text)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// One segment per sentence, `pause_after = 0.3`, empty emphasis,
    /// `sentence_end = true` on terminal punctuation. Used by the LLM
    /// client's deterministic fallback when both JSON attempts fail.
    pub fn from_sentence_split(text: &str) -> Result<Self, IntentConstructionError> {
        let sentences = split_sentences(text);
        let segments = sentences
            .into_iter()
            .map(|s| SegmentIntent::new(s, 0.3, BTreeSet::new(), true))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(segments)
    }
}

/// Splits text into sentences on `.`, `!`, `?` boundaries, keeping the
/// terminal punctuation attached. Falls back to the whole string as one
/// sentence if no terminal punctuation is found.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }
    let trailing = current.trim();
    if !trailing.is_empty() {
        sentences.push(trailing.to_string());
    }
    if sentences.is_empty() {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            sentences.push(trimmed.to_string());
        } else {
            sentences.push("...".to_string());
        }
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_segment_text() {
        let err = SegmentIntent::new("", 0.0, BTreeSet::new(), false).unwrap_err();
        assert_eq!(err, IntentConstructionError::EmptySegmentText);
    }

    #[test]
    fn rejects_negative_pause() {
        let err = SegmentIntent::new("hi", -1.0, BTreeSet::new(), false).unwrap_err();
        assert!(matches!(err, IntentConstructionError::NegativePause(_)));
    }

    #[test]
    fn rejects_empty_script() {
        let err = ScriptIntent::new(Vec::new()).unwrap_err();
        assert_eq!(err, IntentConstructionError::EmptyScript);
    }

    #[test]
    fn plain_text_concatenates_segments() {
        let segs = vec![
            SegmentIntent::new("Hello.", 0.3, BTreeSet::new(), true).unwrap(),
            SegmentIntent::new("World.", 0.0, BTreeSet::new(), true).unwrap(),
        ];
        let script = ScriptIntent::new(segs).unwrap();
        assert_eq!(script.plain_text(), "Hello. World.");
    }

    #[test]
    fn sentence_split_fallback_marks_sentence_end() {
        let script = ScriptIntent::from_sentence_split("Hi there. How are you? Great!").unwrap();
        assert_eq!(script.segments().len(), 3);
        for seg in script.segments() {
            assert!(seg.sentence_end());
            assert!(seg.emphasis().is_empty());
            assert_eq!(seg.pause_after(), 0.3);
        }
    }

    #[test]
    fn sentence_split_handles_text_without_terminal_punctuation() {
        let script = ScriptIntent::from_sentence_split("just a fragment").unwrap();
        assert_eq!(script.segments().len(), 1);
        assert_eq!(script.segments()[0].text(), "just a fragment");
    }
}

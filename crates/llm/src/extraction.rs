//! Robust JSON extraction: turns whatever shape of text an LLM handed back
//! into a validated `ScriptIntent`, or `None` if it doesn't survive
//! validation. Accepts a bare object, a fenced object, an object preceded or
//! followed by prose — anything containing one well-formed JSON object with
//! a non-empty `segments` array.

use std::collections::BTreeSet;

use serde::Deserialize;
use videogen_core::{ScriptIntent, SegmentIntent};

#[derive(Debug, Deserialize)]
struct RawSegment {
    text: String,
    #[serde(default)]
    pause_after: f32,
    #[serde(default)]
    emphasis: Vec<String>,
    #[serde(default)]
    sentence_end: bool,
}

#[derive(Debug, Deserialize)]
struct RawScript {
    segments: Vec<RawSegment>,
    #[allow(dead_code)]
    total_duration: Option<f32>,
}

/// Minimum byte length below which a fence-marked slice is treated as a
/// truncated response rather than a legitimately tiny JSON object.
const TRUNCATION_LENGTH_FLOOR: usize = 20;

/// Scan `raw` for the first `{` and last `}`, attempt to parse that slice as
/// a `RawScript`, and convert to a validated `ScriptIntent`. Returns `None`
/// on any rejection: no braces found, the slice looks truncated (short and
/// fence-marked), `segments` missing or empty, the slice isn't valid JSON,
/// or an individual segment fails `SegmentIntent`'s invariants.
pub fn extract_script_intent(raw: &str) -> Option<ScriptIntent> {
    let first = raw.find('{')?;
    let last = raw.rfind('}')?;
    if last < first {
        return None;
    }
    let slice = &raw[first..=last];

    if slice.len() < TRUNCATION_LENGTH_FLOOR && raw.contains("```") {
        return None;
    }

    let parsed: RawScript = serde_json::from_str(slice).ok()?;
    if parsed.segments.is_empty() {
        return None;
    }

    let segments = parsed
        .segments
        .into_iter()
        .map(|s| {
            let emphasis: BTreeSet<String> = s.emphasis.into_iter().collect();
            SegmentIntent::new(s.text, s.pause_after, emphasis, s.sentence_end)
        })
        .collect::<Result<Vec<_>, _>>()
        .ok()?;

    ScriptIntent::new(segments).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bare_object() {
        let raw = r#"{"segments":[{"text":"Hi.","pause_after":0,"emphasis":[],"sentence_end":true}]}"#;
        let script = extract_script_intent(raw).unwrap();
        assert_eq!(script.segments().len(), 1);
    }

    #[test]
    fn accepts_fenced_object_with_preamble() {
        let raw = "Here you go:\n```json\n{\"segments\":[{\"text\":\"Hi.\",\"pause_after\":0,\"emphasis\":[],\"sentence_end\":true}]}\n```";
        let script = extract_script_intent(raw).unwrap();
        assert_eq!(script.segments().len(), 1);
        assert_eq!(script.segments()[0].text(), "Hi.");
    }

    #[test]
    fn accepts_object_followed_by_trailing_text() {
        let raw = r#"{"segments":[{"text":"Hi.","pause_after":0,"emphasis":[],"sentence_end":true}]} thanks!"#;
        assert!(extract_script_intent(raw).is_some());
    }

    #[test]
    fn rejects_truncated_fence_only_response() {
        let raw = "```json";
        assert!(extract_script_intent(raw).is_none());
    }

    #[test]
    fn rejects_missing_segments_field() {
        let raw = r#"{"total_duration": 5.0}"#;
        assert!(extract_script_intent(raw).is_none());
    }

    #[test]
    fn rejects_empty_segments_array() {
        let raw = r#"{"segments": []}"#;
        assert!(extract_script_intent(raw).is_none());
    }

    #[test]
    fn rejects_segment_with_empty_text() {
        let raw = r#"{"segments":[{"text":"","pause_after":0,"emphasis":[],"sentence_end":true}]}"#;
        assert!(extract_script_intent(raw).is_none());
    }

    #[test]
    fn rejects_no_braces_at_all() {
        assert!(extract_script_intent("no json here").is_none());
    }

    #[test]
    fn carries_emphasis_tokens_through() {
        let raw = r#"{"segments":[{"text":"World.","pause_after":0,"emphasis":["World"],"sentence_end":true}]}"#;
        let script = extract_script_intent(raw).unwrap();
        assert!(script.segments()[0].emphasis().contains("World"));
    }
}

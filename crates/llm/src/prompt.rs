//! System prompt construction for the two-attempt request cascade.

/// Textual description of the strict-JSON response schema, embedded in the
/// system prompt for the first attempt. Anthropic's Messages API has no
/// native `response_format` parameter the way some providers do, so
/// `force_json` is expressed as an instruction rather than a request field;
/// backends for providers that *do* support a native JSON mode read
/// `ScriptRequest::force_json` directly instead.
const SCRIPT_SCHEMA_DESCRIPTION: &str = r#"Respond with exactly one JSON object and nothing else (no prose, no markdown fence). The object must have this shape:
{
  "segments": [
    {
      "text": "string, non-empty, one script unit's spoken text",
      "pause_after": 0.0,
      "emphasis": ["word", "tokens", "that appear verbatim in text"],
      "sentence_end": true
    }
  ],
  "total_duration": null
}
"segments" must be a non-empty array. "pause_after" is seconds of silence appended after the segment (>= 0). "emphasis" lists tokens to stress, each of which must appear in "text". "sentence_end" marks a natural nod point. "total_duration" may be omitted or null."#;

pub fn build_system_prompt(style_hint: Option<&str>, strict_json: bool) -> String {
    let mut prompt = String::from(
        "You write short video scripts as a sequence of spoken segments annotated with \
         pacing and emphasis metadata.",
    );
    if let Some(hint) = style_hint {
        prompt.push_str("\n\nStyle: ");
        prompt.push_str(hint);
    }
    if strict_json {
        prompt.push_str("\n\n");
        prompt.push_str(SCRIPT_SCHEMA_DESCRIPTION);
    }
    prompt
}

/// A simplified natural-language description of the desired JSON used for
/// the permissive retry, deliberately less rigid than the
/// strict schema so a model that choked on the strict instruction has a
/// second, looser shot at producing something the extractor can parse.
pub fn build_permissive_retry_prompt(user_prompt: &str, style_hint: Option<&str>) -> String {
    let mut prompt = String::from(
        "Write a short video script about the following topic. Break it into spoken segments. \
         For each segment, note how long a pause (in seconds) should follow it, which words (if \
         any) should be emphasised, and whether it ends a sentence. Return your answer as JSON: \
         an object with a \"segments\" array, each entry having \"text\", \"pause_after\", \
         \"emphasis\", and \"sentence_end\" fields. You can include a short explanation before or \
         after the JSON if you want.",
    );
    if let Some(hint) = style_hint {
        prompt.push_str("\n\nStyle: ");
        prompt.push_str(hint);
    }
    prompt.push_str("\n\nTopic: ");
    prompt.push_str(user_prompt);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_prompt_embeds_schema() {
        let prompt = build_system_prompt(None, true);
        assert!(prompt.contains("\"segments\""));
    }

    #[test]
    fn non_strict_prompt_omits_schema_block() {
        let prompt = build_system_prompt(None, false);
        assert!(!prompt.contains(SCRIPT_SCHEMA_DESCRIPTION));
    }

    #[test]
    fn style_hint_is_included() {
        let prompt = build_system_prompt(Some("be upbeat"), true);
        assert!(prompt.contains("be upbeat"));
    }
}

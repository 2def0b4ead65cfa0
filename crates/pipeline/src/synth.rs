//! Segmented Synthesizer (C3): per-segment TTS, silence insertion, emphasis
//! text-shaping, and timing-map construction.

use std::collections::BTreeSet;
use std::path::Path;

use videogen_core::{
    PipelineError, ScriptIntent, SegmentIntent, TimingSegment, TtsModel, Waveform,
};
use videogen_core::IntentTimingMap;

/// Deterministic sampling parameters passed to the TTS model for every
/// segment call.
#[derive(Debug, Clone, Copy)]
pub struct TtsSamplingParams {
    pub temperature: f32,
    pub repetition_penalty: f32,
    pub top_p: f32,
}

impl Default for TtsSamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.65,
            repetition_penalty: 2.5,
            top_p: 0.85,
        }
    }
}

/// Uppercases each token in `emphasis` as it occurs in `text`: whole-word,
/// case-insensitive, first occurrence only per token. Punctuation spacing is
/// preserved since only the matched word's characters are replaced.
pub fn shape_text_for_emphasis(text: &str, emphasis: &BTreeSet<String>) -> String {
    let mut shaped = text.to_string();
    for token in emphasis {
        if let Some((start, len)) = find_whole_word_case_insensitive(&shaped, token) {
            let upper = shaped[start..start + len].to_uppercase();
            shaped.replace_range(start..start + len, &upper);
        }
    }
    shaped
}

fn find_whole_word_case_insensitive(haystack: &str, word: &str) -> Option<(usize, usize)> {
    if word.is_empty() {
        return None;
    }
    let lower_haystack = haystack.to_lowercase();
    let lower_word = word.to_lowercase();
    let mut search_from = 0;
    while let Some(rel) = lower_haystack[search_from..].find(&lower_word) {
        let start = search_from + rel;
        let end = start + lower_word.len();
        let before_ok = start == 0
            || !lower_haystack[..start]
                .chars()
                .next_back()
                .map(|c| c.is_alphanumeric())
                .unwrap_or(false);
        let after_ok = end == lower_haystack.len()
            || !lower_haystack[end..]
                .chars()
                .next()
                .map(|c| c.is_alphanumeric())
                .unwrap_or(false);
        if before_ok && after_ok {
            return Some((start, lower_word.len()));
        }
        search_from = start + 1;
        if search_from >= lower_haystack.len() {
            break;
        }
    }
    None
}

/// Synthesizes every segment, inserts literal zero-sample
/// silence for `pause_after`, and writes the concatenated waveform as
/// 16-bit PCM WAV at the model's native rate. Falls back to single-shot
/// synthesis of the flattened plain text on a segment TTS failure,
/// producing a one-segment timing map — the caller must not treat that as
/// an error.
pub async fn synthesize_with_intent(
    tts: &dyn TtsModel,
    script: &ScriptIntent,
    reference_audio: &str,
    fps: u32,
    language: &str,
    output_wav_path: &Path,
) -> Result<(String, IntentTimingMap), PipelineError> {
    match synthesize_segments(tts, script, reference_audio, fps, language).await {
        Ok((waveform, map)) => {
            write_wav(&waveform, output_wav_path)?;
            Ok((output_wav_path.display().to_string(), map))
        }
        Err(e) => {
            tracing::warn!(error = %e, "segment synthesis failed, falling back to single-shot synthesis");
            let plain_text = script.plain_text();
            let waveform = tts
                .synthesize(&plain_text, reference_audio, language)
                .await?;
            let duration = waveform.duration_secs();
            let segment = TimingSegment {
                segment_idx: 0,
                start_time: 0.0,
                end_time: duration,
                pause_after: 0.0,
                emphasis: BTreeSet::new(),
                sentence_end: true,
            };
            let map = IntentTimingMap::new(vec![segment], duration, fps)
                .map_err(|e| PipelineError::Artifact(e.to_string()))?;
            write_wav(&waveform, output_wav_path)?;
            Ok((output_wav_path.display().to_string(), map))
        }
    }
}

async fn synthesize_segments(
    tts: &dyn TtsModel,
    script: &ScriptIntent,
    reference_audio: &str,
    fps: u32,
    language: &str,
) -> Result<(Waveform, IntentTimingMap), PipelineError> {
    let mut sample_rate = tts.native_sample_rate();
    let mut combined = Waveform {
        samples: Vec::new(),
        sample_rate,
    };
    let mut timing_segments = Vec::with_capacity(script.segments().len());
    let mut cursor = 0.0f32;

    for (idx, segment) in script.segments().iter().enumerate() {
        let shaped = shape_text_for_emphasis(segment.text(), segment.emphasis());
        let spoken = tts.synthesize(&shaped, reference_audio, language).await?;
        sample_rate = spoken.sample_rate;
        combined.sample_rate = sample_rate;

        let duration = spoken.duration_secs();
        let start_time = cursor;
        let end_time = cursor + duration;

        combined.append(spoken);
        if segment.pause_after() > 0.0 {
            combined.append(Waveform::silence(segment.pause_after(), sample_rate));
        }
        cursor = end_time + segment.pause_after();

        timing_segments.push(TimingSegment {
            segment_idx: idx,
            start_time,
            end_time,
            pause_after: segment.pause_after(),
            emphasis: segment.emphasis().clone(),
            sentence_end: segment.sentence_end(),
        });
    }

    let total_duration = cursor;
    let map = IntentTimingMap::new(timing_segments, total_duration, fps)
        .map_err(|e| PipelineError::Artifact(e.to_string()))?;
    Ok((combined, map))
}

fn write_wav(waveform: &Waveform, path: &Path) -> Result<(), PipelineError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: waveform.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer =
        hound::WavWriter::create(path, spec).map_err(|e| PipelineError::Artifact(e.to_string()))?;
    for &sample in &waveform.samples {
        let clamped = sample.clamp(-1.0, 1.0);
        writer
            .write_sample((clamped * i16::MAX as f32) as i16)
            .map_err(|e| PipelineError::Artifact(e.to_string()))?;
    }
    writer
        .finalize()
        .map_err(|e| PipelineError::Artifact(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use videogen_core::SegmentIntent;

    #[test]
    fn emphasis_uppercases_whole_word_first_occurrence_only() {
        let mut emphasis = BTreeSet::new();
        emphasis.insert("world".to_string());
        let shaped = shape_text_for_emphasis("Hello world, world again.", &emphasis);
        assert_eq!(shaped, "Hello WORLD, world again.");
    }

    #[test]
    fn emphasis_is_case_insensitive_whole_word_match() {
        let mut emphasis = BTreeSet::new();
        emphasis.insert("World".to_string());
        let shaped = shape_text_for_emphasis("Hello world!", &emphasis);
        assert_eq!(shaped, "Hello WORLD!");
    }

    #[test]
    fn emphasis_does_not_match_substring_inside_another_word() {
        let mut emphasis = BTreeSet::new();
        emphasis.insert("cat".to_string());
        let shaped = shape_text_for_emphasis("The category is cats.", &emphasis);
        assert_eq!(shaped, "The category is cats.");
    }

    struct CountingStubTts {
        chars_per_sec: f32,
        sample_rate: u32,
        calls: AtomicUsize,
        fail_after: Option<usize>,
    }

    #[async_trait]
    impl TtsModel for CountingStubTts {
        async fn synthesize(
            &self,
            text: &str,
            _reference_audio: &str,
            _language: &str,
        ) -> Result<Waveform, PipelineError> {
            let call_idx = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(fail_at) = self.fail_after {
                if call_idx >= fail_at {
                    return Err(PipelineError::UpstreamUnavailable("tts down".to_string()));
                }
            }
            let duration = text.chars().count() as f32 / self.chars_per_sec;
            Ok(Waveform::silence(duration.max(0.05), self.sample_rate))
        }

        fn native_sample_rate(&self) -> u32 {
            self.sample_rate
        }

        fn model_name(&self) -> &str {
            "counting-stub"
        }
    }

    fn two_segment_script() -> ScriptIntent {
        let mut emphasis = BTreeSet::new();
        emphasis.insert("World".to_string());
        ScriptIntent::new(vec![
            SegmentIntent::new("Hello.", 0.3, BTreeSet::new(), true).unwrap(),
            SegmentIntent::new("World.", 0.0, emphasis, true).unwrap(),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn timing_map_reflects_silence_and_monotonic_starts() {
        let tts = CountingStubTts {
            chars_per_sec: 20.0,
            sample_rate: 24_000,
            calls: AtomicUsize::new(0),
            fail_after: None,
        };
        let script = two_segment_script();
        let dir = tempfile::tempdir().unwrap();
        let wav_path = dir.path().join("out.wav");
        let (_, map) =
            synthesize_with_intent(&tts, &script, "ref.wav", 25, "en", &wav_path).await.unwrap();

        assert_eq!(map.segments().len(), 2);
        let seg0 = &map.segments()[0];
        let seg1 = &map.segments()[1];
        assert!(seg1.start_time >= seg0.end_time + seg0.pause_after - 1e-4);
        assert!(wav_path.exists());
    }

    #[tokio::test]
    async fn zero_pause_inserts_no_silence_samples() {
        let tts = CountingStubTts {
            chars_per_sec: 20.0,
            sample_rate: 24_000,
            calls: AtomicUsize::new(0),
            fail_after: None,
        };
        let script = ScriptIntent::new(vec![SegmentIntent::new(
            "Hi.",
            0.0,
            BTreeSet::new(),
            true,
        )
        .unwrap()])
        .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let wav_path = dir.path().join("out.wav");
        let (_, map) =
            synthesize_with_intent(&tts, &script, "ref.wav", 25, "en", &wav_path).await.unwrap();
        let seg = &map.segments()[0];
        assert_eq!(seg.pause_after, 0.0);
    }

    #[tokio::test]
    async fn segment_failure_falls_back_to_single_shot_one_segment_map() {
        let tts = CountingStubTts {
            chars_per_sec: 20.0,
            sample_rate: 24_000,
            calls: AtomicUsize::new(0),
            fail_after: Some(0),
        };
        let script = two_segment_script();
        let dir = tempfile::tempdir().unwrap();
        let wav_path = dir.path().join("out.wav");
        let (_, map) =
            synthesize_with_intent(&tts, &script, "ref.wav", 25, "en", &wav_path).await.unwrap();
        assert_eq!(map.segments().len(), 1);
        assert!(map.segments()[0].emphasis.is_empty());
        assert_eq!(map.segments()[0].pause_after, 0.0);
    }
}

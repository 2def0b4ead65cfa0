//! Pipeline Orchestrator (C8): sequences C2 (script generation) through C6
//! (render), resolving persona to reference assets/style, persisting
//! artifacts per request, and applying the short-circuit/fall-through
//! propagation policy. Structured like a `VoicePipeline`
//! orchestrator, minus its streaming/VAD concerns, which have no
//! counterpart here: sequential request/response, not a duplex stream.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use videogen_core::{
    CoefficientBundle, CoefficientModel, IntentTimingMap, Persona, PipelineError, RenderOptions,
    ScriptIntent, StyleProfile,
};
use videogen_llm::ScriptClient;

use crate::governor::{govern_with_report, GovernorReport};
use crate::registry::ModelRegistry;
use crate::synth::synthesize_with_intent;

/// Per-call knobs layered over the persona's defaults. `enable_intent` and
/// `enable_governor` let a caller bypass C2's structuring or C5's shaping
/// entirely, e.g. for debugging a raw model pairing.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub enable_intent: bool,
    pub enable_governor: bool,
    pub style: Option<StyleProfile>,
    pub temperature: Option<f32>,
    pub max_tokens: u32,
    pub fps: u32,
    pub resolution: u32,
    pub enhance: bool,
    /// Checked at each stage boundary (C2 -> C3 -> C4 -> C5 -> C6); never
    /// polled mid-stage. A fresh, never-cancelled token by default.
    pub cancellation: CancellationToken,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            enable_intent: true,
            enable_governor: true,
            style: None,
            temperature: None,
            max_tokens: 1024,
            fps: 25,
            resolution: 256,
            enhance: false,
            cancellation: CancellationToken::new(),
        }
    }
}

/// Everything the caller needs to surface a successful generation, plus
/// enough metadata to explain what happened (provenance, governor report).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResult {
    pub request_id: String,
    pub text: String,
    pub script_intent: ScriptIntent,
    pub audio_path: String,
    pub timing_map: IntentTimingMap,
    pub video_path: String,
    pub metadata: GenerateMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateMetadata {
    pub used_intent: bool,
    pub used_governor: bool,
    pub governor_no_op: bool,
    pub style_preset: String,
}

/// A failed `generate()` call, carrying the `request_id` whenever one was
/// allocated before the failure, so a caller can still inspect whatever
/// artifacts made it to disk before the stage that failed.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct GenerationError {
    pub request_id: Option<String>,
    #[source]
    pub source: PipelineError,
}

impl GenerationError {
    fn new(request_id: Option<String>, source: PipelineError) -> Self {
        Self { request_id, source }
    }
}

pub struct PipelineOrchestrator {
    registry: Arc<ModelRegistry>,
    script_client: ScriptClient,
    persona_registry: videogen_config::PersonaRegistry,
    output_dir: PathBuf,
}

impl PipelineOrchestrator {
    /// Builds its own `ScriptClient` from the registry's script model handle
    /// so both go through the same underlying `Arc<dyn ScriptModel>`; the
    /// registry's per-model mutex still serialises concurrent requests.
    pub fn new(
        registry: Arc<ModelRegistry>,
        persona_registry: videogen_config::PersonaRegistry,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        let script_client = ScriptClient::new(registry.script_model());
        Self {
            registry,
            script_client,
            persona_registry,
            output_dir: output_dir.into(),
        }
    }

    /// `(prompt, persona, options) -> GenerateResult`.
    /// Sequential, short-circuiting on C2's `UpstreamUnavailable` and
    /// falling through to the plain-text path on any other downstream
    /// failure.
    pub async fn generate(
        &self,
        prompt: &str,
        persona: Persona,
        options: GenerateOptions,
    ) -> Result<GenerateResult, GenerationError> {
        if prompt.trim().is_empty() {
            return Err(GenerationError::new(
                None,
                PipelineError::InvalidInput("prompt must not be empty".to_string()),
            ));
        }

        let entry = self
            .persona_registry
            .resolve(persona)
            .map_err(|e| GenerationError::new(None, PipelineError::InvalidInput(e.to_string())))?;

        let style = options
            .style
            .clone()
            .or_else(|| StyleProfile::preset(&entry.default_style_profile))
            .unwrap_or_else(StyleProfile::calm_tech);

        let temperature = options.temperature.unwrap_or(entry.default_temperature);

        let request_id = new_request_id();
        let request_dir = self.output_dir.join(&request_id);
        std::fs::create_dir_all(&request_dir)
            .map_err(|e| GenerationError::new(Some(request_id.clone()), PipelineError::Io(e)))?;

        // Every failure from here on has a `request_id` to report back, even
        // though the artifacts directory it names may be empty or partial.
        self.run_stages(prompt, entry, style, temperature, request_id.clone(), request_dir, options)
            .await
            .map_err(|e| GenerationError::new(Some(request_id), e))
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_stages(
        &self,
        prompt: &str,
        entry: &videogen_config::PersonaEntry,
        style: StyleProfile,
        temperature: f32,
        request_id: String,
        request_dir: PathBuf,
        options: GenerateOptions,
    ) -> Result<GenerateResult, PipelineError> {
        if options.cancellation.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        // C2: script generation. A transport failure on every retry attempt
        // aborts the whole request; anything content-related already fell
        // back inside `generate_with_intent`.
        let (text, script_intent, provenance) = {
            let _script_model = self.registry.script().await;
            self.script_client
                .generate_with_intent(
                    prompt,
                    Some(entry.llm_style_hint.as_str()),
                    temperature,
                    options.max_tokens,
                )
                .await?
        };

        if !options.enable_intent {
            tracing::info!(request_id = %request_id, "intent structuring disabled by caller");
        }
        let script_intent = if options.enable_intent {
            script_intent
        } else {
            ScriptIntent::from_sentence_split(&text)
                .map_err(|e| PipelineError::Artifact(e.to_string()))?
        };

        persist_json(&request_dir.join("script.json"), &script_intent)?;

        tracing::info!(
            request_id = %request_id,
            attempt = ?provenance.attempt,
            segments = script_intent.segments().len(),
            "script intent ready"
        );

        if options.cancellation.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        // C3: segmented synthesis. A failure here is already absorbed
        // internally (falls back to single-shot synthesis); only a hard
        // I/O error escapes.
        let audio_path = request_dir.join("audio.wav");
        let (audio_path, timing_map) = {
            let tts = self.registry.tts().await;
            synthesize_with_intent(
                &*tts,
                &script_intent,
                &entry.reference_audio_path,
                options.fps,
                "en",
                &audio_path,
            )
            .await?
        };

        persist_json(&request_dir.join("timing.json"), &timing_map)?;

        if options.cancellation.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        // C4/C5/C6: coefficient generation, governance, render. Any failure
        // in C4 or C6 is hard per the propagation policy; C5 never fails.
        let coeffs = {
            let coeff_model = self.registry.coeff().await;
            coeff_model
                .generate_coeffs(&audio_path, &entry.reference_image_path)
                .await?
        };

        let (governed, governor_no_op) = if options.enable_governor {
            let (governed, report) = govern_with_report(
                coeffs,
                audio_path.to_str().unwrap_or_default(),
                &timing_map,
                &script_intent,
                &style,
            );
            log_governor_report(&request_id, &report);
            (governed, report.no_op)
        } else {
            (coeffs, false)
        };

        if options.cancellation.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let video_path_on_disk = request_dir.join("video.mp4");
        let render_options = RenderOptions {
            enhance: options.enhance,
            fps: options.fps,
            resolution: options.resolution,
        };
        let video_path = {
            let render_model = self.registry.render().await;
            render_model
                .render(
                    &governed,
                    &entry.reference_image_path,
                    audio_path.to_str().unwrap_or_default(),
                    video_path_on_disk.to_str().unwrap_or_default(),
                    render_options,
                )
                .await?
        };

        Ok(GenerateResult {
            request_id,
            text,
            script_intent,
            audio_path: audio_path.display().to_string(),
            timing_map,
            video_path,
            metadata: GenerateMetadata {
                used_intent: options.enable_intent,
                used_governor: options.enable_governor,
                governor_no_op,
                style_preset: style.name.clone(),
            },
        })
    }
}

fn log_governor_report(request_id: &str, report: &GovernorReport) {
    if report.no_op {
        tracing::warn!(kind = "GovernorNoOp", request_id = %request_id, "governor produced no effect this request");
    } else {
        tracing::info!(
            request_id = %request_id,
            pause_override_frames = report.pause_override_frames,
            nods_accepted = report.nods_accepted,
            nods_rate_limited = report.nods_rate_limited,
            "governor report"
        );
    }
}

fn persist_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PipelineError> {
    let json = serde_json::to_vec_pretty(value)?;
    std::fs::write(path, json).map_err(PipelineError::Io)
}

/// A process-unique, monotonically-ordered id: wall-clock-looking prefix
/// plus a process-local counter, avoiding `Uuid`'s extra dependency for
/// something only used as a directory name.
fn new_request_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("req-{nanos:x}-{seq}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use videogen_core::{
        FormatDescriptor, RawCompletion, ScriptModel, ScriptRequest, TtsModel, Waveform,
    };

    struct StubScript;
    #[async_trait]
    impl ScriptModel for StubScript {
        async fn complete(&self, _r: &ScriptRequest) -> Result<RawCompletion, PipelineError> {
            Ok(RawCompletion {
                text: r#"{"segments":[{"text":"Hello there.","pause_after":0.2,"emphasis":[],"sentence_end":true}]}"#.to_string(),
                used_json_mode: true,
            })
        }
        fn model_name(&self) -> &str {
            "stub-script"
        }
    }

    struct StubTts;
    #[async_trait]
    impl TtsModel for StubTts {
        async fn synthesize(&self, text: &str, _r: &str, _l: &str) -> Result<Waveform, PipelineError> {
            let duration = (text.chars().count() as f32 / 20.0).max(0.1);
            Ok(Waveform::silence(duration, 16_000))
        }
        fn native_sample_rate(&self) -> u32 {
            16_000
        }
        fn model_name(&self) -> &str {
            "stub-tts"
        }
    }

    struct StubCoeff;
    #[async_trait]
    impl videogen_core::CoefficientModel for StubCoeff {
        async fn generate_coeffs(
            &self,
            _a: &str,
            _r: &str,
        ) -> Result<CoefficientBundle, PipelineError> {
            Ok(CoefficientBundle::compact(
                ndarray::Array2::zeros((5, 8)),
                FormatDescriptor {
                    model_name: "stub".to_string(),
                    model_version: "0".to_string(),
                },
            ))
        }
        fn model_name(&self) -> &str {
            "stub-coeff"
        }
    }

    struct StubRender;
    #[async_trait]
    impl videogen_core::RenderModel for StubRender {
        async fn render(
            &self,
            _b: &CoefficientBundle,
            _r: &str,
            _a: &str,
            out: &str,
            _o: RenderOptions,
        ) -> Result<String, PipelineError> {
            std::fs::write(out, b"fake-mp4").map_err(PipelineError::Io)?;
            Ok(out.to_string())
        }
        fn model_name(&self) -> &str {
            "stub-render"
        }
    }

    fn orchestrator(output_dir: &Path) -> PipelineOrchestrator {
        let registry = Arc::new(ModelRegistry::new(
            Arc::new(StubScript),
            Arc::new(StubTts),
            Arc::new(StubCoeff),
            Arc::new(StubRender),
        ));
        PipelineOrchestrator::new(
            registry,
            videogen_config::PersonaRegistry::builtin(),
            output_dir,
        )
    }

    #[tokio::test]
    async fn generate_persists_all_four_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path());
        let result = orch
            .generate("Tell me about the new phone.", Persona::Mkbhd, GenerateOptions::default())
            .await
            .unwrap();

        let request_dir = dir.path().join(&result.request_id);
        assert!(request_dir.join("script.json").exists());
        assert!(request_dir.join("timing.json").exists());
        assert!(Path::new(&result.audio_path).exists());
        assert!(Path::new(&result.video_path).exists());
    }

    #[tokio::test]
    async fn disabling_intent_falls_back_to_sentence_split() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path());
        let mut options = GenerateOptions::default();
        options.enable_intent = false;
        let result = orch
            .generate("Tell me about the new phone. It has a great camera.", Persona::IJustine, options)
            .await
            .unwrap();
        assert!(!result.metadata.used_intent);
        assert!(result.script_intent.segments().len() >= 1);
    }

    #[tokio::test]
    async fn pre_cancelled_token_aborts_before_any_stage_runs() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path());
        let mut options = GenerateOptions::default();
        options.cancellation.cancel();
        let err = orch
            .generate("Tell me about the new phone.", Persona::Mkbhd, options)
            .await
            .unwrap_err();
        assert!(matches!(err.source, PipelineError::Cancelled));
        assert!(err.request_id.is_some());
        // the request directory may exist (created before the first stage
        // boundary check) but must be empty: no stage ran.
        for entry in dir.path().read_dir().unwrap() {
            let entry = entry.unwrap();
            assert!(entry.path().read_dir().unwrap().next().is_none());
        }
    }

    #[tokio::test]
    async fn disabling_governor_skips_governance_and_reports_it() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path());
        let mut options = GenerateOptions::default();
        options.enable_governor = false;
        let result = orch
            .generate("Short script.", Persona::Mkbhd, options)
            .await
            .unwrap();
        assert!(!result.metadata.used_governor);
        assert!(!result.metadata.governor_no_op);
    }
}

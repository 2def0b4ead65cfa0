//! HTTP front-end (A2): a thin `axum` router with no business logic beyond
//! deserialising requests, invoking the orchestrator, and serialising
//! results/errors.

use std::time::Instant;

use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use videogen_core::{Persona, PipelineError, StyleProfile};
use videogen_pipeline::{GenerateOptions, GenerationError};

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = if state.settings.server.cors_allow_any_origin {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST])
    } else {
        CorsLayer::new().allow_methods([Method::GET, Method::POST])
    };

    Router::new()
        .route("/api/generate", post(generate))
        .route("/api/styles", get(list_styles))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    prompt: String,
    persona: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct GenerateResponse {
    text: String,
    script_intent: videogen_core::ScriptIntent,
    audio_url: String,
    video_url: String,
    request_id: String,
    timestamp: String,
    processing_time: f64,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error_kind: String,
    message: String,
    request_id: Option<String>,
}

async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let started = Instant::now();

    if request.prompt.trim().is_empty() {
        return Err(PipelineError::InvalidInput("prompt must not be empty".to_string()).into());
    }

    let persona: Persona = request
        .persona
        .parse()
        .map_err(|e: videogen_core::InvalidPersona| PipelineError::InvalidInput(e.to_string()))?;

    let mut options = GenerateOptions {
        temperature: request.temperature,
        ..GenerateOptions::default()
    };
    if let Some(max_tokens) = request.max_tokens {
        options.max_tokens = max_tokens;
    }
    options.fps = state.settings.models.default_fps;
    options.resolution = state.settings.models.default_resolution;

    let result = state
        .orchestrator
        .generate(&request.prompt, persona, options)
        .await?;

    let audio_url = format!("/outputs/{}/audio.wav", result.request_id);
    let video_url = format!("/outputs/{}/video.mp4", result.request_id);

    Ok(Json(GenerateResponse {
        text: result.text,
        script_intent: result.script_intent,
        audio_url,
        video_url,
        request_id: result.request_id,
        timestamp: chrono::Utc::now().to_rfc3339(),
        processing_time: started.elapsed().as_secs_f64(),
    }))
}

#[derive(Debug, Serialize)]
struct StylesResponse {
    presets: Vec<StyleProfile>,
    default: String,
}

async fn list_styles(State(state): State<AppState>) -> Json<StylesResponse> {
    Json(StylesResponse {
        presets: vec![
            StyleProfile::calm_tech(),
            StyleProfile::energetic(),
            StyleProfile::lecturer(),
        ],
        default: state.settings.models.default_style_preset.clone(),
    })
}

async fn health() -> &'static str {
    "ok"
}

async fn ready() -> &'static str {
    "ready"
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    state.metrics_handle.render().into_response()
}

/// Wraps `PipelineError` so it can be returned directly from a handler;
/// serialises to `{error_kind, message, request_id}`. The `request_id` is
/// `None` for failures ahead of the orchestrator (e.g. an unknown persona
/// rejected before any request directory exists) and `Some` whenever the
/// orchestrator had already allocated one, so the caller can still inspect
/// whatever artifacts made it to disk.
struct ApiError {
    source: PipelineError,
    request_id: Option<String>,
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self {
            source: err,
            request_id: None,
        }
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        Self {
            source: err.source,
            request_id: err.request_id,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.source {
            PipelineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PipelineError::InsufficientReferenceData(_) => StatusCode::BAD_REQUEST,
            PipelineError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            PipelineError::Artifact(_) | PipelineError::Io(_) | PipelineError::Serde(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            PipelineError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = ErrorResponse {
            error_kind: self.source.kind().to_string(),
            message: self.source.to_string(),
            request_id: self.request_id,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;
    use videogen_core::{
        CoefficientBundle, FormatDescriptor, RawCompletion, RenderOptions, ScriptModel,
        ScriptRequest, TtsModel, Waveform,
    };
    use videogen_pipeline::ModelRegistry;

    struct StubScript;
    #[async_trait]
    impl ScriptModel for StubScript {
        async fn complete(&self, _r: &ScriptRequest) -> Result<RawCompletion, PipelineError> {
            Ok(RawCompletion {
                text: r#"{"segments":[{"text":"Hi.","pause_after":0.1,"emphasis":[],"sentence_end":true}]}"#
                    .to_string(),
                used_json_mode: true,
            })
        }
        fn model_name(&self) -> &str {
            "stub"
        }
    }

    struct StubTts;
    #[async_trait]
    impl TtsModel for StubTts {
        async fn synthesize(&self, text: &str, _r: &str, _l: &str) -> Result<Waveform, PipelineError> {
            Ok(Waveform::silence((text.len() as f32 / 20.0).max(0.1), 16_000))
        }
        fn native_sample_rate(&self) -> u32 {
            16_000
        }
        fn model_name(&self) -> &str {
            "stub"
        }
    }

    struct StubCoeff;
    #[async_trait]
    impl videogen_core::CoefficientModel for StubCoeff {
        async fn generate_coeffs(&self, _a: &str, _r: &str) -> Result<CoefficientBundle, PipelineError> {
            Ok(CoefficientBundle::compact(
                ndarray::Array2::zeros((5, 8)),
                FormatDescriptor {
                    model_name: "stub".to_string(),
                    model_version: "0".to_string(),
                },
            ))
        }
        fn model_name(&self) -> &str {
            "stub"
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
            "stub"
        }
    }

    fn test_state(output_dir: &std::path::Path) -> AppState {
        let registry = Arc::new(ModelRegistry::new(
            Arc::new(StubScript),
            Arc::new(StubTts),
            Arc::new(StubCoeff),
            Arc::new(StubRender),
        ));
        let orchestrator = Arc::new(videogen_pipeline::PipelineOrchestrator::new(
            registry,
            videogen_config::PersonaRegistry::builtin(),
            output_dir,
        ));
        let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
            .build_recorder()
            .handle();
        AppState::new(orchestrator, Arc::new(videogen_config::Settings::default()), metrics_handle)
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(dir.path()));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn generate_rejects_empty_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(dir.path()));
        let body = serde_json::json!({"prompt": "", "persona": "mkbhd"});
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/generate")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn generate_rejects_unknown_persona() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(dir.path()));
        let body = serde_json::json!({"prompt": "hello", "persona": "nobody"});
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/generate")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn generate_succeeds_with_stub_backends() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(dir.path()));
        let body = serde_json::json!({"prompt": "Tell me about the new phone.", "persona": "mkbhd"});
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/generate")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn styles_lists_three_presets() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(dir.path()));
        let response = app
            .oneshot(Request::builder().uri("/api/styles").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

//! `videogen-server` entry point: loads settings, wires the model registry
//! to concrete backends, and serves the HTTP front-end.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use videogen_config::{load_settings, PersonaRegistry, Settings};
use videogen_llm::{ClaudeScriptModel, ClaudeScriptModelConfig};
use videogen_pipeline::{
    FfmpegRenderModel, HttpCoefficientModel, HttpTtsModel, ModelRegistry, PipelineOrchestrator,
};
use videogen_server::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = std::env::var("VIDEOGEN_ENV").ok();
    let settings = match load_settings(env.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("failed to load configuration ({e}), using defaults");
            Settings::default()
        }
    };

    init_tracing(&settings);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?settings.environment,
        "starting videogen-server"
    );

    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;

    let script_model = Arc::new(
        ClaudeScriptModel::new(ClaudeScriptModelConfig {
            api_key: settings.models.llm_api_key.clone(),
            model: settings.models.llm_model.clone(),
            endpoint: settings.models.llm_endpoint.clone(),
            timeout: Duration::from_secs(60),
        })
        .context("failed to configure the LLM script model")?,
    );
    let tts_model = Arc::new(HttpTtsModel::new(
        settings.models.tts_endpoint.clone(),
        settings.models.tts_model.clone(),
        settings.models.tts_native_sample_rate,
    ));
    let coeff_model = Arc::new(HttpCoefficientModel::new(
        settings.models.coeff_endpoint.clone(),
        settings.models.coeff_model.clone(),
    ));
    let render_model = Arc::new(FfmpegRenderModel::new(
        settings.models.render_endpoint.clone(),
        settings.models.render_model.clone(),
    ));

    let registry = Arc::new(ModelRegistry::new(script_model, tts_model, coeff_model, render_model));

    let persona_registry = PersonaRegistry::load(&settings.persona_registry_path).unwrap_or_else(|e| {
        tracing::warn!(
            error = %e,
            path = %settings.persona_registry_path,
            "persona registry file not found or invalid, using built-in defaults"
        );
        PersonaRegistry::builtin()
    });

    std::fs::create_dir_all(&settings.output.output_dir)
        .context("failed to create the output directory")?;

    let orchestrator = Arc::new(PipelineOrchestrator::new(
        registry,
        persona_registry,
        settings.output.output_dir.clone(),
    ));

    let settings = Arc::new(settings);
    let state = AppState::new(orchestrator, settings.clone(), metrics_handle);
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("invalid server host/port configuration")?;
    tracing::info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

fn init_tracing(settings: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "videogen=info,tower_http=info".into());

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if settings.environment.is_production() {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}

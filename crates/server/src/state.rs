//! Shared application state handed to every HTTP handler.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use videogen_config::Settings;
use videogen_pipeline::PipelineOrchestrator;

/// Everything a handler needs: the orchestrator (which already owns the
/// model registry and persona registry), the settings it was built from
/// (the config surface `/api/styles` reads default fps/resolution/preset
/// from), and the process-wide Prometheus recorder handle installed once
/// at startup.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<PipelineOrchestrator>,
    pub settings: Arc<Settings>,
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<PipelineOrchestrator>,
        settings: Arc<Settings>,
        metrics_handle: PrometheusHandle,
    ) -> Self {
        Self {
            orchestrator,
            settings,
            metrics_handle,
        }
    }
}

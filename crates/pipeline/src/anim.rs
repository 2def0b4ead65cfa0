//! Face-animation model adapters: the coefficient source (C4) and renderer
//! (C6), both thin wrappers around an external model runtime reached over
//! HTTP or a CLI shell-out, never an in-process tensor call.

use std::process::Command;
use std::time::Duration;

use async_trait::async_trait;
use ndarray::Array2;
use serde::Deserialize;

use videogen_core::{
    CoefficientBundle, CoefficientModel, FormatDescriptor, PipelineError, RenderModel,
    RenderOptions,
};

/// HTTP-backed `CoefficientModel`: posts the synthesized audio and a
/// reference portrait to a face-animation model server and parses back a
/// `T x D` coefficient table. No internal seeding or smoothing happens
/// here; that is the governor's job.
#[derive(Debug, Clone)]
pub struct HttpCoefficientModel {
    endpoint: String,
    model_name: String,
    client: reqwest::Client,
}

impl HttpCoefficientModel {
    pub fn new(endpoint: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model_name: model_name.into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("reqwest client builder should not fail with only a timeout set"),
        }
    }
}

#[derive(Deserialize)]
struct CoeffResponse {
    /// Row-major `T x D` flat buffer.
    data: Vec<f32>,
    frame_count: usize,
    channel_count: usize,
}

#[async_trait]
impl CoefficientModel for HttpCoefficientModel {
    async fn generate_coeffs(
        &self,
        audio_path: &str,
        reference_image: &str,
    ) -> Result<CoefficientBundle, PipelineError> {
        let response = self
            .client
            .post(format!("{}/generate_coeffs", self.endpoint))
            .query(&[("audio_path", audio_path), ("reference_image", reference_image)])
            .send()
            .await
            .map_err(|e| PipelineError::UpstreamUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::UpstreamUnavailable(format!(
                "coefficient model returned HTTP {status}: {body}"
            )));
        }

        let parsed: CoeffResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::UpstreamUnavailable(e.to_string()))?;

        if parsed.data.len() != parsed.frame_count * parsed.channel_count {
            return Err(PipelineError::UpstreamUnavailable(format!(
                "coefficient model returned {} values for a declared {}x{} shape",
                parsed.data.len(),
                parsed.frame_count,
                parsed.channel_count
            )));
        }

        let data = Array2::from_shape_vec((parsed.frame_count, parsed.channel_count), parsed.data)
            .map_err(|e| PipelineError::UpstreamUnavailable(e.to_string()))?;

        let format = FormatDescriptor {
            model_name: self.model_name.clone(),
            model_version: "remote".to_string(),
        };

        Ok(CoefficientBundle::compact(data, format))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Shells out to `ffmpeg` to mux a rendered silent-video frame sequence (or
/// an already-rendered clip, depending on the backing model) with the
/// spoken audio track. The actual coefficient-to-pixel rendering is assumed
/// to have happened upstream via `render_endpoint`; this adapter's own
/// responsibility is fetching that render and muxing it with audio, the
/// same division drawn between model inference
/// and the CLI tool it shells out to for format conversion.
#[derive(Debug, Clone)]
pub struct FfmpegRenderModel {
    render_endpoint: String,
    model_name: String,
    client: reqwest::Client,
}

impl FfmpegRenderModel {
    pub fn new(render_endpoint: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            render_endpoint: render_endpoint.into(),
            model_name: model_name.into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(600))
                .build()
                .expect("reqwest client builder should not fail with only a timeout set"),
        }
    }
}

#[async_trait]
impl RenderModel for FfmpegRenderModel {
    async fn render(
        &self,
        bundle: &CoefficientBundle,
        reference_image: &str,
        audio_path: &str,
        output_path: &str,
        options: RenderOptions,
    ) -> Result<String, PipelineError> {
        let coeffs_json = serde_json::to_string(&CoeffsUpload {
            data: bundle.data().iter().copied().collect(),
            frame_count: bundle.frame_count(),
            channel_count: bundle.channel_count(),
        })?;

        let query_params = [
            ("reference_image".to_string(), reference_image.to_string()),
            ("fps".to_string(), options.fps.to_string()),
            ("resolution".to_string(), options.resolution.to_string()),
            ("enhance".to_string(), options.enhance.to_string()),
        ];

        let response = self
            .client
            .post(format!("{}/render", self.render_endpoint))
            .query(&query_params)
            .body(coeffs_json)
            .header("content-type", "application/json")
            .send()
            .await
            .map_err(|e| PipelineError::UpstreamUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::UpstreamUnavailable(format!(
                "render model returned HTTP {status}: {body}"
            )));
        }

        let silent_video_bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::UpstreamUnavailable(e.to_string()))?;

        let tmp_silent = tempfile::Builder::new()
            .suffix(".mp4")
            .tempfile()
            .map_err(PipelineError::Io)?;
        std::fs::write(tmp_silent.path(), &silent_video_bytes).map_err(PipelineError::Io)?;

        mux_audio(tmp_silent.path(), audio_path, output_path)?;

        Ok(output_path.to_string())
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[derive(serde::Serialize)]
struct CoeffsUpload {
    data: Vec<f32>,
    frame_count: usize,
    channel_count: usize,
}

/// `ffmpeg -y -i <video> -i <audio> -c:v copy -c:a aac -shortest <output>`,
/// the same shell-out-and-check-exit-status pattern the other adapters
/// use for their native runtime calls.
fn mux_audio(
    video_path: &std::path::Path,
    audio_path: &str,
    output_path: &str,
) -> Result<(), PipelineError> {
    let status = Command::new("ffmpeg")
        .args([
            "-y",
            "-i",
            &video_path.display().to_string(),
            "-i",
            audio_path,
            "-c:v",
            "copy",
            "-c:a",
            "aac",
            "-shortest",
            output_path,
        ])
        .status()
        .map_err(|e| PipelineError::Artifact(format!("failed to spawn ffmpeg: {e}")))?;

    if !status.success() {
        return Err(PipelineError::Artifact(format!(
            "ffmpeg mux exited with status {status}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_coefficient_model_reports_its_name() {
        let model = HttpCoefficientModel::new("http://localhost:9000", "sadtalker-like");
        assert_eq!(model.model_name(), "sadtalker-like");
    }

    #[test]
    fn ffmpeg_render_model_reports_its_name() {
        let model = FfmpegRenderModel::new("http://localhost:9001", "render-backend");
        assert_eq!(model.model_name(), "render-backend");
    }
}

//! `TtsModel` adapter (C3's external collaborator): a thin HTTP client over
//! a cloned-voice text-to-speech model server, the same request/response
//! shape as [`crate::anim::HttpCoefficientModel`] — this pipeline talks to
//! every external model runtime the same way.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use videogen_core::{PipelineError, TtsModel, Waveform};

use crate::synth::TtsSamplingParams;

/// Posts shaped text and a reference-audio path to a TTS model server and
/// parses back a mono PCM waveform at the model's native sample rate. The
/// deterministic sampling parameters are attached to every
/// request; the synthesizer never varies them per call.
#[derive(Debug, Clone)]
pub struct HttpTtsModel {
    endpoint: String,
    model_name: String,
    native_sample_rate: u32,
    sampling: TtsSamplingParams,
    client: reqwest::Client,
}

impl HttpTtsModel {
    pub fn new(endpoint: impl Into<String>, model_name: impl Into<String>, native_sample_rate: u32) -> Self {
        Self {
            endpoint: endpoint.into(),
            model_name: model_name.into(),
            native_sample_rate,
            sampling: TtsSamplingParams::default(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("reqwest client builder should not fail with only a timeout set"),
        }
    }
}

#[derive(serde::Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
    reference_audio: &'a str,
    language: &'a str,
    temperature: f32,
    repetition_penalty: f32,
    top_p: f32,
}

#[derive(Deserialize)]
struct SynthesizeResponse {
    samples: Vec<f32>,
    sample_rate: u32,
}

#[async_trait]
impl TtsModel for HttpTtsModel {
    async fn synthesize(
        &self,
        text: &str,
        reference_audio: &str,
        language: &str,
    ) -> Result<Waveform, PipelineError> {
        let body = SynthesizeRequest {
            text,
            reference_audio,
            language,
            temperature: self.sampling.temperature,
            repetition_penalty: self.sampling.repetition_penalty,
            top_p: self.sampling.top_p,
        };

        let response = self
            .client
            .post(format!("{}/synthesize", self.endpoint))
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::UpstreamUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PipelineError::UpstreamUnavailable(format!(
                "tts model returned HTTP {status}: {text}"
            )));
        }

        let parsed: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::UpstreamUnavailable(e.to_string()))?;

        Ok(Waveform {
            samples: parsed.samples,
            sample_rate: parsed.sample_rate,
        })
    }

    fn native_sample_rate(&self) -> u32 {
        self.native_sample_rate
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_configured_name_and_sample_rate() {
        let model = HttpTtsModel::new("http://localhost:9100", "xtts-like", 24_000);
        assert_eq!(model.model_name(), "xtts-like");
        assert_eq!(model.native_sample_rate(), 24_000);
    }
}

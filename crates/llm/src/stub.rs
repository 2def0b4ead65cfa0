//! Deterministic `ScriptModel` stand-in for tests: returns canned responses
//! from a queue, one per call, in order.

use std::sync::Mutex;

use async_trait::async_trait;
use videogen_core::{PipelineError, RawCompletion, ScriptModel, ScriptRequest};

pub struct StubScriptModel {
    responses: Mutex<Vec<StubResponse>>,
}

pub enum StubResponse {
    Text(String),
    Fail(String),
}

impl StubScriptModel {
    /// Responses are consumed front-to-back, one per `complete` call. The
    /// last response is reused once the queue is drained, so a single
    /// canned response is enough for a test that expects exactly one call.
    pub fn new(responses: Vec<StubResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
        }
    }

    pub fn single(text: impl Into<String>) -> Self {
        Self::new(vec![StubResponse::Text(text.into())])
    }
}

#[async_trait]
impl ScriptModel for StubScriptModel {
    async fn complete(&self, request: &ScriptRequest) -> Result<RawCompletion, PipelineError> {
        let mut queue = self.responses.lock().unwrap();
        let response = if queue.len() > 1 {
            queue.remove(0)
        } else {
            match queue.first() {
                Some(StubResponse::Text(t)) => StubResponse::Text(t.clone()),
                Some(StubResponse::Fail(m)) => StubResponse::Fail(m.clone()),
                None => StubResponse::Text(String::new()),
            }
        };
        match response {
            StubResponse::Text(text) => Ok(RawCompletion {
                text,
                used_json_mode: request.force_json,
            }),
            StubResponse::Fail(msg) => Err(PipelineError::UpstreamUnavailable(msg)),
        }
    }

    fn model_name(&self) -> &str {
        "stub-script-model"
    }
}

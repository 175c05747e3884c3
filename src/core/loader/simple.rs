use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::core::types::{InferenceRequest, InferenceResult, ModelId, StreamChunk, TokenUsage};
use crate::utils::error::{OrchestratorError, Result};

use super::{Loader, LoaderCapabilities};

/// Reference loader that echoes the prompt back after a configurable
/// latency, with optional deterministic failure injection. Used by the
/// in-process demos and as a building block for integration tests that need
/// a believable but controllable backend.
pub struct SimpleLoader {
    model_id: ModelId,
    latency: Duration,
    fail_every_n: Option<u32>,
    calls: std::sync::atomic::AtomicU32,
}

impl SimpleLoader {
    pub fn new(model_id: impl Into<ModelId>, latency: Duration) -> Self {
        Self {
            model_id: model_id.into(),
            latency,
            fail_every_n: None,
            calls: std::sync::atomic::AtomicU32::new(0),
        }
    }

    pub fn with_failure_injection(mut self, fail_every_n: u32) -> Self {
        self.fail_every_n = Some(fail_every_n);
        self
    }

    fn should_fail(&self) -> bool {
        let Some(n) = self.fail_every_n else {
            return false;
        };
        let call = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
        n != 0 && call % n == 0
    }
}

#[async_trait]
impl Loader for SimpleLoader {
    async fn probe(&self) -> Result<bool> {
        Ok(true)
    }

    async fn load(&self) -> Result<()> {
        Ok(())
    }

    async fn infer(&self, request: &InferenceRequest) -> Result<InferenceResult> {
        let start = Instant::now();
        sleep(self.latency).await;
        if self.should_fail() {
            return Err(OrchestratorError::InferenceFailure {
                model_id: self.model_id.clone(),
                message: "simulated transient failure".into(),
            });
        }
        let text = format!("{}: {}", self.model_id, request.prompt);
        Ok(InferenceResult {
            request_id: request.id,
            model_id: self.model_id.clone(),
            text,
            usage: TokenUsage {
                prompt_tokens: request.prompt.split_whitespace().count() as u32,
                completion_tokens: 4,
            },
            latency_ms: start.elapsed().as_millis() as u64,
            cache_hit: false,
            attempts: 1,
        })
    }

    async fn infer_stream(
        &self,
        request: &InferenceRequest,
        tx: mpsc::Sender<StreamChunk>,
    ) -> Result<()> {
        let words: Vec<&str> = request.prompt.split_whitespace().collect();
        for (i, word) in words.iter().enumerate() {
            sleep(self.latency / (words.len().max(1) as u32)).await;
            let chunk = StreamChunk {
                request_id: request.id,
                sequence: i as u64,
                delta: format!("{word} "),
                finished: i + 1 == words.len(),
            };
            if tx.send(chunk).await.is_err() {
                return Err(OrchestratorError::Cancelled);
            }
        }
        Ok(())
    }

    fn describe(&self) -> LoaderCapabilities {
        LoaderCapabilities {
            streaming: true,
            batching: false,
            function_calling: false,
        }
    }
}

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::types::{InferenceRequest, InferenceResult, ModelId, StreamChunk, TokenUsage};
use crate::utils::error::{OrchestratorError, Result};

use super::{Loader, LoaderCapabilities};

/// Deterministic loader for tests: reverses the prompt text so assertions
/// don't depend on timing or randomness.
pub struct MockLoader {
    model_id: ModelId,
    always_fail: bool,
}

impl MockLoader {
    pub fn new(model_id: impl Into<ModelId>) -> Self {
        Self {
            model_id: model_id.into(),
            always_fail: false,
        }
    }

    pub fn always_failing(model_id: impl Into<ModelId>) -> Self {
        Self {
            model_id: model_id.into(),
            always_fail: true,
        }
    }
}

#[async_trait]
impl Loader for MockLoader {
    async fn load(&self) -> Result<()> {
        Ok(())
    }

    async fn infer(&self, request: &InferenceRequest) -> Result<InferenceResult> {
        if self.always_fail {
            return Err(OrchestratorError::InferenceFailure {
                model_id: self.model_id.clone(),
                message: "mock loader configured to always fail".into(),
            });
        }
        let text: String = request.prompt.chars().rev().collect();
        Ok(InferenceResult {
            request_id: request.id,
            model_id: self.model_id.clone(),
            text,
            usage: TokenUsage {
                prompt_tokens: request.prompt.len() as u32,
                completion_tokens: request.prompt.len() as u32,
            },
            latency_ms: 1,
            cache_hit: false,
            attempts: 1,
        })
    }

    async fn infer_stream(
        &self,
        request: &InferenceRequest,
        tx: mpsc::Sender<StreamChunk>,
    ) -> Result<()> {
        if self.always_fail {
            return Err(OrchestratorError::InferenceFailure {
                model_id: self.model_id.clone(),
                message: "mock loader configured to always fail".into(),
            });
        }
        let reversed: String = request.prompt.chars().rev().collect();
        let chunk = StreamChunk {
            request_id: request.id,
            sequence: 0,
            delta: reversed,
            finished: true,
        };
        tx.send(chunk)
            .await
            .map_err(|_| OrchestratorError::Cancelled)
    }

    fn describe(&self) -> LoaderCapabilities {
        LoaderCapabilities {
            streaming: true,
            batching: false,
            function_calling: false,
        }
    }
}

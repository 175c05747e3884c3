//! Request coalescing (§4.6): concurrent identical requests (same
//! fingerprint) share a single in-flight computation instead of hitting the
//! backend N times.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::core::types::InferenceResult;
use crate::utils::error::{OrchestratorError, Result};

pub struct SingleFlight {
    inflight: DashMap<String, broadcast::Sender<InferenceResultOrError>>,
}

#[derive(Clone)]
enum InferenceResultOrError {
    Ok(Arc<InferenceResult>),
    Err(String),
}

impl Default for SingleFlight {
    fn default() -> Self {
        Self::new()
    }
}

impl SingleFlight {
    pub fn new() -> Self {
        Self {
            inflight: DashMap::new(),
        }
    }

    /// Run `build` for the given fingerprint, or subscribe to the result of
    /// an already in-flight build for the same fingerprint. Only one caller
    /// per fingerprint actually invokes `build`; the rest await its result.
    pub async fn execute<F, Fut>(&self, fingerprint: &str, build: F) -> Result<Arc<InferenceResult>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<InferenceResult>>,
    {
        if let Some(sender) = self.inflight.get(fingerprint) {
            let mut rx = sender.subscribe();
            drop(sender);
            return match rx.recv().await {
                Ok(InferenceResultOrError::Ok(result)) => Ok(result),
                Ok(InferenceResultOrError::Err(message)) => Err(OrchestratorError::InferenceFailure {
                    model_id: "unknown".into(),
                    message,
                }),
                Err(_) => Err(OrchestratorError::BuilderCancelled {
                    fingerprint: fingerprint.to_string(),
                }),
            };
        }

        let (tx, _rx) = broadcast::channel(1);
        self.inflight.insert(fingerprint.to_string(), tx.clone());

        let outcome = build().await;
        self.inflight.remove(fingerprint);

        match outcome {
            Ok(result) => {
                let shared = Arc::new(result);
                let _ = tx.send(InferenceResultOrError::Ok(shared.clone()));
                Ok(shared)
            }
            Err(err) => {
                let _ = tx.send(InferenceResultOrError::Err(err.to_string()));
                Err(err)
            }
        }
    }

    pub fn inflight_count(&self) -> usize {
        self.inflight.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::TokenUsage;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_identical_requests_share_one_build() {
        let sf = Arc::new(SingleFlight::new());
        let build_count = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let sf = sf.clone();
            let build_count = build_count.clone();
            handles.push(tokio::spawn(async move {
                sf.execute("fp-1", || async {
                    build_count.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(InferenceResult {
                        request_id: uuid::Uuid::new_v4(),
                        model_id: "m1".into(),
                        text: "hi".into(),
                        usage: TokenUsage {
                            prompt_tokens: 1,
                            completion_tokens: 1,
                        },
                        latency_ms: 20,
                        cache_hit: false,
                        attempts: 1,
                    })
                })
                .await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(build_count.load(Ordering::SeqCst), 1);
    }
}

//! Loader trait (§4.4), generalized from the teacher's `LLMProvider` trait
//! shape: an async-trait object behind `Arc<dyn Loader>`, swappable per
//! model without the dispatcher knowing the concrete backend.

pub mod mock;
pub mod simple;

pub use mock::MockLoader;
pub use simple::SimpleLoader;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::core::types::{InferenceRequest, InferenceResult, StreamChunk};
use crate::utils::error::Result;

/// Supported feature flags for a loaded model, reported by `Loader::describe`
/// (§4.4): lets the router/dispatcher skip capability-incompatible loaders
/// without attempting and failing an inference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoaderCapabilities {
    pub streaming: bool,
    pub batching: bool,
    pub function_calling: bool,
}

/// Backend capable of running inference for one model. Implementations wrap
/// whatever concrete engine (local weights, remote API, simulator) actually
/// produces tokens; the dispatcher only ever sees this trait.
#[async_trait]
pub trait Loader: Send + Sync {
    /// Cheap, side-effect-free check that this loader can currently serve
    /// its model (§4.4). Called before `load()` to fail fast on an
    /// unreachable backend without paying load's cost; default assumes the
    /// loader is reachable.
    async fn probe(&self) -> Result<bool> {
        Ok(true)
    }

    /// Load/warm the model. Called once before the model transitions to
    /// `Lifecycle::Ready`.
    async fn load(&self) -> Result<()>;

    /// Run a complete (non-streaming) inference.
    async fn infer(&self, request: &InferenceRequest) -> Result<InferenceResult>;

    /// Run a streaming inference, pushing chunks onto `tx` until finished or
    /// the receiver is dropped (cancellation).
    async fn infer_stream(
        &self,
        request: &InferenceRequest,
        tx: mpsc::Sender<StreamChunk>,
    ) -> Result<()>;

    /// Release any resources held by this loader. Called on unload.
    async fn unload(&self) -> Result<()> {
        Ok(())
    }

    /// Declare supported features (§4.4). Default: no optional features.
    fn describe(&self) -> LoaderCapabilities {
        LoaderCapabilities::default()
    }
}

pub type SharedLoader = Arc<dyn Loader>;

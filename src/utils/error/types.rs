//! Error taxonomy for the orchestration core
//!
//! One variant per §4.8 error kind. Every variant carries enough to build the
//! `{kind, message, retriable, model_id, request_id}` surfaced-error shape
//! without re-deriving policy at the call site.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Stable machine-readable error kind, surfaced verbatim to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    BadRequest,
    ModelUnavailable,
    ResourceBusy,
    Timeout,
    InferenceFailure,
    OutOfMemory,
    ModelCorrupt,
    Cancelled,
    Internal,
    AlreadyExists,
    NoCandidates,
    AllOpen,
    BuilderCancelled,
    EnsembleQuorumFailed,
}

impl ErrorKind {
    /// Whether the dispatcher should attempt a retry/fallback for this kind.
    pub fn retriable(self) -> bool {
        matches!(
            self,
            ErrorKind::ModelUnavailable
                | ErrorKind::ResourceBusy
                | ErrorKind::Timeout
                | ErrorKind::InferenceFailure
                | ErrorKind::AllOpen
        )
    }
}

/// Main error type for the orchestration core.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("bad request: {message}")]
    BadRequest { message: String },

    #[error("model unavailable: {model_id}")]
    ModelUnavailable { model_id: String },

    #[error("resource busy: {message}")]
    ResourceBusy { message: String },

    #[error("timeout: {message}")]
    Timeout { message: String },

    #[error("inference failure on {model_id}: {message}")]
    InferenceFailure { model_id: String, message: String },

    #[error("out of memory: {message}")]
    OutOfMemory { message: String },

    #[error("model corrupt: {model_id}")]
    ModelCorrupt { model_id: String },

    #[error("cancelled")]
    Cancelled,

    #[error("internal error: {message}")]
    Internal { message: String },

    #[error("already exists: {id}")]
    AlreadyExists { id: String },

    #[error("no candidates satisfy requirements")]
    NoCandidates,

    #[error("all candidates circuit-open")]
    AllOpen,

    #[error("single-flight builder cancelled for fingerprint {fingerprint}")]
    BuilderCancelled { fingerprint: String },

    #[error("ensemble quorum failed: {available_weight:.2} of required {required_weight:.2}")]
    EnsembleQuorumFailed { available_weight: f64, required_weight: f64 },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl OrchestratorError {
    /// Stable machine-readable kind for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrchestratorError::BadRequest { .. } => ErrorKind::BadRequest,
            OrchestratorError::ModelUnavailable { .. } => ErrorKind::ModelUnavailable,
            OrchestratorError::ResourceBusy { .. } => ErrorKind::ResourceBusy,
            OrchestratorError::Timeout { .. } => ErrorKind::Timeout,
            OrchestratorError::InferenceFailure { .. } => ErrorKind::InferenceFailure,
            OrchestratorError::OutOfMemory { .. } => ErrorKind::OutOfMemory,
            OrchestratorError::ModelCorrupt { .. } => ErrorKind::ModelCorrupt,
            OrchestratorError::Cancelled => ErrorKind::Cancelled,
            OrchestratorError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            OrchestratorError::NoCandidates => ErrorKind::NoCandidates,
            OrchestratorError::AllOpen => ErrorKind::AllOpen,
            OrchestratorError::BuilderCancelled { .. } => ErrorKind::BuilderCancelled,
            OrchestratorError::EnsembleQuorumFailed { .. } => ErrorKind::EnsembleQuorumFailed,
            OrchestratorError::Config(_)
            | OrchestratorError::Io(_)
            | OrchestratorError::Serialization(_)
            | OrchestratorError::Yaml(_) => ErrorKind::Internal,
            OrchestratorError::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Whether this error is retriable per the §4.8 policy table.
    pub fn retriable(&self) -> bool {
        self.kind().retriable()
    }

    /// The model id this error pertains to, if any.
    pub fn model_id(&self) -> Option<&str> {
        match self {
            OrchestratorError::ModelUnavailable { model_id }
            | OrchestratorError::InferenceFailure { model_id, .. }
            | OrchestratorError::ModelCorrupt { model_id } => Some(model_id),
            _ => None,
        }
    }

    /// Convert to the wire-agnostic surfaced-error shape (§7).
    pub fn to_surfaced(&self, request_id: impl Into<String>) -> SurfacedError {
        SurfacedError {
            kind: self.kind(),
            message: self.to_string(),
            retriable: self.retriable(),
            model_id: self.model_id().map(str::to_owned),
            request_id: request_id.into(),
        }
    }
}

/// Wire-agnostic error shape surfaced to callers (§7).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SurfacedError {
    pub kind: ErrorKind,
    pub message: String,
    pub retriable: bool,
    pub model_id: Option<String>,
    pub request_id: String,
}

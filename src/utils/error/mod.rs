pub mod recovery;
pub mod types;

pub use types::{ErrorKind, OrchestratorError, Result, SurfacedError};

//! Error handling policy (§4.8): decides, for a given error, whether the
//! dispatcher should retry the same model, fall back to the next candidate,
//! or surface the error immediately.

use crate::config::ResilienceConfig;
use crate::utils::error::OrchestratorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    RetrySameModel,
    FallbackToNext,
    Surface,
}

pub struct ErrorHandler {
    config: ResilienceConfig,
}

impl ErrorHandler {
    pub fn new(config: ResilienceConfig) -> Self {
        Self { config }
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// Decide what to do next given the error and how many attempts have
    /// already been made against the current model.
    pub fn classify(&self, error: &OrchestratorError, attempts_so_far: u32) -> Disposition {
        // These two kinds never warrant retrying the same model: a corrupt
        // model won't un-corrupt itself, and an out-of-memory model can't
        // accept the same request again until something else is evicted.
        // Route straight to the next candidate regardless of `retriable()`.
        if matches!(
            error,
            OrchestratorError::ModelCorrupt { .. } | OrchestratorError::OutOfMemory { .. }
        ) {
            return Disposition::FallbackToNext;
        }

        if !error.retriable() {
            return Disposition::Surface;
        }
        match error {
            OrchestratorError::ModelUnavailable { .. } | OrchestratorError::AllOpen => {
                Disposition::FallbackToNext
            }
            _ if attempts_so_far < self.config.max_attempts => Disposition::RetrySameModel,
            _ => Disposition::FallbackToNext,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_retriable_surfaces_immediately() {
        let handler = ErrorHandler::new(ResilienceConfig::default());
        let error = OrchestratorError::BadRequest {
            message: "bad".into(),
        };
        assert_eq!(handler.classify(&error, 0), Disposition::Surface);
    }

    #[test]
    fn transient_retries_then_falls_back() {
        let handler = ErrorHandler::new(ResilienceConfig {
            max_attempts: 2,
            ..Default::default()
        });
        let error = OrchestratorError::Timeout {
            message: "slow".into(),
        };
        assert_eq!(handler.classify(&error, 0), Disposition::RetrySameModel);
        assert_eq!(handler.classify(&error, 2), Disposition::FallbackToNext);
    }

    #[test]
    fn unavailable_falls_back_immediately() {
        let handler = ErrorHandler::new(ResilienceConfig::default());
        let error = OrchestratorError::ModelUnavailable {
            model_id: "m1".into(),
        };
        assert_eq!(handler.classify(&error, 0), Disposition::FallbackToNext);
    }

    #[test]
    fn model_corrupt_falls_back_even_on_first_attempt() {
        let handler = ErrorHandler::new(ResilienceConfig::default());
        let error = OrchestratorError::ModelCorrupt {
            model_id: "m1".into(),
        };
        assert_eq!(handler.classify(&error, 0), Disposition::FallbackToNext);
    }

    #[test]
    fn out_of_memory_falls_back_even_on_first_attempt() {
        let handler = ErrorHandler::new(ResilienceConfig::default());
        let error = OrchestratorError::OutOfMemory {
            message: "no room".into(),
        };
        assert_eq!(handler.classify(&error, 0), Disposition::FallbackToNext);
    }
}

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::model::ModelId;
use crate::utils::error::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// How many latency samples `HealthRecord::latency_samples` retains; old
/// samples fall off the front as new ones are pushed.
pub const LATENCY_WINDOW: usize = 50;

/// How many recent outcomes `HealthRecord::success_rate_window` is computed
/// over, distinct from the all-time `success_count`/`failure_count` totals.
pub const OUTCOME_WINDOW: usize = 20;

/// Point-in-time health snapshot for a model, maintained by the self-healing
/// monitor (§3.1, §4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthRecord {
    pub model_id: ModelId,
    pub status: HealthStatus,
    pub consecutive_failures: u32,
    pub success_count: u64,
    pub failure_count: u64,
    /// Rolling window of the last `LATENCY_WINDOW` inference latencies, most
    /// recent last.
    pub latency_samples: VecDeque<u64>,
    /// Rolling window of the last `OUTCOME_WINDOW` outcomes (`true` =
    /// success), backing `success_rate_window`.
    #[serde(skip)]
    pub outcome_window: VecDeque<bool>,
    pub success_rate_window: f64,
    pub last_error_class: Option<ErrorKind>,
    pub last_checked: chrono::DateTime<chrono::Utc>,
}

impl HealthRecord {
    pub fn new(model_id: ModelId) -> Self {
        Self {
            model_id,
            status: HealthStatus::Healthy,
            consecutive_failures: 0,
            success_count: 0,
            failure_count: 0,
            latency_samples: VecDeque::with_capacity(LATENCY_WINDOW),
            outcome_window: VecDeque::with_capacity(OUTCOME_WINDOW),
            success_rate_window: 1.0,
            last_error_class: None,
            last_checked: chrono::Utc::now(),
        }
    }

    pub fn push_latency(&mut self, latency_ms: u64) {
        if self.latency_samples.len() == LATENCY_WINDOW {
            self.latency_samples.pop_front();
        }
        self.latency_samples.push_back(latency_ms);
    }

    pub fn average_latency_ms(&self) -> f64 {
        if self.latency_samples.is_empty() {
            return 0.0;
        }
        self.latency_samples.iter().sum::<u64>() as f64 / self.latency_samples.len() as f64
    }

    /// Push an outcome into the rolling window and recompute
    /// `success_rate_window` from it.
    pub fn push_outcome(&mut self, success: bool) {
        if self.outcome_window.len() == OUTCOME_WINDOW {
            self.outcome_window.pop_front();
        }
        self.outcome_window.push_back(success);
        let successes = self.outcome_window.iter().filter(|s| **s).count();
        self.success_rate_window = successes as f64 / self.outcome_window.len() as f64;
    }
}

use crate::utils::error::{OrchestratorError, Result};

use super::models::OrchestratorConfig;

/// Validate invariants that can't be expressed in the type system alone.
/// Called once at construction so a misconfigured process fails fast.
pub fn validate(config: &OrchestratorConfig) -> Result<()> {
    let r = &config.router;
    let weight_sum = r.weight_latency + r.weight_cost + r.weight_load;
    if (weight_sum - 1.0).abs() > 0.01 {
        return Err(OrchestratorError::Config(format!(
            "router weights must sum to 1.0, got {weight_sum}"
        )));
    }
    if r.weight_latency < 0.0 || r.weight_cost < 0.0 || r.weight_load < 0.0 {
        return Err(OrchestratorError::Config(
            "router weights must be non-negative".into(),
        ));
    }

    let m = &config.memory;
    if m.high_water_mark_ratio <= 0.0 || m.high_water_mark_ratio > 1.0 {
        return Err(OrchestratorError::Config(
            "memory.high_water_mark_ratio must be in (0, 1]".into(),
        ));
    }
    if m.total_budget_mb == 0 {
        return Err(OrchestratorError::Config(
            "memory.total_budget_mb must be greater than zero".into(),
        ));
    }

    let res = &config.resilience;
    if res.failure_threshold == 0 {
        return Err(OrchestratorError::Config(
            "resilience.failure_threshold must be greater than zero".into(),
        ));
    }
    if res.max_cooldown_ms < res.cooldown_ms {
        return Err(OrchestratorError::Config(
            "resilience.max_cooldown_ms must be >= cooldown_ms".into(),
        ));
    }

    Ok(())
}

//! Multi-feature scoring (§4.2): normalize latency/cost/load/quality/recent
//! failure rate across candidates then combine with configured weights.
//! Lower latency, lower cost, lower load, and lower recent failure rate all
//! score better; higher quality, a matching capability tag, and a matching
//! response-format preference all score better too.

use std::collections::HashMap;

use crate::config::RouterConfig;
use crate::core::types::{InferenceRequest, ModelId, ModelRecord};

pub struct ScoredCandidate {
    pub record: ModelRecord,
    pub score: f64,
}

const PREFERRED_TAGS_KEY: &str = "preferred_tags";
const RESPONSE_FORMAT_KEY: &str = "response_format";
const FORMAT_KEY: &str = "format";

/// Fraction of `request.constraints.required_tags` union metadata
/// `preferred_tags` (comma-separated) that the candidate's tags satisfy.
fn capability_match(record: &ModelRecord, request: &InferenceRequest) -> f64 {
    let mut wanted: Vec<&str> = request.constraints.required_tags.iter().map(String::as_str).collect();
    if let Some(raw) = request.metadata.get(PREFERRED_TAGS_KEY) {
        wanted.extend(raw.split(',').map(str::trim).filter(|t| !t.is_empty()));
    }
    if wanted.is_empty() {
        return 1.0;
    }
    let matched = wanted.iter().filter(|tag| record.model.has_tag(tag)).count();
    matched as f64 / wanted.len() as f64
}

/// Whether the model advertises the response format the request asked for,
/// via request metadata `response_format` vs model metadata `format`.
fn format_preference(record: &ModelRecord, request: &InferenceRequest) -> f64 {
    match request.metadata.get(RESPONSE_FORMAT_KEY) {
        Some(wanted) => match record.model.metadata.get(FORMAT_KEY) {
            Some(actual) if actual == wanted => 1.0,
            Some(_) => 0.0,
            None => 0.0,
        },
        None => 1.0,
    }
}

/// Score and rank candidates, highest score first. Panics-free on an empty
/// slice (returns an empty vec).
pub fn score_candidates(
    candidates: &[ModelRecord],
    config: &RouterConfig,
    request: &InferenceRequest,
    failure_rates: &HashMap<ModelId, f64>,
) -> Vec<ScoredCandidate> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let max_latency = candidates
        .iter()
        .map(|c| c.model.average_latency_ms as f64)
        .fold(f64::MIN, f64::max)
        .max(1.0);
    let max_cost = candidates
        .iter()
        .map(|c| c.model.cost_per_1k_tokens)
        .fold(f64::MIN, f64::max)
        .max(f64::EPSILON);
    let max_load = candidates
        .iter()
        .map(|c| c.active_requests as f64)
        .fold(f64::MIN, f64::max)
        .max(1.0);

    let mut scored: Vec<ScoredCandidate> = candidates
        .iter()
        .map(|record| {
            let latency_norm = 1.0 - (record.model.average_latency_ms as f64 / max_latency);
            let cost_norm = 1.0 - (record.model.cost_per_1k_tokens / max_cost);
            let load_norm = 1.0 - (record.active_requests as f64 / max_load);
            let quality_norm = record.model.quality_score.clamp(0.0, 1.0);
            let failure_rate = failure_rates.get(&record.model.id).copied().unwrap_or(0.0);
            let failure_norm = 1.0 - failure_rate.clamp(0.0, 1.0);
            let capability_norm = capability_match(record, request);
            let format_norm = format_preference(record, request);

            let score = config.weight_latency * latency_norm
                + config.weight_cost * cost_norm
                + config.weight_load * load_norm
                + config.weight_quality * quality_norm
                + config.weight_failure_rate * failure_norm
                + config.weight_capability * capability_norm
                + config.weight_format_preference * format_norm;

            ScoredCandidate {
                record: record.clone(),
                score,
            }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.record.model.id.cmp(&b.record.model.id))
    });
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Lifecycle, Model, Tier};
    use chrono::Utc;

    fn record(id: &str, latency: u32, cost: f64, load: u32) -> ModelRecord {
        ModelRecord {
            model: Model {
                id: id.into(),
                display_name: id.into(),
                tier: Tier::Standard,
                max_context_tokens: 4096,
                cost_per_1k_tokens: cost,
                average_latency_ms: latency,
                quality_score: 0.5,
                memory_footprint_mb: 100,
                priority: 5,
                tags: vec![],
                metadata: Default::default(),
            },
            lifecycle: Lifecycle::Ready,
            active_requests: load,
            registered_at: Utc::now(),
        }
    }

    fn no_failures() -> HashMap<ModelId, f64> {
        HashMap::new()
    }

    #[test]
    fn cheaper_faster_less_loaded_wins() {
        let config = RouterConfig::default();
        let request = InferenceRequest::new("hi");
        let candidates = vec![record("slow", 500, 0.05, 10), record("fast", 50, 0.01, 0)];
        let scored = score_candidates(&candidates, &config, &request, &no_failures());
        assert_eq!(scored[0].record.model.id, "fast");
    }

    #[test]
    fn ties_break_lexically() {
        let config = RouterConfig {
            weight_latency: 1.0,
            weight_cost: 0.0,
            weight_load: 0.0,
            weight_quality: 0.0,
            weight_failure_rate: 0.0,
            weight_capability: 0.0,
            weight_format_preference: 0.0,
            ..RouterConfig::default()
        };
        let request = InferenceRequest::new("hi");
        let candidates = vec![record("b", 100, 0.0, 0), record("a", 100, 0.0, 0)];
        let scored = score_candidates(&candidates, &config, &request, &no_failures());
        assert_eq!(scored[0].record.model.id, "a");
    }

    #[test]
    fn higher_quality_wins_when_only_quality_weighted() {
        let config = RouterConfig {
            weight_latency: 0.0,
            weight_cost: 0.0,
            weight_load: 0.0,
            weight_quality: 1.0,
            weight_failure_rate: 0.0,
            weight_capability: 0.0,
            weight_format_preference: 0.0,
            ..RouterConfig::default()
        };
        let request = InferenceRequest::new("hi");
        let mut low = record("low", 100, 0.01, 0);
        low.model.quality_score = 0.2;
        let mut high = record("high", 100, 0.01, 0);
        high.model.quality_score = 0.9;
        let scored = score_candidates(&[low, high], &config, &request, &no_failures());
        assert_eq!(scored[0].record.model.id, "high");
    }

    #[test]
    fn recent_failures_penalize_score() {
        let config = RouterConfig {
            weight_latency: 0.0,
            weight_cost: 0.0,
            weight_load: 0.0,
            weight_quality: 0.0,
            weight_failure_rate: 1.0,
            weight_capability: 0.0,
            weight_format_preference: 0.0,
            ..RouterConfig::default()
        };
        let request = InferenceRequest::new("hi");
        let mut failure_rates = HashMap::new();
        failure_rates.insert("flaky".to_string(), 0.9);
        let candidates = vec![record("flaky", 100, 0.01, 0), record("steady", 100, 0.01, 0)];
        let scored = score_candidates(&candidates, &config, &request, &failure_rates);
        assert_eq!(scored[0].record.model.id, "steady");
    }
}

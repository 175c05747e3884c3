//! Routing strategy dispatch (§4.2), enum-dispatched per the teacher's
//! `StrategyExecutor`: each variant picks a winner from the scored/filtered
//! candidate list differently.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::seq::SliceRandom;
use rand::thread_rng;

use crate::config::RouterConfig;
use crate::core::types::{InferenceRequest, ModelId, ModelRecord};

use super::scoring::score_candidates;

pub enum Strategy {
    Weighted,
    RoundRobin { counter: AtomicUsize },
    LeastLoaded,
    /// Orders purely by `Model::quality_score`, highest first.
    QualityFirst,
    /// Orders purely by `cost_per_1k_tokens`, cheapest first.
    CostOptimized,
    /// Orders purely by `average_latency_ms`, fastest first.
    SpeedPriority,
    /// Shuffles eligible candidates uniformly at random each call.
    Random,
}

impl Strategy {
    pub fn from_name(name: &str) -> Self {
        match name {
            "round_robin" => Strategy::RoundRobin {
                counter: AtomicUsize::new(0),
            },
            "least_loaded" => Strategy::LeastLoaded,
            "quality_first" => Strategy::QualityFirst,
            "cost_optimized" => Strategy::CostOptimized,
            "speed_priority" => Strategy::SpeedPriority,
            "random" => Strategy::Random,
            _ => Strategy::Weighted,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Weighted => "weighted",
            Strategy::RoundRobin { .. } => "round_robin",
            Strategy::LeastLoaded => "least_loaded",
            Strategy::QualityFirst => "quality_first",
            Strategy::CostOptimized => "cost_optimized",
            Strategy::SpeedPriority => "speed_priority",
            Strategy::Random => "random",
        }
    }

    /// Pick an ordered chain of candidates: the selected model first,
    /// remaining candidates as fallbacks in preference order.
    pub fn order(
        &self,
        candidates: &[ModelRecord],
        config: &RouterConfig,
        request: &InferenceRequest,
        failure_rates: &HashMap<ModelId, f64>,
    ) -> Vec<(ModelRecord, f64)> {
        match self {
            Strategy::Weighted => score_candidates(candidates, config, request, failure_rates)
                .into_iter()
                .map(|c| (c.record, c.score))
                .collect(),
            Strategy::LeastLoaded => {
                let mut sorted: Vec<ModelRecord> = candidates.to_vec();
                sorted.sort_by(|a, b| {
                    a.active_requests
                        .cmp(&b.active_requests)
                        .then_with(|| a.model.id.cmp(&b.model.id))
                });
                sorted.into_iter().map(|r| (r, 1.0)).collect()
            }
            Strategy::RoundRobin { counter } => {
                if candidates.is_empty() {
                    return Vec::new();
                }
                let mut sorted: Vec<ModelRecord> = candidates.to_vec();
                sorted.sort_by(|a, b| a.model.id.cmp(&b.model.id));
                let start = counter.fetch_add(1, Ordering::Relaxed) % sorted.len();
                sorted.rotate_left(start);
                sorted.into_iter().map(|r| (r, 1.0)).collect()
            }
            Strategy::QualityFirst => {
                let mut sorted: Vec<ModelRecord> = candidates.to_vec();
                sorted.sort_by(|a, b| {
                    b.model
                        .quality_score
                        .partial_cmp(&a.model.quality_score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| a.model.id.cmp(&b.model.id))
                });
                sorted
                    .into_iter()
                    .map(|r| {
                        let quality = r.model.quality_score;
                        (r, quality)
                    })
                    .collect()
            }
            Strategy::CostOptimized => {
                let mut sorted: Vec<ModelRecord> = candidates.to_vec();
                sorted.sort_by(|a, b| {
                    a.model
                        .cost_per_1k_tokens
                        .partial_cmp(&b.model.cost_per_1k_tokens)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| a.model.id.cmp(&b.model.id))
                });
                sorted.into_iter().map(|r| (r, 1.0)).collect()
            }
            Strategy::SpeedPriority => {
                let mut sorted: Vec<ModelRecord> = candidates.to_vec();
                sorted.sort_by(|a, b| {
                    a.model
                        .average_latency_ms
                        .cmp(&b.model.average_latency_ms)
                        .then_with(|| a.model.id.cmp(&b.model.id))
                });
                sorted.into_iter().map(|r| (r, 1.0)).collect()
            }
            Strategy::Random => {
                let mut shuffled: Vec<ModelRecord> = candidates.to_vec();
                shuffled.shuffle(&mut thread_rng());
                shuffled.into_iter().map(|r| (r, 1.0)).collect()
            }
        }
    }
}

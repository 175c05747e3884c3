//! Model ensemble (§4.7): fan a request out to several models concurrently
//! and combine their results. No direct teacher equivalent; grounded on the
//! provider-fan-out idiom (`futures::future::join_all`) and the trait-at-
//! the-seam pattern the teacher uses for middleware.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

use crate::core::loader::SharedLoader;
use crate::core::types::{InferenceRequest, InferenceResult, TokenUsage};
use crate::utils::error::{OrchestratorError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreak {
    DescendingWeightThenLexicalId,
}

impl Default for TieBreak {
    fn default() -> Self {
        TieBreak::DescendingWeightThenLexicalId
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinationStrategy {
    /// Pick the result from the highest-weighted member; ties broken per
    /// `TieBreak`.
    MixtureOfExperts,
    /// Majority vote on exact text match; ties fall back to
    /// `MixtureOfExperts`.
    Voting,
    /// Concatenate member outputs in weight order, separated by a newline.
    Stacking,
    /// Weighted-sum vote on exact text match: each distinct response text
    /// accumulates the weight of every member that produced it, the text
    /// with the highest total wins. Latency/usage are averaged across all
    /// successful members, not just the winner's.
    WeightedAverage,
    /// AdaBoost-style iterative reweighting: walk members in `TieBreak`
    /// order, boosting a member's effective weight 1.5x when it agrees with
    /// the running leading text and halving it when it disagrees. The text
    /// with the highest accumulated effective weight wins.
    Boosting,
}

#[derive(Debug, Clone)]
pub struct EnsembleMember {
    pub model_id: String,
    pub loader: SharedLoader,
    pub weight: f64,
}

#[derive(Debug, Clone)]
pub struct EnsembleConfig {
    pub tie_break: TieBreak,
    /// Per-member inference budget (§4.7); a member that doesn't answer in
    /// time is treated the same as one that errored.
    pub member_timeout: Duration,
    /// Minimum fraction of total member weight that must survive (not time
    /// out, not error) for the ensemble result to be trusted. Below this,
    /// `infer` returns `EnsembleQuorumFailed` instead of combining whatever
    /// happens to be left.
    pub min_effective_weight_fraction: f64,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            tie_break: TieBreak::default(),
            member_timeout: Duration::from_secs(30),
            min_effective_weight_fraction: 0.5,
        }
    }
}

pub struct ModelEnsemble {
    members: Vec<EnsembleMember>,
    strategy: CombinationStrategy,
    config: EnsembleConfig,
}

impl ModelEnsemble {
    pub fn new(members: Vec<EnsembleMember>, strategy: CombinationStrategy, config: EnsembleConfig) -> Self {
        Self {
            members,
            strategy,
            config,
        }
    }

    /// Run all members concurrently and combine their results. Members that
    /// error are dropped from consideration; if all members error, the
    /// first error is surfaced.
    pub async fn infer(&self, request: &InferenceRequest) -> Result<InferenceResult> {
        if self.members.is_empty() {
            return Err(OrchestratorError::NoCandidates);
        }

        let timeout = self.config.member_timeout;
        let futures = self.members.iter().map(|member| {
            let loader = member.loader.clone();
            let request = request.clone();
            async move {
                match tokio::time::timeout(timeout, loader.infer(&request)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(OrchestratorError::Timeout {
                        message: format!("ensemble member {} exceeded {:?}", member.model_id, timeout),
                    }),
                }
            }
        });

        let outcomes = join_all(futures).await;
        let mut successes: Vec<(EnsembleMember, InferenceResult)> = Vec::new();
        let mut first_error = None;
        for (member, outcome) in self.members.iter().zip(outcomes) {
            match outcome {
                Ok(result) => successes.push((member.clone(), result)),
                Err(err) if first_error.is_none() => first_error = Some(err),
                Err(_) => {}
            }
        }

        if successes.is_empty() {
            return Err(first_error.unwrap_or(OrchestratorError::NoCandidates));
        }

        let total_weight: f64 = self.members.iter().map(|m| m.weight).sum();
        let available_weight: f64 = successes.iter().map(|(m, _)| m.weight).sum();
        let available_fraction = if total_weight > 0.0 {
            available_weight / total_weight
        } else {
            1.0
        };
        if available_fraction < self.config.min_effective_weight_fraction {
            return Err(OrchestratorError::EnsembleQuorumFailed {
                available_weight: available_fraction,
                required_weight: self.config.min_effective_weight_fraction,
            });
        }

        Ok(self.combine(request, successes))
    }

    fn combine(
        &self,
        request: &InferenceRequest,
        mut successes: Vec<(EnsembleMember, InferenceResult)>,
    ) -> InferenceResult {
        match self.config.tie_break {
            TieBreak::DescendingWeightThenLexicalId => successes.sort_by(|(a, _), (b, _)| {
                b.weight
                    .partial_cmp(&a.weight)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.model_id.cmp(&b.model_id))
            }),
        }

        match self.strategy {
            CombinationStrategy::MixtureOfExperts => {
                let (_, winner) = successes.into_iter().next().expect("non-empty successes");
                winner
            }
            CombinationStrategy::Voting => {
                let mut tally: std::collections::HashMap<String, u32> = std::collections::HashMap::new();
                for (_, result) in &successes {
                    *tally.entry(result.text.clone()).or_insert(0) += 1;
                }
                let max_votes = tally.values().copied().max().unwrap_or(0);
                let winning_text = tally
                    .into_iter()
                    .filter(|(_, votes)| *votes == max_votes)
                    .map(|(text, _)| text)
                    .min();
                match winning_text {
                    Some(text) if max_votes > 1 => {
                        let matching = successes
                            .iter()
                            .find(|(_, r)| r.text == text)
                            .map(|(_, r)| r.clone())
                            .expect("winning text came from a member");
                        matching
                    }
                    _ => successes.into_iter().next().unwrap().1,
                }
            }
            CombinationStrategy::WeightedAverage => {
                let mut tally: std::collections::HashMap<String, f64> = std::collections::HashMap::new();
                for (member, result) in &successes {
                    *tally.entry(result.text.clone()).or_insert(0.0) += member.weight;
                }
                let winning_text = tally
                    .into_iter()
                    .max_by(|(text_a, weight_a), (text_b, weight_b)| {
                        weight_a
                            .partial_cmp(weight_b)
                            .unwrap_or(std::cmp::Ordering::Equal)
                            .then_with(|| text_b.cmp(text_a))
                    })
                    .map(|(text, _)| text)
                    .unwrap_or_default();

                let model_id = successes
                    .iter()
                    .find(|(_, r)| r.text == winning_text)
                    .map(|(m, _)| m.model_id.clone())
                    .unwrap_or_default();
                let count = successes.len() as u64;
                let total_latency: u64 = successes.iter().map(|(_, r)| r.latency_ms).sum();
                let usage = successes.iter().fold(
                    TokenUsage {
                        prompt_tokens: 0,
                        completion_tokens: 0,
                    },
                    |mut acc, (_, r)| {
                        acc.prompt_tokens += r.usage.prompt_tokens;
                        acc.completion_tokens += r.usage.completion_tokens;
                        acc
                    },
                );
                InferenceResult {
                    request_id: request.id,
                    model_id,
                    text: winning_text,
                    usage: TokenUsage {
                        prompt_tokens: usage.prompt_tokens / count.max(1) as u32,
                        completion_tokens: usage.completion_tokens / count.max(1) as u32,
                    },
                    latency_ms: total_latency / count.max(1),
                    cache_hit: false,
                    attempts: successes.len() as u32,
                }
            }
            CombinationStrategy::Boosting => {
                let mut leading_text: Option<String> = None;
                let mut leading_weight = 0.0_f64;
                let mut tally: std::collections::HashMap<String, f64> = std::collections::HashMap::new();
                for (member, result) in &successes {
                    let agrees = leading_text.as_deref() == Some(result.text.as_str());
                    let effective_weight = if leading_text.is_none() {
                        member.weight
                    } else if agrees {
                        member.weight * 1.5
                    } else {
                        member.weight * 0.5
                    };
                    let entry = tally.entry(result.text.clone()).or_insert(0.0);
                    *entry += effective_weight;
                    let new_total = *entry;
                    if leading_text.is_none() || new_total > leading_weight {
                        leading_text = Some(result.text.clone());
                        leading_weight = new_total;
                    }
                }
                let winning_text = leading_text.unwrap_or_default();
                successes
                    .into_iter()
                    .find(|(_, r)| r.text == winning_text)
                    .map(|(_, r)| r)
                    .expect("winning text came from a member")
            }
            CombinationStrategy::Stacking => {
                let model_id = successes.first().map(|(m, _)| m.model_id.clone()).unwrap_or_default();
                let combined_text = successes
                    .iter()
                    .map(|(_, r)| r.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n");
                let total_latency: u64 = successes.iter().map(|(_, r)| r.latency_ms).sum();
                let usage = successes.iter().fold(
                    TokenUsage {
                        prompt_tokens: 0,
                        completion_tokens: 0,
                    },
                    |mut acc, (_, r)| {
                        acc.prompt_tokens += r.usage.prompt_tokens;
                        acc.completion_tokens += r.usage.completion_tokens;
                        acc
                    },
                );
                InferenceResult {
                    request_id: request.id,
                    model_id,
                    text: combined_text,
                    usage,
                    latency_ms: total_latency,
                    cache_hit: false,
                    attempts: successes.len() as u32,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loader::{Loader, MockLoader};
    use crate::core::types::{ModelId, StreamChunk};
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    /// Always answers `text` after sleeping `delay`, for exercising the
    /// per-member timeout without relying on wall-clock-sensitive mocks.
    struct SlowLoader {
        model_id: ModelId,
        text: String,
        delay: Duration,
    }

    #[async_trait]
    impl Loader for SlowLoader {
        async fn load(&self) -> Result<()> {
            Ok(())
        }

        async fn infer(&self, request: &InferenceRequest) -> Result<InferenceResult> {
            tokio::time::sleep(self.delay).await;
            Ok(InferenceResult {
                request_id: request.id,
                model_id: self.model_id.clone(),
                text: self.text.clone(),
                usage: TokenUsage {
                    prompt_tokens: 1,
                    completion_tokens: 1,
                },
                latency_ms: self.delay.as_millis() as u64,
                cache_hit: false,
                attempts: 1,
            })
        }

        async fn infer_stream(&self, _request: &InferenceRequest, _tx: mpsc::Sender<StreamChunk>) -> Result<()> {
            Ok(())
        }
    }

    fn member(id: &str, loader: SharedLoader, weight: f64) -> EnsembleMember {
        EnsembleMember {
            model_id: id.into(),
            loader,
            weight,
        }
    }

    fn text_loader(id: &str, text: &str) -> SharedLoader {
        Arc::new(SlowLoader {
            model_id: id.into(),
            text: text.into(),
            delay: Duration::from_millis(0),
        })
    }

    #[tokio::test]
    async fn weighted_average_picks_text_with_highest_combined_weight() {
        let members = vec![
            member("a", text_loader("a", "yes"), 0.2),
            member("b", text_loader("b", "yes"), 0.2),
            member("c", text_loader("c", "no"), 0.3),
        ];
        let ensemble = ModelEnsemble::new(members, CombinationStrategy::WeightedAverage, EnsembleConfig::default());
        // "yes" wins on combined weight (0.4) even though "no" came from the
        // single highest-weighted member (0.3).
        let request = InferenceRequest::new("ab");
        let result = ensemble.infer(&request).await.unwrap();
        assert_eq!(result.text, "yes");
    }

    #[tokio::test]
    async fn boosting_rewards_agreement_over_raw_weight() {
        let members = vec![
            member("heavy-dissent", text_loader("heavy-dissent", "no"), 10.0),
            member("light-a", text_loader("light-a", "yes"), 8.0),
            member("light-b", text_loader("light-b", "yes"), 8.0),
        ];
        let config = EnsembleConfig {
            tie_break: TieBreak::DescendingWeightThenLexicalId,
            ..EnsembleConfig::default()
        };
        let ensemble = ModelEnsemble::new(members, CombinationStrategy::Boosting, config);
        let request = InferenceRequest::new("ab");
        let result = ensemble.infer(&request).await.unwrap();
        // "heavy-dissent" goes first (highest raw weight, 10.0) and sets the
        // initial leader; "light-a" and "light-b" then agree with each other
        // and each get boosted to 12.0 (8.0 * 1.5), so "yes" ends at 24.0
        // against "no"'s 10.0.
        assert_eq!(result.text, "yes");
    }

    #[tokio::test]
    async fn member_exceeding_timeout_is_excluded() {
        let members = vec![
            member(
                "slow",
                Arc::new(SlowLoader {
                    model_id: "slow".into(),
                    text: "late".into(),
                    delay: Duration::from_millis(50),
                }),
                1.0,
            ),
            member("fast", Arc::new(MockLoader::new("fast")), 1.0),
        ];
        let config = EnsembleConfig {
            member_timeout: Duration::from_millis(5),
            min_effective_weight_fraction: 0.0,
            ..EnsembleConfig::default()
        };
        let ensemble = ModelEnsemble::new(members, CombinationStrategy::MixtureOfExperts, config);
        let request = InferenceRequest::new("ab");
        let result = ensemble.infer(&request).await.unwrap();
        assert_eq!(result.model_id, "fast");
    }

    #[tokio::test]
    async fn insufficient_surviving_weight_fails_quorum() {
        let members = vec![
            member(
                "slow",
                Arc::new(SlowLoader {
                    model_id: "slow".into(),
                    text: "late".into(),
                    delay: Duration::from_millis(50),
                }),
                9.0,
            ),
            member("fast", Arc::new(MockLoader::new("fast")), 1.0),
        ];
        let config = EnsembleConfig {
            member_timeout: Duration::from_millis(5),
            min_effective_weight_fraction: 0.5,
            ..EnsembleConfig::default()
        };
        let ensemble = ModelEnsemble::new(members, CombinationStrategy::MixtureOfExperts, config);
        let request = InferenceRequest::new("ab");
        let err = ensemble.infer(&request).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::EnsembleQuorumFailed { .. }));
    }
}

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use super::model::{ModelId, Tier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

/// Routing/quality requirements a candidate model must satisfy (§3.1).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestConstraints {
    pub required_tags: Vec<String>,
    pub min_tier: Option<Tier>,
    pub max_cost_per_1k_tokens: Option<f64>,
    pub min_context_tokens: Option<u32>,
    pub preferred_model: Option<ModelId>,
    pub excluded_models: Vec<ModelId>,
}

/// An inbound inference request (§3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceRequest {
    pub id: Uuid,
    pub prompt: String,
    pub stream: bool,
    pub priority: Priority,
    pub constraints: RequestConstraints,
    /// Sampling temperature. `0.0` means greedy/deterministic decoding, the
    /// only setting under which a response is safe to cache (§4.3) or
    /// single-flight-coalesce across callers.
    #[serde(default)]
    pub temperature: f64,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub top_k: Option<u32>,
    #[serde(default)]
    pub stop_sequences: Vec<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(with = "duration_millis")]
    pub timeout: Duration,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl InferenceRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            prompt: prompt.into(),
            stream: false,
            priority: Priority::default(),
            constraints: RequestConstraints::default(),
            temperature: 0.0,
            top_p: None,
            top_k: None,
            stop_sequences: Vec::new(),
            max_tokens: None,
            timeout: Duration::from_secs(30),
            metadata: HashMap::new(),
        }
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_constraints(mut self, constraints: RequestConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Whether this request's output is deterministic and therefore safe to
    /// cache / single-flight-coalesce (§4.3).
    pub fn is_deterministic(&self) -> bool {
        self.temperature == 0.0
    }

    /// Deterministic fingerprint used for cache keys and single-flight
    /// coalescing: the prompt plus any constraint or generation parameter
    /// that affects output.
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(self.prompt.as_bytes());
        if let Some(model) = &self.constraints.preferred_model {
            hasher.update(model.as_bytes());
        }
        for tag in &self.constraints.required_tags {
            hasher.update(tag.as_bytes());
        }
        hasher.update(self.temperature.to_bits().to_le_bytes());
        if let Some(top_p) = self.top_p {
            hasher.update(top_p.to_bits().to_le_bytes());
        }
        if let Some(top_k) = self.top_k {
            hasher.update(top_k.to_le_bytes());
        }
        for stop in &self.stop_sequences {
            hasher.update(stop.as_bytes());
        }
        if let Some(max_tokens) = self.max_tokens {
            hasher.update(max_tokens.to_le_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}

use std::path::Path;

use crate::utils::error::Result;

use super::models::OrchestratorConfig;
use super::validation::validate;

/// Load configuration from a YAML file, falling back to defaults for any
/// field the document omits (`serde(default)` on every section), then
/// validate the result.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<OrchestratorConfig> {
    let contents = std::fs::read_to_string(path)?;
    load_from_str(&contents)
}

pub fn load_from_str(contents: &str) -> Result<OrchestratorConfig> {
    let config: OrchestratorConfig = serde_yaml::from_str(contents)?;
    validate(&config)?;
    Ok(config)
}

/// Load `.env` into the process environment, then build the default config.
/// Environment values are not mapped onto fields individually (the corpus
/// of fields is too large to be worth a bespoke env-overlay layer); callers
/// needing env-driven overrides should read `std::env` before calling
/// `load_from_file` and merge fields explicitly.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_partial_yaml_with_defaults() {
        let yaml = "router:\n  strategy: round_robin\n";
        let config = load_from_str(yaml).unwrap();
        assert_eq!(config.router.strategy, "round_robin");
        assert_eq!(config.cache.l1_capacity, 512);
    }

    #[test]
    fn empty_document_is_all_defaults() {
        let config = load_from_str("{}").unwrap();
        assert_eq!(config.pool.queue_capacity, 4096);
    }
}

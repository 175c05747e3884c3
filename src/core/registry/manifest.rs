use serde::{Deserialize, Serialize};

use crate::core::types::Model;

/// On-disk registration manifest, one entry per model, loaded at startup to
/// seed the registry before any loader is invoked (§6, "Persisted state
/// layout").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryManifest {
    pub models: Vec<Model>,
}

impl RegistryManifest {
    pub fn from_yaml(contents: &str) -> crate::utils::error::Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn to_yaml(&self) -> crate::utils::error::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

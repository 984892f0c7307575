//! Mapper configuration
//!
//! Loaded from YAML. Everything is optional; an absent file yields the
//! defaults.
//!
//! ```yaml
//! empty_result_policy: construct_default
//! registry:
//!   - contract: sequence
//!     container: collection
//! ```

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::registry::{ConcreteCollectionRegistry, RegistryEntry};

/// Names the YAML file read by [`MapperConfig::from_env`]
pub const CONFIG_ENV: &str = "RECORD_MAPPER_CONFIG";

/// Overrides the empty-result policy (`default` | `absent`)
pub const EMPTY_RESULT_ENV: &str = "RECORD_MAPPER_EMPTY_RESULT";

/// What a plain object destination becomes when its result set has no row.
/// A supplied instance is always returned untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyResultPolicy {
    /// Default-construct through the orchestrator
    #[default]
    ConstructDefault,
    /// Return `Value::Null`
    ReturnAbsent,
}

impl EmptyResultPolicy {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "default" | "construct_default" => Ok(Self::ConstructDefault),
            "absent" | "return_absent" => Ok(Self::ReturnAbsent),
            other => Err(anyhow!("unknown empty result policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    pub empty_result_policy: EmptyResultPolicy,
    /// Applied on top of the standard contract -> container table
    pub registry: Vec<RegistryEntry>,
}

impl MapperConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse mapper config")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        info!(
            "Loaded mapper config from {} ({} registry overrides)",
            path.display(),
            config.registry.len()
        );
        Ok(config)
    }

    /// Defaults, then the file named by `RECORD_MAPPER_CONFIG`, then
    /// `RECORD_MAPPER_EMPTY_RESULT`
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::load(path)?,
            Err(_) => Self::default(),
        };
        if let Ok(policy) = std::env::var(EMPTY_RESULT_ENV) {
            config.empty_result_policy = EmptyResultPolicy::parse(&policy)
                .with_context(|| format!("Invalid {EMPTY_RESULT_ENV}"))?;
        }
        Ok(config)
    }

    pub fn with_empty_result_policy(mut self, policy: EmptyResultPolicy) -> Self {
        self.empty_result_policy = policy;
        self
    }

    pub fn with_registry_entry(mut self, entry: RegistryEntry) -> Self {
        self.registry.push(entry);
        self
    }

    /// The standard registry with this config's overrides applied
    pub fn build_registry(&self) -> ConcreteCollectionRegistry {
        ConcreteCollectionRegistry::standard().apply(&self.registry)
    }
}

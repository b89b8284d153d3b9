//! Store configuration, loadable from TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Serve cache-enabled kinds from memory after startup population.
    pub use_cache: bool,
    pub tree: TreeConfig,
    pub api: ApiConfig,
}

/// Hierarchical-tree backend settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TreeConfig {
    /// Root node every path hangs off.
    pub root: String,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            root: "/blueking".to_string(),
        }
    }
}

/// API-object backend settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// Namespace holding cluster-scoped scheduler objects.
    pub internal_namespace: String,
    /// Namespace ensured on first use.
    pub default_namespace: String,
    /// API group of the declared resource types.
    pub group: String,
    pub version: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            internal_namespace: "bcs-system".to_string(),
            default_namespace: "default".to_string(),
            group: "bkbcs.tencent.com".to_string(),
            version: "v2".to_string(),
        }
    }
}

impl StoreConfig {
    pub fn from_file(path: &Path) -> StoreResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> StoreResult<Self> {
        let config: StoreConfig =
            toml::from_str(content).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> StoreResult<()> {
        if !self.tree.root.starts_with('/') || self.tree.root.len() < 2 {
            return Err(StoreError::Config(format!(
                "tree root must be an absolute non-root path, got {:?}",
                self.tree.root
            )));
        }
        if self.tree.root.ends_with('/') {
            return Err(StoreError::Config(format!(
                "tree root must not end with '/', got {:?}",
                self.tree.root
            )));
        }
        if self.api.internal_namespace.is_empty() || self.api.default_namespace.is_empty() {
            return Err(StoreError::Config("api namespaces must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let config = StoreConfig::from_toml("use_cache = true\n").unwrap();
        assert!(config.use_cache);
        assert_eq!(config.tree.root, "/blueking");
        assert_eq!(config.api.internal_namespace, "bcs-system");
    }

    #[test]
    fn test_parse_overrides() {
        let toml_str = r#"
[tree]
root = "/sched"

[api]
internal_namespace = "sched-system"
"#;
        let config = StoreConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.tree.root, "/sched");
        assert_eq!(config.api.internal_namespace, "sched-system");
        assert_eq!(config.api.default_namespace, "default");
    }

    #[test]
    fn test_reject_relative_root() {
        let err = StoreConfig::from_toml("[tree]\nroot = \"sched\"\n").unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }
}

//! Migration configuration, loadable from TOML and overridable from the CLI.
//!
//! ```toml
//! [legacy]
//! addresses = ["/var/lib/sched/tree-a.redb", "/var/lib/sched/tree-b.redb"]
//! root = "/blueking"
//!
//! [target]
//! path = "/var/lib/sched/api.redb"
//!
//! [target.api]
//! internal_namespace = "bcs-system"
//! ```

use std::path::{Path, PathBuf};

use sched_store::config::{ApiConfig, TreeConfig};
use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, MigrateResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MigrateConfig {
    pub legacy: LegacyConfig,
    pub target: TargetConfig,
}

/// The coordination tree being migrated away from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LegacyConfig {
    /// Tree service locations; the first one that opens is used.
    pub addresses: Vec<String>,
    pub root: String,
}

impl Default for LegacyConfig {
    fn default() -> Self {
        Self {
            addresses: Vec::new(),
            root: TreeConfig::default().root,
        }
    }
}

/// The API server being migrated to.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TargetConfig {
    pub path: Option<PathBuf>,
    pub api: ApiConfig,
}

/// Split a comma-separated address list, dropping blanks.
pub fn parse_address_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl MigrateConfig {
    pub fn from_file(path: &Path) -> MigrateResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MigrateError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> MigrateResult<Self> {
        toml::from_str(content).map_err(|e| MigrateError::Config(e.to_string()))
    }

    /// Apply command-line values over file values.
    pub fn apply_overrides(
        &mut self,
        legacy: Option<&str>,
        legacy_root: Option<&str>,
        target: Option<&Path>,
    ) {
        if let Some(list) = legacy {
            self.legacy.addresses = parse_address_list(list);
        }
        if let Some(root) = legacy_root {
            self.legacy.root = root.to_string();
        }
        if let Some(path) = target {
            self.target.path = Some(path.to_path_buf());
        }
    }

    pub fn validate(&self) -> MigrateResult<()> {
        if self.legacy.addresses.is_empty() {
            return Err(MigrateError::Config("no legacy address given".into()));
        }
        if self.target.path.is_none() {
            return Err(MigrateError::Config("no target given".into()));
        }
        let tree = TreeConfig {
            root: self.legacy.root.clone(),
        };
        let store = sched_store::StoreConfig {
            use_cache: false,
            tree,
            api: self.target.api.clone(),
        };
        store
            .validate()
            .map_err(|e| MigrateError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_list_splits_on_commas() {
        assert_eq!(
            parse_address_list(" a.redb, ,b.redb ,"),
            vec!["a.redb".to_string(), "b.redb".to_string()]
        );
        assert!(parse_address_list("").is_empty());
    }

    #[test]
    fn toml_with_overrides() {
        let mut config = MigrateConfig::from_toml(
            r#"
            [legacy]
            addresses = ["/data/tree.redb"]

            [target]
            path = "/data/api.redb"

            [target.api]
            internal_namespace = "sched-system"
            "#,
        )
        .unwrap();
        assert_eq!(config.legacy.root, "/blueking");
        assert_eq!(config.target.api.internal_namespace, "sched-system");
        assert_eq!(config.target.api.default_namespace, "default");

        config.apply_overrides(Some("x.redb,y.redb"), Some("/custom"), None);
        assert_eq!(config.legacy.addresses, vec!["x.redb", "y.redb"]);
        assert_eq!(config.legacy.root, "/custom");
        assert_eq!(config.target.path, Some(PathBuf::from("/data/api.redb")));
        config.validate().unwrap();
    }

    #[test]
    fn validation_requires_both_ends() {
        let mut config = MigrateConfig::default();
        assert!(config.validate().is_err());
        config.apply_overrides(Some("tree.redb"), None, None);
        assert!(config.validate().is_err());
        config.apply_overrides(None, None, Some(Path::new("api.redb")));
        config.validate().unwrap();

        config.legacy.root = "relative".into();
        assert!(matches!(config.validate(), Err(MigrateError::Config(_))));
    }
}

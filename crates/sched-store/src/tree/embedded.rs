//! Embedded coordination tree backed by redb.
//!
//! Each node is one row keyed by its absolute path, so a node's children are
//! the rows sharing its `{path}/` prefix. The tree is `Clone + Send + Sync`
//! (backed by `Arc<Database>`) and supports both on-disk and in-memory
//! databases, the latter for testing.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use tracing::{debug, warn};

use super::TreeClient;
use crate::error::{StoreError, StoreResult, map_err};

/// Tree nodes keyed by absolute path.
const NODES: TableDefinition<&str, &[u8]> = TableDefinition::new("tree_nodes");

const EMPTY: &[u8] = &[];

/// Thread-safe coordination tree backed by redb.
#[derive(Clone)]
pub struct RedbTree {
    db: Arc<Database>,
}

impl RedbTree {
    /// Open (or create) a persistent tree at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let db = Database::create(path).map_err(map_err!(Backend))?;
        let tree = Self { db: Arc::new(db) };
        tree.ensure_tables()?;
        debug!(?path, "coordination tree opened");
        Ok(tree)
    }

    /// Create an ephemeral in-memory tree (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Backend))?;
        let tree = Self { db: Arc::new(db) };
        tree.ensure_tables()?;
        debug!("in-memory coordination tree opened");
        Ok(tree)
    }

    /// Connect to the first reachable entry of a server address list.
    pub fn connect<S: AsRef<str>>(addresses: &[S]) -> StoreResult<Self> {
        let mut last_err = StoreError::Config("empty tree address list".to_string());
        for addr in addresses {
            let addr = addr.as_ref().trim();
            if addr.is_empty() {
                continue;
            }
            match Self::open(Path::new(addr)) {
                Ok(tree) => return Ok(tree),
                Err(e) => {
                    warn!(%addr, error = %e, "tree server unreachable, trying next");
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }

    fn ensure_tables(&self) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Backend))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(NODES).map_err(map_err!(Backend))?;
        txn.commit().map_err(map_err!(Backend))?;
        Ok(())
    }
}

fn validate_path(path: &str) -> StoreResult<()> {
    let ok = path.starts_with('/')
        && path.len() > 1
        && !path.ends_with('/')
        && !path.contains("//");
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(format!("bad tree path {path:?}")))
    }
}

/// Proper ancestors of `path`, shallowest first, excluding `/`.
fn ancestors(path: &str) -> Vec<&str> {
    path.match_indices('/')
        .skip(1)
        .map(|(idx, _)| &path[..idx])
        .collect()
}

fn child_prefix(path: &str) -> String {
    if path == "/" {
        "/".to_string()
    } else {
        format!("{path}/")
    }
}

impl TreeClient for RedbTree {
    fn set(&self, path: &str, data: &[u8]) -> StoreResult<()> {
        validate_path(path)?;
        let txn = self.db.begin_write().map_err(map_err!(Backend))?;
        {
            let mut table = txn.open_table(NODES).map_err(map_err!(Backend))?;
            for parent in ancestors(path) {
                let missing = table.get(parent).map_err(map_err!(Backend))?.is_none();
                if missing {
                    table.insert(parent, EMPTY).map_err(map_err!(Backend))?;
                }
            }
            table.insert(path, data).map_err(map_err!(Backend))?;
        }
        txn.commit().map_err(map_err!(Backend))?;
        Ok(())
    }

    fn get(&self, path: &str) -> StoreResult<Vec<u8>> {
        validate_path(path)?;
        let txn = self.db.begin_read().map_err(map_err!(Backend))?;
        let table = txn.open_table(NODES).map_err(map_err!(Backend))?;
        match table.get(path).map_err(map_err!(Backend))? {
            Some(guard) => Ok(guard.value().to_vec()),
            None => Err(StoreError::NotFound(path.to_string())),
        }
    }

    fn exists(&self, path: &str) -> StoreResult<bool> {
        validate_path(path)?;
        let txn = self.db.begin_read().map_err(map_err!(Backend))?;
        let table = txn.open_table(NODES).map_err(map_err!(Backend))?;
        Ok(table.get(path).map_err(map_err!(Backend))?.is_some())
    }

    fn delete(&self, path: &str) -> StoreResult<()> {
        validate_path(path)?;
        let prefix = child_prefix(path);
        let txn = self.db.begin_write().map_err(map_err!(Backend))?;
        {
            let mut table = txn.open_table(NODES).map_err(map_err!(Backend))?;
            let missing = table.get(path).map_err(map_err!(Backend))?.is_none();
            if missing {
                return Err(StoreError::NotFound(path.to_string()));
            }
            // Descendants sort directly after the prefix, so the first key
            // in range decides.
            let has_children = match table
                .range(prefix.as_str()..)
                .map_err(map_err!(Backend))?
                .next()
            {
                Some(entry) => {
                    let (key, _) = entry.map_err(map_err!(Backend))?;
                    key.value().starts_with(prefix.as_str())
                }
                None => false,
            };
            if has_children {
                return Err(StoreError::NotEmpty(path.to_string()));
            }
            table.remove(path).map_err(map_err!(Backend))?;
        }
        txn.commit().map_err(map_err!(Backend))?;
        Ok(())
    }

    fn children(&self, path: &str) -> StoreResult<Vec<String>> {
        if path != "/" {
            validate_path(path)?;
        }
        let prefix = child_prefix(path);
        let txn = self.db.begin_read().map_err(map_err!(Backend))?;
        let table = txn.open_table(NODES).map_err(map_err!(Backend))?;
        if path != "/" && table.get(path).map_err(map_err!(Backend))?.is_none() {
            return Err(StoreError::NotFound(path.to_string()));
        }
        let mut names = BTreeSet::new();
        for entry in table.range(prefix.as_str()..).map_err(map_err!(Backend))? {
            let (key, _) = entry.map_err(map_err!(Backend))?;
            let Some(rest) = key.value().strip_prefix(prefix.as_str()) else {
                break;
            };
            if let Some(name) = rest.split('/').next() {
                names.insert(name.to_string());
            }
        }
        Ok(names.into_iter().collect())
    }
}

//! Embedded API-object server backed by redb.
//!
//! Objects are JSON-serialized into rows keyed `{plural}/{namespace}/{name}`.
//! Every write bumps a global revision which becomes the object's resource
//! version, and updates carrying a stale version are refused.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use tracing::debug;

use super::{ApiClient, ApiObject, LabelSelector, ResourceDefinition};
use crate::error::{StoreError, StoreResult, map_err};

/// Declared resource types keyed by plural.
const RESOURCE_TYPES: TableDefinition<&str, &[u8]> = TableDefinition::new("api_resource_types");

/// Namespaces keyed by name.
const NAMESPACES: TableDefinition<&str, &[u8]> = TableDefinition::new("api_namespaces");

/// Objects keyed by `{plural}/{namespace}/{name}`.
const OBJECTS: TableDefinition<&str, &[u8]> = TableDefinition::new("api_objects");

/// Server bookkeeping (global revision).
const META: TableDefinition<&str, u64> = TableDefinition::new("api_meta");

const REVISION_KEY: &str = "revision";

const EMPTY: &[u8] = &[];

/// Thread-safe API server backed by redb.
#[derive(Clone)]
pub struct RedbApiServer {
    db: Arc<Database>,
}

impl RedbApiServer {
    /// Open (or create) a persistent API server store at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let db = Database::create(path).map_err(map_err!(Backend))?;
        let server = Self { db: Arc::new(db) };
        server.ensure_tables()?;
        debug!(?path, "api server store opened");
        Ok(server)
    }

    /// Create an ephemeral in-memory API server (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Backend))?;
        let server = Self { db: Arc::new(db) };
        server.ensure_tables()?;
        debug!("in-memory api server opened");
        Ok(server)
    }

    fn ensure_tables(&self) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Backend))?;
        txn.open_table(RESOURCE_TYPES).map_err(map_err!(Backend))?;
        txn.open_table(NAMESPACES).map_err(map_err!(Backend))?;
        txn.open_table(OBJECTS).map_err(map_err!(Backend))?;
        txn.open_table(META).map_err(map_err!(Backend))?;
        txn.commit().map_err(map_err!(Backend))?;
        Ok(())
    }

    /// Current global revision.
    pub fn revision(&self) -> StoreResult<u64> {
        let txn = self.db.begin_read().map_err(map_err!(Backend))?;
        let meta = txn.open_table(META).map_err(map_err!(Backend))?;
        Ok(meta
            .get(REVISION_KEY)
            .map_err(map_err!(Backend))?
            .map(|g| g.value())
            .unwrap_or(0))
    }
}

fn check_name(what: &str, value: &str) -> StoreResult<()> {
    if value.is_empty() || value.contains('/') {
        return Err(StoreError::InvalidKey(format!(
            "{what} {value:?} must be non-empty and contain no '/'"
        )));
    }
    Ok(())
}

fn object_key(plural: &str, namespace: &str, name: &str) -> String {
    format!("{plural}/{namespace}/{name}")
}

fn bump_revision(txn: &WriteTransaction) -> StoreResult<u64> {
    let mut meta = txn.open_table(META).map_err(map_err!(Backend))?;
    let next = meta
        .get(REVISION_KEY)
        .map_err(map_err!(Backend))?
        .map(|g| g.value())
        .unwrap_or(0)
        + 1;
    meta.insert(REVISION_KEY, next).map_err(map_err!(Backend))?;
    Ok(next)
}

impl ApiClient for RedbApiServer {
    fn create_resource_type(&self, def: &ResourceDefinition) -> StoreResult<()> {
        check_name("resource plural", &def.plural)?;
        let value = serde_json::to_vec(def).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Backend))?;
        {
            let mut table = txn.open_table(RESOURCE_TYPES).map_err(map_err!(Backend))?;
            let exists = table
                .get(def.plural.as_str())
                .map_err(map_err!(Backend))?
                .is_some();
            if exists {
                return Err(StoreError::AlreadyExists(format!(
                    "resource type {}",
                    def.plural
                )));
            }
            table
                .insert(def.plural.as_str(), value.as_slice())
                .map_err(map_err!(Backend))?;
        }
        txn.commit().map_err(map_err!(Backend))?;
        debug!(plural = %def.plural, kind = %def.kind, "resource type declared");
        Ok(())
    }

    fn create_namespace(&self, name: &str) -> StoreResult<()> {
        check_name("namespace", name)?;
        let txn = self.db.begin_write().map_err(map_err!(Backend))?;
        {
            let mut table = txn.open_table(NAMESPACES).map_err(map_err!(Backend))?;
            let exists = table.get(name).map_err(map_err!(Backend))?.is_some();
            if exists {
                return Err(StoreError::AlreadyExists(format!("namespace {name}")));
            }
            table.insert(name, EMPTY).map_err(map_err!(Backend))?;
        }
        txn.commit().map_err(map_err!(Backend))?;
        debug!(%name, "namespace created");
        Ok(())
    }

    fn list_namespaces(&self) -> StoreResult<Vec<String>> {
        let txn = self.db.begin_read().map_err(map_err!(Backend))?;
        let table = txn.open_table(NAMESPACES).map_err(map_err!(Backend))?;
        let mut names = Vec::new();
        for entry in table.iter().map_err(map_err!(Backend))? {
            let (key, _) = entry.map_err(map_err!(Backend))?;
            names.push(key.value().to_string());
        }
        Ok(names)
    }

    fn get(&self, plural: &str, namespace: &str, name: &str) -> StoreResult<ApiObject> {
        let key = object_key(plural, namespace, name);
        let txn = self.db.begin_read().map_err(map_err!(Backend))?;
        let table = txn.open_table(OBJECTS).map_err(map_err!(Backend))?;
        match table.get(key.as_str()).map_err(map_err!(Backend))? {
            Some(guard) => serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize)),
            None => Err(StoreError::NotFound(key)),
        }
    }

    fn create(&self, plural: &str, object: &ApiObject) -> StoreResult<ApiObject> {
        let namespace = object.metadata.namespace.as_str();
        let name = object.metadata.name.as_str();
        check_name("namespace", namespace)?;
        check_name("name", name)?;
        let key = object_key(plural, namespace, name);

        let txn = self.db.begin_write().map_err(map_err!(Backend))?;
        let stored = {
            let types = txn.open_table(RESOURCE_TYPES).map_err(map_err!(Backend))?;
            if types.get(plural).map_err(map_err!(Backend))?.is_none() {
                return Err(StoreError::NotFound(format!("resource type {plural}")));
            }
            let namespaces = txn.open_table(NAMESPACES).map_err(map_err!(Backend))?;
            if namespaces.get(namespace).map_err(map_err!(Backend))?.is_none() {
                return Err(StoreError::NotFound(format!("namespace {namespace}")));
            }

            let mut objects = txn.open_table(OBJECTS).map_err(map_err!(Backend))?;
            if objects.get(key.as_str()).map_err(map_err!(Backend))?.is_some() {
                return Err(StoreError::AlreadyExists(key));
            }
            let mut stored = object.clone();
            stored.metadata.resource_version = bump_revision(&txn)?.to_string();
            let data = serde_json::to_vec(&stored).map_err(map_err!(Serialize))?;
            objects
                .insert(key.as_str(), data.as_slice())
                .map_err(map_err!(Backend))?;
            stored
        };
        txn.commit().map_err(map_err!(Backend))?;
        Ok(stored)
    }

    fn update(&self, plural: &str, object: &ApiObject) -> StoreResult<ApiObject> {
        let key = object_key(plural, &object.metadata.namespace, &object.metadata.name);

        let txn = self.db.begin_write().map_err(map_err!(Backend))?;
        let stored = {
            let mut objects = txn.open_table(OBJECTS).map_err(map_err!(Backend))?;
            let current: ApiObject = match objects.get(key.as_str()).map_err(map_err!(Backend))? {
                Some(guard) => {
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?
                }
                None => return Err(StoreError::NotFound(key)),
            };
            let expected = &object.metadata.resource_version;
            if !expected.is_empty() && *expected != current.metadata.resource_version {
                return Err(StoreError::Conflict(format!(
                    "{key}: resource version {expected} is stale, current is {}",
                    current.metadata.resource_version
                )));
            }
            let mut stored = object.clone();
            stored.metadata.resource_version = bump_revision(&txn)?.to_string();
            let data = serde_json::to_vec(&stored).map_err(map_err!(Serialize))?;
            objects
                .insert(key.as_str(), data.as_slice())
                .map_err(map_err!(Backend))?;
            stored
        };
        txn.commit().map_err(map_err!(Backend))?;
        Ok(stored)
    }

    fn delete(&self, plural: &str, namespace: &str, name: &str) -> StoreResult<()> {
        let key = object_key(plural, namespace, name);
        let txn = self.db.begin_write().map_err(map_err!(Backend))?;
        {
            let mut objects = txn.open_table(OBJECTS).map_err(map_err!(Backend))?;
            let existed = objects
                .remove(key.as_str())
                .map_err(map_err!(Backend))?
                .is_some();
            if !existed {
                return Err(StoreError::NotFound(key));
            }
            bump_revision(&txn)?;
        }
        txn.commit().map_err(map_err!(Backend))?;
        Ok(())
    }

    fn list(
        &self,
        plural: &str,
        namespace: Option<&str>,
        selector: &LabelSelector,
    ) -> StoreResult<Vec<ApiObject>> {
        let prefix = match namespace {
            Some(ns) => format!("{plural}/{ns}/"),
            None => format!("{plural}/"),
        };
        let txn = self.db.begin_read().map_err(map_err!(Backend))?;
        let table = txn.open_table(OBJECTS).map_err(map_err!(Backend))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Backend))? {
            let (key, value) = entry.map_err(map_err!(Backend))?;
            if key.value().starts_with(&prefix) {
                let object: ApiObject =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                if object.matches(selector) {
                    results.push(object);
                }
            }
        }
        Ok(results)
    }
}

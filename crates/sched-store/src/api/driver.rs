//! Timed primitive access to an API server.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use super::{ApiClient, ApiMeta, ApiObject, LabelSelector, ResourceDefinition, definitions};
use crate::config::ApiConfig;
use crate::error::{StoreError, StoreResult};
use crate::kind::Kind;
use crate::stats::{DriverStats, Primitive, StatsSnapshot};

/// Wraps an [`ApiClient`] with per-call timing, first-use registration of
/// every resource type, on-demand namespace creation and the
/// get-then-update-or-create upsert.
pub struct ApiDriver {
    client: Arc<dyn ApiClient>,
    config: ApiConfig,
    definitions: HashMap<Kind, ResourceDefinition>,
    ready: AtomicBool,
    init: Mutex<()>,
    /// Namespaces already known to exist.
    namespaces: RwLock<HashSet<String>>,
    stats: DriverStats,
}

impl ApiDriver {
    pub fn new(client: Arc<dyn ApiClient>, config: &ApiConfig) -> Self {
        let definitions = Kind::ALL
            .iter()
            .copied()
            .zip(definitions(config))
            .collect();
        Self {
            client,
            config: config.clone(),
            definitions,
            ready: AtomicBool::new(false),
            init: Mutex::new(()),
            namespaces: RwLock::new(HashSet::new()),
            stats: DriverStats::new(),
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn definition(&self, kind: Kind) -> StoreResult<&ResourceDefinition> {
        self.definitions
            .get(&kind)
            .ok_or_else(|| StoreError::Config(format!("no resource type declared for {kind}")))
    }

    fn timed<T>(
        &self,
        primitive: Primitive,
        target: &str,
        call: impl FnOnce() -> StoreResult<T>,
    ) -> StoreResult<T> {
        let start = Instant::now();
        let result = call();
        let elapsed = start.elapsed();
        let ok = match &result {
            Ok(_) => true,
            Err(e) => e.is_not_found(),
        };
        self.stats.record(primitive, elapsed, ok);
        debug!(
            primitive = primitive.as_str(),
            %target,
            elapsed_us = elapsed.as_micros() as u64,
            ok,
            "api call"
        );
        result
    }

    /// Register every resource type and the default and internal namespaces.
    /// Runs once; later calls return immediately.
    pub fn ensure_ready(&self) -> StoreResult<()> {
        if self.ready.load(Ordering::Acquire) {
            return Ok(());
        }
        let _init = self.init.lock();
        if self.ready.load(Ordering::Acquire) {
            return Ok(());
        }

        for def in self.definitions.values() {
            match self.timed(Primitive::Create, &def.plural, || {
                self.client.create_resource_type(def)
            }) {
                Ok(()) => debug!(plural = %def.plural, "resource type registered"),
                Err(e) if e.is_already_exists() => {}
                Err(e) => return Err(e),
            }
        }
        self.ensure_namespace(&self.config.default_namespace)?;
        self.ensure_namespace(&self.config.internal_namespace)?;

        self.ready.store(true, Ordering::Release);
        info!(
            group = %self.config.group,
            resource_types = self.definitions.len(),
            "api backend ready"
        );
        Ok(())
    }

    /// Create `namespace` unless it is already known to exist.
    pub fn ensure_namespace(&self, namespace: &str) -> StoreResult<()> {
        if self.namespaces.read().contains(namespace) {
            return Ok(());
        }
        match self.timed(Primitive::Create, namespace, || {
            self.client.create_namespace(namespace)
        }) {
            Ok(()) => debug!(%namespace, "namespace created"),
            Err(e) if e.is_already_exists() => {}
            Err(e) => return Err(e),
        }
        self.namespaces.write().insert(namespace.to_string());
        Ok(())
    }

    /// Create or overwrite `(namespace, name)` of `kind` with `spec`.
    ///
    /// An existing object's resource version is carried into the update so a
    /// concurrent writer in between surfaces as `Conflict`.
    pub fn upsert(
        &self,
        kind: Kind,
        namespace: &str,
        name: &str,
        labels: BTreeMap<String, String>,
        spec: serde_json::Value,
    ) -> StoreResult<()> {
        self.ensure_ready()?;
        let def = self.definition(kind)?;
        let target = format!("{}/{namespace}/{name}", def.plural);
        let mut object = ApiObject {
            api_version: def.api_version(),
            kind: def.kind.clone(),
            metadata: ApiMeta {
                name: name.to_string(),
                namespace: namespace.to_string(),
                labels,
                ..Default::default()
            },
            spec,
        };

        match self.timed(Primitive::Get, &target, || {
            self.client.get(&def.plural, namespace, name)
        }) {
            Ok(existing) => {
                object.metadata.resource_version = existing.metadata.resource_version;
                self.timed(Primitive::Update, &target, || {
                    self.client.update(&def.plural, &object)
                })?;
            }
            Err(e) if e.is_not_found() => {
                self.ensure_namespace(namespace)?;
                self.timed(Primitive::Create, &target, || {
                    self.client.create(&def.plural, &object)
                })?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    pub fn get(&self, kind: Kind, namespace: &str, name: &str) -> StoreResult<ApiObject> {
        self.ensure_ready()?;
        let def = self.definition(kind)?;
        let target = format!("{}/{namespace}/{name}", def.plural);
        self.timed(Primitive::Get, &target, || {
            self.client.get(&def.plural, namespace, name)
        })
    }

    pub fn delete(&self, kind: Kind, namespace: &str, name: &str) -> StoreResult<()> {
        self.ensure_ready()?;
        let def = self.definition(kind)?;
        let target = format!("{}/{namespace}/{name}", def.plural);
        self.timed(Primitive::Delete, &target, || {
            self.client.delete(&def.plural, namespace, name)
        })
    }

    pub fn list(
        &self,
        kind: Kind,
        namespace: Option<&str>,
        selector: &LabelSelector,
    ) -> StoreResult<Vec<ApiObject>> {
        self.ensure_ready()?;
        let def = self.definition(kind)?;
        let target = match namespace {
            Some(ns) => format!("{}/{ns}", def.plural),
            None => def.plural.clone(),
        };
        self.timed(Primitive::List, &target, || {
            self.client.list(&def.plural, namespace, selector)
        })
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot("api")
    }
}

//! Timed primitive access to a coordination tree.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use super::TreeClient;
use crate::error::{StoreError, StoreResult};
use crate::stats::{DriverStats, Primitive, StatsSnapshot};

/// Wraps a [`TreeClient`] with per-call timing and the store's tree semantics:
/// insert and update are the same idempotent set, delete of an absent node is
/// a no-op, and listing a missing parent yields no children.
pub struct TreeDriver {
    client: Arc<dyn TreeClient>,
    stats: DriverStats,
}

impl TreeDriver {
    pub fn new(client: Arc<dyn TreeClient>) -> Self {
        Self {
            client,
            stats: DriverStats::new(),
        }
    }

    fn timed<T>(
        &self,
        primitive: Primitive,
        path: &str,
        call: impl FnOnce() -> StoreResult<T>,
    ) -> StoreResult<T> {
        let start = Instant::now();
        let result = call();
        let elapsed = start.elapsed();
        // Not-found is an expected answer, not a failed call.
        let ok = match &result {
            Ok(_) => true,
            Err(e) => e.is_not_found(),
        };
        self.stats.record(primitive, elapsed, ok);
        debug!(
            primitive = primitive.as_str(),
            %path,
            elapsed_us = elapsed.as_micros() as u64,
            ok,
            "tree call"
        );
        result
    }

    pub fn insert(&self, path: &str, data: &[u8]) -> StoreResult<()> {
        self.timed(Primitive::Set, path, || self.client.set(path, data))
    }

    pub fn update(&self, path: &str, data: &[u8]) -> StoreResult<()> {
        self.timed(Primitive::Set, path, || self.client.set(path, data))
    }

    pub fn exists(&self, path: &str) -> StoreResult<bool> {
        self.timed(Primitive::Exists, path, || self.client.exists(path))
    }

    pub fn fetch(&self, path: &str) -> StoreResult<Vec<u8>> {
        self.timed(Primitive::Get, path, || self.client.get(path))
    }

    /// Delete `path` if it exists.
    pub fn delete(&self, path: &str) -> StoreResult<()> {
        if !self.exists(path)? {
            debug!(%path, "tree delete skipped, node absent");
            return Ok(());
        }
        match self.timed(Primitive::Delete, path, || self.client.delete(path)) {
            // Lost a race with another deleter.
            Err(StoreError::NotFound(_)) => Ok(()),
            other => other,
        }
    }

    /// Child names of `path`; empty when `path` does not exist.
    pub fn list(&self, path: &str) -> StoreResult<Vec<String>> {
        match self.timed(Primitive::Children, path, || self.client.children(path)) {
            Err(StoreError::NotFound(_)) => Ok(Vec::new()),
            other => other,
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot("tree")
    }
}

//! The backend seam: one object-level contract, two structurally different
//! implementations.
//!
//! [`crate::tree::TreeBackend`] maps `(Kind, ObjectKey)` onto node paths in a
//! hierarchical coordination tree; [`crate::api::ApiBackend`] maps it onto
//! namespaced objects of declared resource types. Both save with the same
//! check-then-create-or-update upsert, so nothing above this trait branches on
//! which one is active.

use serde_json::Value;

use crate::error::StoreResult;
use crate::kind::{Kind, ObjectKey, Scope};
use crate::stats::StatsSnapshot;
use crate::types::Labels;

pub trait Backend: Send + Sync {
    /// Short backend name for logs and stats.
    fn name(&self) -> &'static str;

    /// Upsert the JSON form of an object.
    fn put(&self, kind: Kind, key: &ObjectKey, labels: &Labels, value: Value) -> StoreResult<()>;

    /// Read one object; [`crate::StoreError::NotFound`] if absent.
    fn get(&self, kind: Kind, key: &ObjectKey) -> StoreResult<Value>;

    fn remove(&self, kind: Kind, key: &ObjectKey) -> StoreResult<()>;

    /// Every object of `kind` matching `scope`.
    fn list(&self, kind: Kind, scope: &Scope) -> StoreResult<Vec<Value>>;

    /// Distinct domain namespaces holding at least one node of `kind`, sorted.
    fn namespaces(&self, kind: Kind) -> StoreResult<Vec<String>>;

    fn stats(&self) -> StatsSnapshot;
}

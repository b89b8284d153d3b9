//! API-object backend.
//!
//! An API server storing namespaced objects of declared resource types, each
//! object carrying the full domain value as its `spec`. [`ApiClient`] is the
//! wire seam, [`ApiDriver`] adds timing, first-use registration and the
//! upsert protocol, and [`ApiBackend`] maps entity kinds onto resources.

mod backend;
mod driver;
mod labels;
mod resources;
mod server;

pub use self::backend::ApiBackend;
pub use self::driver::ApiDriver;
pub use self::labels::{is_valid_label_key, is_valid_label_value, sanitize_labels};
pub use self::resources::{NamespacePolicy, definition, definitions, namespace_policy};
pub use self::server::RedbApiServer;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::StoreResult;

/// Equality-based label selector; an empty selector matches everything.
pub type LabelSelector = BTreeMap<String, String>;

/// Declaration of a resource type the backend stores objects under.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceDefinition {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub plural: String,
}

impl ResourceDefinition {
    pub fn api_version(&self) -> String {
        format!("{}/{}", self.group, self.version)
    }
}

/// Metadata of a stored API object.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ApiMeta {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    /// Opaque token assigned by the server on every write.
    #[serde(default)]
    pub resource_version: String,
}

/// A stored API object: metadata plus the embedded domain value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiObject {
    pub api_version: String,
    pub kind: String,
    pub metadata: ApiMeta,
    pub spec: serde_json::Value,
}

impl ApiObject {
    pub fn matches(&self, selector: &LabelSelector) -> bool {
        selector
            .iter()
            .all(|(k, v)| self.metadata.labels.get(k) == Some(v))
    }
}

/// Primitive operations of an API server.
pub trait ApiClient: Send + Sync {
    /// Declare a resource type. `AlreadyExists` if declared before.
    fn create_resource_type(&self, def: &ResourceDefinition) -> StoreResult<()>;

    /// `AlreadyExists` if the namespace exists.
    fn create_namespace(&self, name: &str) -> StoreResult<()>;

    fn list_namespaces(&self) -> StoreResult<Vec<String>>;

    fn get(&self, plural: &str, namespace: &str, name: &str) -> StoreResult<ApiObject>;

    /// Store a new object; the returned copy carries its resource version.
    fn create(&self, plural: &str, object: &ApiObject) -> StoreResult<ApiObject>;

    /// Overwrite an existing object. `Conflict` when `object` carries a stale
    /// resource version.
    fn update(&self, plural: &str, object: &ApiObject) -> StoreResult<ApiObject>;

    fn delete(&self, plural: &str, namespace: &str, name: &str) -> StoreResult<()>;

    /// Objects of a resource type, in one namespace or all of them.
    fn list(
        &self,
        plural: &str,
        namespace: Option<&str>,
        selector: &LabelSelector,
    ) -> StoreResult<Vec<ApiObject>>;
}

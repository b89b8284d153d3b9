//! Entity kinds, object keys and the [`Entity`] trait.
//!
//! Every persisted domain type names its [`Kind`] and derives an
//! [`ObjectKey`] from its own fields. Backends translate `(Kind, ObjectKey)`
//! into a tree path or an API object coordinate; nothing above the backend
//! layer knows which one is in use.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::ids::{TaskGroupId, TaskId};
use crate::types::*;

/// Every entity kind the store persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Framework,
    Application,
    Version,
    TaskGroup,
    Task,
    Agent,
    AgentSetting,
    AgentSchedInfo,
    ConfigMap,
    Secret,
    Service,
    Endpoint,
    Deployment,
    Command,
    CustomResourceRegister,
    CustomResourceDefinition,
    AdmissionWebhook,
}

/// Which key segments a kind uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyShape {
    /// One object per cluster.
    Singleton,
    /// `name` only.
    Cluster,
    /// `(namespace, name)`.
    Namespaced,
    /// `(namespace, owner application, name)`.
    Owned,
    /// `(owner custom kind, namespace, name)`.
    KindScoped,
}

impl Kind {
    pub const ALL: [Kind; 17] = [
        Kind::Framework,
        Kind::Application,
        Kind::Version,
        Kind::TaskGroup,
        Kind::Task,
        Kind::Agent,
        Kind::AgentSetting,
        Kind::AgentSchedInfo,
        Kind::ConfigMap,
        Kind::Secret,
        Kind::Service,
        Kind::Endpoint,
        Kind::Deployment,
        Kind::Command,
        Kind::CustomResourceRegister,
        Kind::CustomResourceDefinition,
        Kind::AdmissionWebhook,
    ];

    /// Lower-case node name, used as the tree segment and in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Framework => "frameworkid",
            Kind::Application => "application",
            Kind::Version => "version",
            Kind::TaskGroup => "taskgroup",
            Kind::Task => "task",
            Kind::Agent => "agent",
            Kind::AgentSetting => "agentsetting",
            Kind::AgentSchedInfo => "agentschedinfo",
            Kind::ConfigMap => "configmap",
            Kind::Secret => "secret",
            Kind::Service => "service",
            Kind::Endpoint => "endpoint",
            Kind::Deployment => "deployment",
            Kind::Command => "command",
            Kind::CustomResourceRegister => "crr",
            Kind::CustomResourceDefinition => "crd",
            Kind::AdmissionWebhook => "admissionwebhook",
        }
    }

    pub fn shape(self) -> KeyShape {
        match self {
            Kind::Framework => KeyShape::Singleton,
            Kind::Agent
            | Kind::AgentSetting
            | Kind::AgentSchedInfo
            | Kind::Command
            | Kind::CustomResourceRegister => KeyShape::Cluster,
            Kind::Application
            | Kind::ConfigMap
            | Kind::Secret
            | Kind::Service
            | Kind::Endpoint
            | Kind::Deployment
            | Kind::AdmissionWebhook => KeyShape::Namespaced,
            Kind::Version | Kind::TaskGroup | Kind::Task => KeyShape::Owned,
            Kind::CustomResourceDefinition => KeyShape::KindScoped,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend-neutral object coordinate. Unused segments are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub namespace: String,
    /// Owning application ID for versions, task groups and tasks; the custom
    /// kind for custom resource definitions.
    pub owner: String,
    pub name: String,
}

impl ObjectKey {
    pub fn singleton() -> Self {
        Self::default()
    }

    pub fn cluster(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn namespaced(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn owned(namespace: &str, owner: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            owner: owner.to_string(),
            name: name.to_string(),
        }
    }

    pub fn kind_scoped(kind: &str, namespace: &str, name: &str) -> Self {
        Self::owned(namespace, kind, name)
    }
}

/// `namespace/owner/name` with empty segments left out, the order the
/// tree lays owned objects out in.
impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [&self.namespace, &self.owner, &self.name]
            .into_iter()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .collect();
        f.write_str(&parts.join("/"))
    }
}

/// Filter for list operations. `None` means "every value".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    pub namespace: Option<String>,
    pub owner: Option<String>,
}

impl Scope {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn namespace(namespace: &str) -> Self {
        Self {
            namespace: Some(namespace.to_string()),
            owner: None,
        }
    }

    pub fn owner(namespace: &str, owner: &str) -> Self {
        Self {
            namespace: Some(namespace.to_string()),
            owner: Some(owner.to_string()),
        }
    }

    pub fn custom_kind(kind: &str, namespace: Option<&str>) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            owner: Some(kind.to_string()),
        }
    }
}

/// A persisted domain type.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: Kind;

    /// Backend-neutral key. Fails only when a composite ID does not split.
    fn key(&self) -> StoreResult<ObjectKey>;

    /// Labels to surface on backends that index them.
    fn labels(&self) -> Labels {
        Labels::new()
    }
}

/// The cluster's framework registration ID.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct FrameworkId(pub String);

/// Persistence form of a [`TaskGroup`]: the group without its tasks plus the
/// ordered IDs needed to resolve them again.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskGroupRecord {
    #[serde(flatten)]
    pub group: TaskGroup,
    #[serde(default)]
    pub task_ids: Vec<String>,
}

impl TaskGroupRecord {
    pub fn from_group(group: &TaskGroup) -> Self {
        let task_ids = group.tasks.iter().map(|t| t.id.clone()).collect();
        let mut group = group.clone();
        group.tasks.clear();
        Self { group, task_ids }
    }

    /// Reattach resolved tasks.
    pub fn into_group(self, tasks: Vec<Task>) -> TaskGroup {
        let mut group = self.group;
        group.tasks = tasks;
        group
    }
}

impl Entity for FrameworkId {
    const KIND: Kind = Kind::Framework;

    fn key(&self) -> StoreResult<ObjectKey> {
        Ok(ObjectKey::singleton())
    }
}

impl Entity for Application {
    const KIND: Kind = Kind::Application;

    fn key(&self) -> StoreResult<ObjectKey> {
        Ok(ObjectKey::namespaced(&self.run_as, &self.id))
    }

    fn labels(&self) -> Labels {
        self.labels.clone()
    }
}

impl Entity for Version {
    const KIND: Kind = Kind::Version;

    fn key(&self) -> StoreResult<ObjectKey> {
        Ok(ObjectKey::owned(&self.run_as, &self.id, &self.version_no))
    }

    fn labels(&self) -> Labels {
        self.labels.clone()
    }
}

impl Entity for TaskGroupRecord {
    const KIND: Kind = Kind::TaskGroup;

    fn key(&self) -> StoreResult<ObjectKey> {
        let id: TaskGroupId = self.group.id.parse()?;
        Ok(ObjectKey::owned(&id.namespace, &id.app_id, &self.group.id))
    }

    fn labels(&self) -> Labels {
        self.group.labels.clone()
    }
}

impl Entity for Task {
    const KIND: Kind = Kind::Task;

    fn key(&self) -> StoreResult<ObjectKey> {
        let id: TaskId = self.id.parse()?;
        Ok(ObjectKey::owned(&id.namespace, &id.app_id, &self.id))
    }
}

impl Entity for Agent {
    const KIND: Kind = Kind::Agent;

    fn key(&self) -> StoreResult<ObjectKey> {
        Ok(ObjectKey::cluster(&self.key))
    }
}

impl Entity for AgentSetting {
    const KIND: Kind = Kind::AgentSetting;

    fn key(&self) -> StoreResult<ObjectKey> {
        Ok(ObjectKey::cluster(&self.inner_ip))
    }
}

impl Entity for AgentSchedInfo {
    const KIND: Kind = Kind::AgentSchedInfo;

    fn key(&self) -> StoreResult<ObjectKey> {
        Ok(ObjectKey::cluster(&self.hostname))
    }
}

impl Entity for Command {
    const KIND: Kind = Kind::Command;

    fn key(&self) -> StoreResult<ObjectKey> {
        Ok(ObjectKey::cluster(&self.id))
    }
}

impl Entity for CustomResourceRegister {
    const KIND: Kind = Kind::CustomResourceRegister;

    fn key(&self) -> StoreResult<ObjectKey> {
        Ok(ObjectKey::cluster(&self.names.kind))
    }

    fn labels(&self) -> Labels {
        self.meta.labels.clone()
    }
}

impl Entity for CustomResourceDefinition {
    const KIND: Kind = Kind::CustomResourceDefinition;

    fn key(&self) -> StoreResult<ObjectKey> {
        Ok(ObjectKey::kind_scoped(
            &self.kind,
            &self.meta.namespace,
            &self.meta.name,
        ))
    }

    fn labels(&self) -> Labels {
        self.meta.labels.clone()
    }
}

/// Kinds keyed by their embedded [`ObjectMeta`].
macro_rules! meta_entity {
    ($ty:ty, $kind:expr) => {
        impl Entity for $ty {
            const KIND: Kind = $kind;

            fn key(&self) -> StoreResult<ObjectKey> {
                Ok(ObjectKey::namespaced(&self.meta.namespace, &self.meta.name))
            }

            fn labels(&self) -> Labels {
                self.meta.labels.clone()
            }
        }
    };
}

meta_entity!(ConfigMap, Kind::ConfigMap);
meta_entity!(Secret, Kind::Secret);
meta_entity!(Service, Kind::Service);
meta_entity!(Endpoint, Kind::Endpoint);
meta_entity!(Deployment, Kind::Deployment);
meta_entity!(AdmissionWebhookConfiguration, Kind::AdmissionWebhook);

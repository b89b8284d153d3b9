//! Domain types for the scheduler object store.
//!
//! These are the scheduling objects the scheduler's business logic saves and
//! queries. Every type is a plain value: `Clone` is the deep copy handed across
//! the cache boundary and `PartialEq` is the structural comparison used when
//! verifying migrated objects.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Free-form string labels attached to an object.
pub type Labels = HashMap<String, String>;

// ── Shared ────────────────────────────────────────────────────────

/// Kubernetes-shaped object metadata embedded in config-style kinds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub annotations: Labels,
    /// Unix timestamp (seconds) of creation.
    #[serde(default)]
    pub creation_timestamp: i64,
}

impl ObjectMeta {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            ..Default::default()
        }
    }
}

/// Resource quantities requested or consumed by a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    pub cpus: f64,
    /// Memory in MiB.
    pub mem: f64,
    /// Disk in MiB.
    pub disk: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortMapping {
    pub name: String,
    pub container_port: u32,
    /// Negative host port means "assign dynamically".
    pub host_port: i32,
    pub protocol: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Container {
    pub image: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    pub resources: Resource,
    #[serde(default)]
    pub ports: Vec<PortMapping>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RestartPolicy {
    /// "Never", "Always" or "OnFailure".
    pub policy: String,
    pub interval_secs: u32,
    pub backoff: u32,
    pub max_times: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KillPolicy {
    pub grace_period_secs: u32,
}

// ── Application ───────────────────────────────────────────────────

/// Lifecycle status of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppStatus {
    Staging,
    Deploying,
    Running,
    Finish,
    Error,
    Operating,
    RollingUpdate,
    Abnormal,
    Deleting,
}

/// A scheduled application, keyed by `(run_as, id)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Application {
    /// Application ID, unique within its namespace.
    pub id: String,
    pub name: String,
    /// Namespace (tenant partition).
    pub run_as: String,
    pub cluster_id: String,
    /// "APP" or "PROCESS".
    pub kind: String,
    pub define_instances: u64,
    pub instances: u64,
    pub running_instances: u64,
    pub status: AppStatus,
    pub last_status: AppStatus,
    #[serde(default)]
    pub sub_status: String,
    #[serde(default)]
    pub message: String,
    pub created: i64,
    pub update_time: i64,
    #[serde(default)]
    pub labels: Labels,
    /// IDs of the task groups owned by this application.
    #[serde(default)]
    pub pods: Vec<String>,
}

/// An immutable definition snapshot of an application.
///
/// `version_no` is the creation-time nanosecond timestamp; the current version
/// of an application is the one whose number sorts highest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Version {
    /// Owning application ID.
    pub id: String,
    pub version_no: String,
    pub run_as: String,
    pub name: String,
    pub instances: u64,
    #[serde(default)]
    pub containers: Vec<Container>,
    #[serde(default)]
    pub labels: Labels,
    pub restart_policy: Option<RestartPolicy>,
    pub kill_policy: Option<KillPolicy>,
    #[serde(default)]
    pub constraints: Vec<String>,
    /// The definition exactly as submitted.
    #[serde(default)]
    pub raw_json: String,
}

// ── TaskGroup / Task ──────────────────────────────────────────────

/// Lifecycle status shared by task groups and tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Staging,
    Starting,
    Running,
    Finish,
    Error,
    Killing,
    Killed,
    Failed,
    Lost,
}

/// One instance of an application: a group of co-located tasks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskGroup {
    /// Five-field composite ID, see [`crate::ids::TaskGroupId`].
    pub id: String,
    pub name: String,
    pub app_id: String,
    pub run_as: String,
    pub instance_id: u64,
    #[serde(default)]
    pub agent_id: String,
    #[serde(default)]
    pub executor_id: String,
    #[serde(default)]
    pub hostname: String,
    pub status: TaskStatus,
    pub last_status: TaskStatus,
    #[serde(default)]
    pub version_name: String,
    pub start_time: i64,
    pub update_time: i64,
    #[serde(default)]
    pub resched_times: u32,
    #[serde(default)]
    pub message: String,
    pub launch_resource: Option<Resource>,
    #[serde(default)]
    pub labels: Labels,
    pub restart_policy: Option<RestartPolicy>,
    pub kill_policy: Option<KillPolicy>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// A single container task within a task group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// Six-field composite ID, see [`crate::ids::TaskId`].
    pub id: String,
    pub name: String,
    pub app_id: String,
    pub run_as: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub agent_ip: String,
    pub container: Container,
    pub status: TaskStatus,
    pub last_status: TaskStatus,
    #[serde(default)]
    pub status_data: String,
    #[serde(default)]
    pub healthy: bool,
    pub updated: i64,
    #[serde(default)]
    pub message: String,
}

// ── Agents ────────────────────────────────────────────────────────

/// Node inventory synced from the cluster, keyed by inner IP.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Agent {
    /// Inner IP of the node.
    pub key: String,
    pub last_sync_time: i64,
    /// Opaque agent description as reported by the cluster master.
    pub agent_info: String,
}

/// User-configured node attributes, keyed by inner IP.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AgentSetting {
    pub inner_ip: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub attr_strings: HashMap<String, String>,
    #[serde(default)]
    pub attr_scalars: HashMap<String, f64>,
    /// Task group IDs pinned to this node.
    #[serde(default)]
    pub pods: Vec<String>,
}

/// Scheduler-computed node state, keyed by hostname.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AgentSchedInfo {
    pub hostname: String,
    pub delta_cpu: f64,
    pub delta_mem: f64,
    pub delta_disk: f64,
}

// ── Config objects ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigMapItemType {
    File,
    Env,
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigMapItem {
    pub item_type: ConfigMapItemType,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub remote_url: String,
    #[serde(default)]
    pub remote_user: String,
    #[serde(default)]
    pub remote_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigMap {
    pub meta: ObjectMeta,
    #[serde(default)]
    pub data: HashMap<String, ConfigMapItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecretItem {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Secret {
    pub meta: ObjectMeta,
    #[serde(default)]
    pub secret_type: String,
    #[serde(default)]
    pub data: HashMap<String, SecretItem>,
}

// ── Services ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServicePort {
    pub name: String,
    pub protocol: String,
    pub port: u32,
    #[serde(default)]
    pub target_port: u32,
    #[serde(default)]
    pub node_port: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServiceSpec {
    #[serde(default)]
    pub selector: Labels,
    #[serde(default)]
    pub service_type: String,
    #[serde(default)]
    pub cluster_ip: Vec<String>,
    #[serde(default)]
    pub ports: Vec<ServicePort>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub meta: ObjectMeta,
    pub spec: ServiceSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndpointTarget {
    pub network_mode: String,
    pub network_ip: String,
    pub node_ip: String,
    #[serde(default)]
    pub ports: Vec<PortMapping>,
}

/// Resolved backends of a service; shares its service's `(namespace, name)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Endpoint {
    pub meta: ObjectMeta,
    #[serde(default)]
    pub endpoints: Vec<EndpointTarget>,
}

// ── Deployment ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Deploying,
    Running,
    Updating,
    UpdatePaused,
    UpdateSuspend,
    Deleting,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RollingUpdate {
    pub max_unavailable: u32,
    pub max_surge: u32,
    pub up_interval_secs: u32,
    /// "CreateFirst" or "DeleteFirst".
    pub rolling_order: String,
    #[serde(default)]
    pub rolling_manually: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpgradeStrategy {
    pub strategy_type: String,
    pub rolling_update: Option<RollingUpdate>,
}

/// Reference from a deployment to one of the applications it rolls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeploymentApp {
    pub application_name: String,
    pub current_target_instances: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Deployment {
    pub meta: ObjectMeta,
    #[serde(default)]
    pub selector: Labels,
    #[serde(default)]
    pub strategy: UpgradeStrategy,
    pub status: DeploymentStatus,
    pub application: Option<DeploymentApp>,
    pub application_ext: Option<DeploymentApp>,
    #[serde(default)]
    pub is_in_rolling: bool,
    #[serde(default)]
    pub curr_rolling_op: String,
    #[serde(default)]
    pub raw_json: String,
    #[serde(default)]
    pub message: String,
}

// ── Command ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandTarget {
    pub kind: String,
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub task_groups: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskCommandStatus {
    pub task_id: String,
    pub status: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskGroupCommandStatus {
    pub task_group_id: String,
    #[serde(default)]
    pub tasks: Vec<TaskCommandStatus>,
}

/// An ad-hoc command executed inside running task groups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Command {
    pub id: String,
    pub target: CommandTarget,
    pub cmd: Vec<String>,
    #[serde(default)]
    pub env: Vec<String>,
    pub create_time: i64,
    #[serde(default)]
    pub status: Vec<TaskGroupCommandStatus>,
}

// ── Custom resources ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomResourceNames {
    pub kind: String,
    pub plural: String,
    #[serde(default)]
    pub singular: String,
    #[serde(default)]
    pub short_names: Vec<String>,
}

/// Registration of a user-declared custom resource kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomResourceRegister {
    pub api_version: String,
    pub meta: ObjectMeta,
    pub group: String,
    pub version: String,
    /// "Namespaced" or "Cluster".
    pub scope: String,
    pub names: CustomResourceNames,
}

/// An instance of a registered custom resource kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomResourceDefinition {
    pub api_version: String,
    pub kind: String,
    pub meta: ObjectMeta,
    #[serde(default)]
    pub spec: serde_json::Value,
}

// ── Admission ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourcesRef {
    /// "Create", "Update" or "Delete".
    pub operation: String,
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebhookClientConfig {
    #[serde(default)]
    pub ca_bundle: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdmissionWebhook {
    pub name: String,
    /// "Ignore" or "Fail".
    pub failure_policy: String,
    pub client_config: WebhookClientConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdmissionWebhookConfiguration {
    pub meta: ObjectMeta,
    pub resources_ref: ResourcesRef,
    #[serde(default)]
    pub admission_webhooks: Vec<AdmissionWebhook>,
}

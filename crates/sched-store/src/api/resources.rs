//! Resource-type declarations, one per entity kind.

use crate::config::ApiConfig;
use crate::kind::Kind;

use super::ResourceDefinition;

/// Where objects of a kind live on the API server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespacePolicy {
    /// The domain namespace is the API namespace.
    Domain,
    /// Pinned to the internal namespace.
    Internal,
    /// `{custom_kind}-{namespace}`, so same-named definitions of different
    /// custom kinds never collide.
    CustomKind,
}

pub fn namespace_policy(kind: Kind) -> NamespacePolicy {
    match kind {
        Kind::Framework
        | Kind::Agent
        | Kind::AgentSetting
        | Kind::AgentSchedInfo
        | Kind::Command
        | Kind::CustomResourceRegister
        | Kind::AdmissionWebhook => NamespacePolicy::Internal,
        Kind::CustomResourceDefinition => NamespacePolicy::CustomKind,
        Kind::Application
        | Kind::Version
        | Kind::TaskGroup
        | Kind::Task
        | Kind::ConfigMap
        | Kind::Secret
        | Kind::Service
        | Kind::Endpoint
        | Kind::Deployment => NamespacePolicy::Domain,
    }
}

fn names(kind: Kind) -> (&'static str, &'static str) {
    match kind {
        Kind::Framework => ("Framework", "frameworks"),
        Kind::Application => ("Application", "applications"),
        Kind::Version => ("Version", "versions"),
        Kind::TaskGroup => ("TaskGroup", "taskgroups"),
        Kind::Task => ("Task", "tasks"),
        Kind::Agent => ("Agent", "agents"),
        Kind::AgentSetting => ("AgentSetting", "agentsettings"),
        Kind::AgentSchedInfo => ("AgentSchedInfo", "agentschedinfos"),
        Kind::ConfigMap => ("BcsConfigMap", "bcsconfigmaps"),
        Kind::Secret => ("BcsSecret", "bcssecrets"),
        Kind::Service => ("BcsService", "bcsservices"),
        Kind::Endpoint => ("BcsEndpoint", "bcsendpoints"),
        Kind::Deployment => ("Deployment", "deployments"),
        Kind::Command => ("BcsCommandInfo", "bcscommandinfos"),
        Kind::CustomResourceRegister => ("Crr", "crrs"),
        Kind::CustomResourceDefinition => ("Crd", "crds"),
        Kind::AdmissionWebhook => (
            "AdmissionWebhookConfiguration",
            "admissionwebhookconfigurations",
        ),
    }
}

pub fn definition(kind: Kind, config: &ApiConfig) -> ResourceDefinition {
    let (api_kind, plural) = names(kind);
    ResourceDefinition {
        group: config.group.clone(),
        version: config.version.clone(),
        kind: api_kind.to_string(),
        plural: plural.to_string(),
    }
}

/// Declarations for every kind, registered on first use.
pub fn definitions(config: &ApiConfig) -> Vec<ResourceDefinition> {
    Kind::ALL.iter().map(|k| definition(*k, config)).collect()
}

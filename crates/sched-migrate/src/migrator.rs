//! The ordered, verified copy from the legacy store to the target store.
//!
//! Phases run strictly in sequence:
//!
//! 1. framework ID
//! 2. applications, each followed by its versions and task groups (with tasks)
//! 3. agents, then agent settings
//! 4. config maps
//! 5. secrets
//! 6. services, each followed by its endpoint
//! 7. deployments
//! 8. admission webhooks
//! 9. custom resource registers, then every registered kind's definitions
//!
//! Each object is read from legacy, written to target, read back from target
//! and compared with the legacy copy. The first error or mismatch ends the
//! run. Commands and agent scheduling info are transient and not copied.

use serde::Serialize;
use sched_store::{Kind, Store, StoreResult};
use tracing::{error, info, warn};

use crate::error::{MigrateError, MigrateResult};

/// Secret name rewritten on the way over.
pub const LEGACY_IMAGE_SECRET: &str = "paas_image_secret";
pub const IMAGE_SECRET: &str = "paas-image-secret";

/// Per-kind counts of migrated objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub framework_id: bool,
    pub applications: usize,
    pub versions: usize,
    pub task_groups: usize,
    pub tasks: usize,
    pub agents: usize,
    pub agent_settings: usize,
    pub configmaps: usize,
    pub secrets: usize,
    pub renamed_secrets: usize,
    pub services: usize,
    pub endpoints: usize,
    pub missing_endpoints: usize,
    pub deployments: usize,
    pub admission_webhooks: usize,
    pub custom_resource_registers: usize,
    pub custom_resource_definitions: usize,
}

impl MigrationReport {
    /// Objects written to the target.
    pub fn total(&self) -> usize {
        usize::from(self.framework_id)
            + self.applications
            + self.versions
            + self.task_groups
            + self.tasks
            + self.agents
            + self.agent_settings
            + self.configmaps
            + self.secrets
            + self.services
            + self.endpoints
            + self.deployments
            + self.admission_webhooks
            + self.custom_resource_registers
            + self.custom_resource_definitions
    }
}

pub struct Migrator<'a> {
    legacy: &'a Store,
    target: &'a Store,
    report: MigrationReport,
}

impl<'a> Migrator<'a> {
    /// Both stores must already be initialized.
    pub fn new(legacy: &'a Store, target: &'a Store) -> Self {
        Self {
            legacy,
            target,
            report: MigrationReport::default(),
        }
    }

    pub fn run(mut self) -> MigrateResult<MigrationReport> {
        info!(
            legacy = self.legacy.backend_name(),
            target = self.target.backend_name(),
            "migration started"
        );
        self.migrate_framework_id()?;
        self.migrate_applications()?;
        self.migrate_agents()?;
        self.migrate_configmaps()?;
        self.migrate_secrets()?;
        self.migrate_services()?;
        self.migrate_deployments()?;
        self.migrate_admission_webhooks()?;
        self.migrate_custom_resources()?;
        info!(objects = self.report.total(), "migration finished");
        Ok(self.report)
    }

    /// Write `value` to the target, read it back and compare.
    fn copy<T: PartialEq>(
        &self,
        kind: Kind,
        id: &str,
        value: &T,
        save: impl FnOnce(&Store, &T) -> StoreResult<()>,
        fetch: impl FnOnce(&Store) -> StoreResult<T>,
    ) -> MigrateResult<()> {
        save(self.target, value).map_err(MigrateError::store(kind, id))?;
        let read_back = fetch(self.target).map_err(MigrateError::store(kind, id))?;
        if read_back != *value {
            error!(%kind, %id, "read-back mismatch");
            return Err(MigrateError::Mismatch {
                kind,
                id: id.to_string(),
            });
        }
        info!(%kind, %id, "migrated");
        Ok(())
    }

    fn migrate_framework_id(&mut self) -> MigrateResult<()> {
        let kind = Kind::Framework;
        let present = self
            .legacy
            .has_framework_id()
            .map_err(MigrateError::store(kind, "frameworkid"))?;
        if !present {
            warn!("legacy store has no framework id");
            return Ok(());
        }
        let id = self
            .legacy
            .fetch_framework_id()
            .map_err(MigrateError::store(kind, "frameworkid"))?;
        self.copy(
            kind,
            &id,
            &id,
            |s, v| s.save_framework_id(v),
            |s| s.fetch_framework_id(),
        )?;
        self.report.framework_id = true;
        Ok(())
    }

    fn migrate_applications(&mut self) -> MigrateResult<()> {
        let namespaces = self
            .legacy
            .list_run_as()
            .map_err(MigrateError::store(Kind::Application, "*"))?;
        for ns in &namespaces {
            let app_ids = self
                .legacy
                .list_application_nodes(ns)
                .map_err(MigrateError::store(Kind::Application, ns))?;
            for app_id in &app_ids {
                self.migrate_application(ns, app_id)?;
            }
        }
        Ok(())
    }

    fn migrate_application(&mut self, ns: &str, app_id: &str) -> MigrateResult<()> {
        let id = format!("{ns}/{app_id}");
        let app = self
            .legacy
            .fetch_application(ns, app_id)
            .map_err(MigrateError::store(Kind::Application, &id))?;
        self.copy(
            Kind::Application,
            &id,
            &app,
            |s, v| s.save_application(v),
            |s| s.fetch_application(ns, app_id),
        )?;
        self.report.applications += 1;

        let version_nos = self
            .legacy
            .list_versions(ns, app_id)
            .map_err(MigrateError::store(Kind::Version, &id))?;
        for no in &version_nos {
            let vid = format!("{id}/{no}");
            let version = self
                .legacy
                .fetch_version(ns, app_id, no)
                .map_err(MigrateError::store(Kind::Version, &vid))?;
            self.copy(
                Kind::Version,
                &vid,
                &version,
                |s, v| s.save_version(v),
                |s| s.fetch_version(ns, app_id, no),
            )?;
            self.report.versions += 1;
        }

        let groups = self
            .legacy
            .list_task_groups(ns, app_id)
            .map_err(MigrateError::store(Kind::TaskGroup, &id))?;
        for group in &groups {
            self.copy(
                Kind::TaskGroup,
                &group.id,
                group,
                |s, v| s.save_task_group(v),
                |s| s.fetch_task_group(&group.id),
            )?;
            self.report.task_groups += 1;
            self.report.tasks += group.tasks.len();
        }
        Ok(())
    }

    fn migrate_agents(&mut self) -> MigrateResult<()> {
        let agents = self
            .legacy
            .list_all_agents()
            .map_err(MigrateError::store(Kind::Agent, "*"))?;
        for agent in &agents {
            self.copy(
                Kind::Agent,
                &agent.key,
                agent,
                |s, v| s.save_agent(v),
                |s| s.fetch_agent(&agent.key),
            )?;
            self.report.agents += 1;
        }

        let settings = self
            .legacy
            .list_all_agent_settings()
            .map_err(MigrateError::store(Kind::AgentSetting, "*"))?;
        for setting in &settings {
            self.copy(
                Kind::AgentSetting,
                &setting.inner_ip,
                setting,
                |s, v| s.save_agent_setting(v),
                |s| s.fetch_agent_setting(&setting.inner_ip),
            )?;
            self.report.agent_settings += 1;
        }
        Ok(())
    }

    fn migrate_configmaps(&mut self) -> MigrateResult<()> {
        let configmaps = self
            .legacy
            .list_all_configmaps()
            .map_err(MigrateError::store(Kind::ConfigMap, "*"))?;
        for cm in &configmaps {
            let (ns, name) = (&cm.meta.namespace, &cm.meta.name);
            self.copy(
                Kind::ConfigMap,
                &format!("{ns}/{name}"),
                cm,
                |s, v| s.save_configmap(v),
                |s| s.fetch_configmap(ns, name),
            )?;
            self.report.configmaps += 1;
        }
        Ok(())
    }

    fn migrate_secrets(&mut self) -> MigrateResult<()> {
        let secrets = self
            .legacy
            .list_all_secrets()
            .map_err(MigrateError::store(Kind::Secret, "*"))?;
        for mut secret in secrets {
            if secret.meta.name == LEGACY_IMAGE_SECRET {
                info!(
                    namespace = %secret.meta.namespace,
                    from = LEGACY_IMAGE_SECRET,
                    to = IMAGE_SECRET,
                    "renaming secret"
                );
                secret.meta.name = IMAGE_SECRET.to_string();
                self.report.renamed_secrets += 1;
            }
            let (ns, name) = (&secret.meta.namespace, &secret.meta.name);
            self.copy(
                Kind::Secret,
                &format!("{ns}/{name}"),
                &secret,
                |s, v| s.save_secret(v),
                |s| s.fetch_secret(ns, name),
            )?;
            self.report.secrets += 1;
        }
        Ok(())
    }

    fn migrate_services(&mut self) -> MigrateResult<()> {
        let services = self
            .legacy
            .list_all_services()
            .map_err(MigrateError::store(Kind::Service, "*"))?;
        for svc in &services {
            let (ns, name) = (&svc.meta.namespace, &svc.meta.name);
            let id = format!("{ns}/{name}");
            self.copy(
                Kind::Service,
                &id,
                svc,
                |s, v| s.save_service(v),
                |s| s.fetch_service(ns, name),
            )?;
            self.report.services += 1;

            let endpoint = match self.legacy.fetch_endpoint(ns, name) {
                Ok(ep) => ep,
                Err(e) if e.is_not_found() => {
                    warn!(service = %id, "service has no endpoint, skipped");
                    self.report.missing_endpoints += 1;
                    continue;
                }
                Err(e) => return Err(MigrateError::store(Kind::Endpoint, &id)(e)),
            };
            self.copy(
                Kind::Endpoint,
                &id,
                &endpoint,
                |s, v| s.save_endpoint(v),
                |s| s.fetch_endpoint(ns, name),
            )?;
            self.report.endpoints += 1;
        }
        Ok(())
    }

    fn migrate_deployments(&mut self) -> MigrateResult<()> {
        let deployments = self
            .legacy
            .list_all_deployments()
            .map_err(MigrateError::store(Kind::Deployment, "*"))?;
        for dep in &deployments {
            let (ns, name) = (&dep.meta.namespace, &dep.meta.name);
            self.copy(
                Kind::Deployment,
                &format!("{ns}/{name}"),
                dep,
                |s, v| s.save_deployment(v),
                |s| s.fetch_deployment(ns, name),
            )?;
            self.report.deployments += 1;
        }
        Ok(())
    }

    fn migrate_admission_webhooks(&mut self) -> MigrateResult<()> {
        let hooks = self
            .legacy
            .list_all_admission_webhooks()
            .map_err(MigrateError::store(Kind::AdmissionWebhook, "*"))?;
        for hook in &hooks {
            let (ns, name) = (&hook.meta.namespace, &hook.meta.name);
            self.copy(
                Kind::AdmissionWebhook,
                &format!("{ns}/{name}"),
                hook,
                |s, v| s.save_admission_webhook(v),
                |s| s.fetch_admission_webhook(ns, name),
            )?;
            self.report.admission_webhooks += 1;
        }
        Ok(())
    }

    fn migrate_custom_resources(&mut self) -> MigrateResult<()> {
        let registers = self
            .legacy
            .list_all_custom_resource_registers()
            .map_err(MigrateError::store(Kind::CustomResourceRegister, "*"))?;
        for crr in &registers {
            let custom_kind = &crr.names.kind;
            self.copy(
                Kind::CustomResourceRegister,
                custom_kind,
                crr,
                |s, v| s.save_custom_resource_register(v),
                |s| s.fetch_custom_resource_register(custom_kind),
            )?;
            self.report.custom_resource_registers += 1;

            let definitions = self
                .legacy
                .list_all_custom_resource_definitions(custom_kind)
                .map_err(MigrateError::store(Kind::CustomResourceDefinition, custom_kind))?;
            for crd in &definitions {
                let (ns, name) = (&crd.meta.namespace, &crd.meta.name);
                self.copy(
                    Kind::CustomResourceDefinition,
                    &format!("{custom_kind}/{ns}/{name}"),
                    crd,
                    |s, v| s.save_custom_resource_definition(v),
                    |s| s.fetch_custom_resource_definition(custom_kind, ns, name),
                )?;
                self.report.custom_resource_definitions += 1;
            }
        }
        Ok(())
    }
}

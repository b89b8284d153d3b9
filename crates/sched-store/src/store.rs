//! The store contract the scheduler programs against.
//!
//! [`Store`] fronts an [`EntityStore`] with the write-through [`Cache`] and
//! the per-ID lock pools. Nothing may be called before
//! [`Store::init_cache_mgr`]; with caching enabled, applications, versions,
//! task groups, tasks, agents, agent settings, config maps and secrets are
//! read from memory only, and every mutation writes the backend first and the
//! cache second.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::api::{ApiBackend, ApiClient};
use crate::backend::Backend;
use crate::cache::Cache;
use crate::config::{ApiConfig, StoreConfig, TreeConfig};
use crate::entity::{EntityStore, task_group_key, task_key};
use crate::error::{StoreError, StoreResult};
use crate::ids::sort_version_nos;
use crate::kind::{Entity, Kind, ObjectKey, Scope};
use crate::lock::{LockPool, PoolGuard};
use crate::stats::StatsSnapshot;
use crate::tree::{TreeBackend, TreeClient};
use crate::types::*;

enum CacheMode {
    Uninitialized,
    Direct,
    Cached(Arc<Cache>),
}

fn not_found(kind: Kind, key: &ObjectKey) -> StoreError {
    StoreError::NotFound(format!("{kind} {key}"))
}

pub struct Store {
    entities: EntityStore,
    mode: RwLock<CacheMode>,
    application_locks: LockPool,
    deployment_locks: LockPool,
    command_locks: LockPool,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

/// Save, fetch, delete and list for a namespaced kind that is never cached.
macro_rules! namespaced_direct {
    ($ty:ty, $save:ident, $fetch:ident, $delete:ident, $list:ident, $list_all:ident) => {
        pub fn $save(&self, value: &$ty) -> StoreResult<()> {
            self.direct()?.save(value)
        }

        pub fn $fetch(&self, namespace: &str, name: &str) -> StoreResult<$ty> {
            self.direct()?.fetch(&ObjectKey::namespaced(namespace, name))
        }

        pub fn $delete(&self, namespace: &str, name: &str) -> StoreResult<()> {
            self.direct()?
                .delete::<$ty>(&ObjectKey::namespaced(namespace, name))
        }

        pub fn $list(&self, namespace: &str) -> StoreResult<Vec<$ty>> {
            self.direct()?.list(&Scope::namespace(namespace))
        }

        pub fn $list_all(&self) -> StoreResult<Vec<$ty>> {
            self.direct()?.list(&Scope::all())
        }
    };
}

impl Store {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            entities: EntityStore::new(backend),
            mode: RwLock::new(CacheMode::Uninitialized),
            application_locks: LockPool::new("application"),
            deployment_locks: LockPool::new("deployment"),
            command_locks: LockPool::new("command"),
        }
    }

    /// A store over a hierarchical coordination tree.
    pub fn tree(client: Arc<dyn TreeClient>, config: &TreeConfig) -> Self {
        Self::new(Arc::new(TreeBackend::new(client, config)))
    }

    /// A store over an API server.
    pub fn api(client: Arc<dyn ApiClient>, config: &ApiConfig) -> Self {
        Self::new(Arc::new(ApiBackend::new(client, config)))
    }

    /// Build an API store and initialize it per `config.use_cache`.
    pub fn open_api(client: Arc<dyn ApiClient>, config: &StoreConfig) -> StoreResult<Self> {
        let store = Self::api(client, &config.api);
        store.init_cache_mgr(config.use_cache)?;
        Ok(store)
    }

    /// Build a tree store and initialize it per `config.use_cache`.
    pub fn open_tree(client: Arc<dyn TreeClient>, config: &StoreConfig) -> StoreResult<Self> {
        let store = Self::tree(client, &config.tree);
        store.init_cache_mgr(config.use_cache)?;
        Ok(store)
    }

    pub fn backend_name(&self) -> &'static str {
        self.entities.backend_name()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.entities.stats()
    }

    // ── Lifecycle ─────────────────────────────────────────────────

    /// Make the store usable. With `use_cache`, every cache-enabled kind is
    /// loaded first; a load failure leaves the store uninitialized.
    pub fn init_cache_mgr(&self, use_cache: bool) -> StoreResult<()> {
        let mode = if use_cache {
            CacheMode::Cached(Arc::new(Cache::populate(&self.entities)?))
        } else {
            CacheMode::Direct
        };
        *self.mode.write() = mode;
        info!(backend = self.backend_name(), use_cache, "cache manager initialized");
        Ok(())
    }

    pub fn uninit_cache_mgr(&self) {
        *self.mode.write() = CacheMode::Uninitialized;
        info!(backend = self.backend_name(), "cache manager uninitialized");
    }

    pub fn is_cached(&self) -> bool {
        matches!(*self.mode.read(), CacheMode::Cached(_))
    }

    fn cache(&self) -> StoreResult<Option<Arc<Cache>>> {
        match &*self.mode.read() {
            CacheMode::Uninitialized => Err(StoreError::CacheNotInitialized),
            CacheMode::Direct => Ok(None),
            CacheMode::Cached(cache) => Ok(Some(Arc::clone(cache))),
        }
    }

    fn direct(&self) -> StoreResult<&EntityStore> {
        self.cache()?;
        Ok(&self.entities)
    }

    // ── Framework ID ──────────────────────────────────────────────

    pub fn save_framework_id(&self, id: &str) -> StoreResult<()> {
        self.direct()?.save_framework_id(id)
    }

    pub fn fetch_framework_id(&self) -> StoreResult<String> {
        self.direct()?.fetch_framework_id()
    }

    pub fn has_framework_id(&self) -> StoreResult<bool> {
        self.direct()?.has_framework_id()
    }

    // ── Applications ──────────────────────────────────────────────

    pub fn save_application(&self, app: &Application) -> StoreResult<()> {
        let cache = self.cache()?;
        self.entities.save(app)?;
        if let Some(cache) = cache {
            cache.put_application(app);
        }
        Ok(())
    }

    pub fn fetch_application(&self, run_as: &str, app_id: &str) -> StoreResult<Application> {
        let key = ObjectKey::namespaced(run_as, app_id);
        match self.cache()? {
            Some(cache) => cache
                .application(run_as, app_id)
                .ok_or_else(|| not_found(Kind::Application, &key)),
            None => self.entities.fetch(&key),
        }
    }

    pub fn delete_application(&self, run_as: &str, app_id: &str) -> StoreResult<()> {
        let cache = self.cache()?;
        self.entities
            .delete::<Application>(&ObjectKey::namespaced(run_as, app_id))?;
        if let Some(cache) = cache {
            cache.remove_application(run_as, app_id);
        }
        Ok(())
    }

    /// Namespaces holding at least one application.
    pub fn list_run_as(&self) -> StoreResult<Vec<String>> {
        match self.cache()? {
            Some(cache) => Ok(cache.run_as()),
            None => self.entities.list_run_as(),
        }
    }

    /// Sorted application IDs of a namespace.
    pub fn list_application_nodes(&self, run_as: &str) -> StoreResult<Vec<String>> {
        match self.cache()? {
            Some(cache) => Ok(cache
                .applications(Some(run_as))
                .into_iter()
                .map(|a| a.id)
                .collect()),
            None => self.entities.list_application_nodes(run_as),
        }
    }

    pub fn list_applications(&self, run_as: &str) -> StoreResult<Vec<Application>> {
        match self.cache()? {
            Some(cache) => Ok(cache.applications(Some(run_as))),
            None => self.entities.list(&Scope::namespace(run_as)),
        }
    }

    pub fn list_all_applications(&self) -> StoreResult<Vec<Application>> {
        match self.cache()? {
            Some(cache) => Ok(cache.applications(None)),
            None => self.entities.list(&Scope::all()),
        }
    }

    // ── Versions ──────────────────────────────────────────────────

    pub fn save_version(&self, version: &Version) -> StoreResult<()> {
        let cache = self.cache()?;
        let key = version.key()?;
        self.entities.save(version)?;
        if let Some(cache) = cache {
            cache.put_version(&key, version);
        }
        Ok(())
    }

    pub fn fetch_version(&self, run_as: &str, app_id: &str, version_no: &str) -> StoreResult<Version> {
        let key = ObjectKey::owned(run_as, app_id, version_no);
        match self.cache()? {
            Some(cache) => cache
                .version(&key)
                .ok_or_else(|| not_found(Kind::Version, &key)),
            None => self.entities.fetch(&key),
        }
    }

    pub fn delete_version(&self, run_as: &str, app_id: &str, version_no: &str) -> StoreResult<()> {
        let cache = self.cache()?;
        let key = ObjectKey::owned(run_as, app_id, version_no);
        self.entities.delete::<Version>(&key)?;
        if let Some(cache) = cache {
            cache.remove_version(&key);
        }
        Ok(())
    }

    /// Version numbers of an application, oldest first.
    pub fn list_versions(&self, run_as: &str, app_id: &str) -> StoreResult<Vec<String>> {
        match self.cache()? {
            Some(cache) => {
                let mut nos: Vec<String> = cache
                    .versions(run_as, app_id)
                    .into_iter()
                    .map(|v| v.version_no)
                    .collect();
                sort_version_nos(&mut nos);
                Ok(nos)
            }
            None => self.entities.list_version_nos(run_as, app_id),
        }
    }

    /// The highest-numbered version of an application.
    pub fn get_current_version(&self, run_as: &str, app_id: &str) -> StoreResult<Version> {
        match self.cache()? {
            Some(cache) => cache.versions(run_as, app_id).pop().ok_or_else(|| {
                StoreError::NotFound(format!("versions of {run_as}/{app_id}"))
            }),
            None => self.entities.fetch_current_version(run_as, app_id),
        }
    }

    // ── Task groups ───────────────────────────────────────────────

    /// Save a task group and every task it carries.
    pub fn save_task_group(&self, group: &TaskGroup) -> StoreResult<()> {
        let cache = self.cache()?;
        let key = task_group_key(&group.id)?;
        let task_keys = group
            .tasks
            .iter()
            .map(|t| task_key(&t.id))
            .collect::<StoreResult<Vec<_>>>()?;
        self.entities.save_task_group(group)?;
        if let Some(cache) = cache {
            cache.put_task_group(&key, group, &task_keys);
        }
        Ok(())
    }

    pub fn fetch_task_group(&self, id: &str) -> StoreResult<TaskGroup> {
        let key = task_group_key(id)?;
        match self.cache()? {
            Some(cache) => cache
                .task_group(&key)
                .ok_or_else(|| not_found(Kind::TaskGroup, &key)),
            None => self.entities.fetch_task_group(id),
        }
    }

    /// Delete a task group together with its tasks.
    pub fn delete_task_group(&self, id: &str) -> StoreResult<()> {
        let cache = self.cache()?;
        let key = task_group_key(id)?;
        self.entities.delete_task_group(id)?;
        if let Some(cache) = cache {
            cache.remove_task_group(&key);
        }
        Ok(())
    }

    pub fn list_task_groups(&self, run_as: &str, app_id: &str) -> StoreResult<Vec<TaskGroup>> {
        match self.cache()? {
            Some(cache) => Ok(cache.task_groups(run_as, app_id)),
            None => self.entities.list_task_groups(run_as, app_id),
        }
    }

    pub fn list_cluster_task_groups(&self) -> StoreResult<Vec<TaskGroup>> {
        match self.cache()? {
            Some(cache) => Ok(cache.all_task_groups()),
            None => self.entities.list_cluster_task_groups(),
        }
    }

    // ── Tasks ─────────────────────────────────────────────────────

    pub fn save_task(&self, task: &Task) -> StoreResult<()> {
        let cache = self.cache()?;
        let key = task_key(&task.id)?;
        self.entities.save_task(task)?;
        if let Some(cache) = cache {
            cache.put_task(&key, task);
        }
        Ok(())
    }

    pub fn fetch_task(&self, id: &str) -> StoreResult<Task> {
        let key = task_key(id)?;
        match self.cache()? {
            Some(cache) => cache.task(&key).ok_or_else(|| not_found(Kind::Task, &key)),
            None => self.entities.fetch_task(id),
        }
    }

    pub fn delete_task(&self, id: &str) -> StoreResult<()> {
        let cache = self.cache()?;
        let key = task_key(id)?;
        self.entities.delete_task(id)?;
        if let Some(cache) = cache {
            cache.remove_task(&key);
        }
        Ok(())
    }

    // ── Agents ────────────────────────────────────────────────────

    pub fn save_agent(&self, agent: &Agent) -> StoreResult<()> {
        let cache = self.cache()?;
        self.entities.save(agent)?;
        if let Some(cache) = cache {
            cache.put_agent(agent);
        }
        Ok(())
    }

    pub fn fetch_agent(&self, key: &str) -> StoreResult<Agent> {
        match self.cache()? {
            Some(cache) => cache
                .agent(key)
                .ok_or_else(|| not_found(Kind::Agent, &ObjectKey::cluster(key))),
            None => self.entities.fetch(&ObjectKey::cluster(key)),
        }
    }

    pub fn delete_agent(&self, key: &str) -> StoreResult<()> {
        let cache = self.cache()?;
        self.entities.delete::<Agent>(&ObjectKey::cluster(key))?;
        if let Some(cache) = cache {
            cache.remove_agent(key);
        }
        Ok(())
    }

    pub fn list_all_agents(&self) -> StoreResult<Vec<Agent>> {
        match self.cache()? {
            Some(cache) => Ok(cache.agents()),
            None => self.entities.list(&Scope::all()),
        }
    }

    pub fn save_agent_setting(&self, setting: &AgentSetting) -> StoreResult<()> {
        let cache = self.cache()?;
        self.entities.save(setting)?;
        if let Some(cache) = cache {
            cache.put_agent_setting(setting);
        }
        Ok(())
    }

    pub fn fetch_agent_setting(&self, inner_ip: &str) -> StoreResult<AgentSetting> {
        match self.cache()? {
            Some(cache) => cache.agent_setting(inner_ip).ok_or_else(|| {
                not_found(Kind::AgentSetting, &ObjectKey::cluster(inner_ip))
            }),
            None => self.entities.fetch(&ObjectKey::cluster(inner_ip)),
        }
    }

    pub fn delete_agent_setting(&self, inner_ip: &str) -> StoreResult<()> {
        let cache = self.cache()?;
        self.entities
            .delete::<AgentSetting>(&ObjectKey::cluster(inner_ip))?;
        if let Some(cache) = cache {
            cache.remove_agent_setting(inner_ip);
        }
        Ok(())
    }

    pub fn list_all_agent_settings(&self) -> StoreResult<Vec<AgentSetting>> {
        match self.cache()? {
            Some(cache) => Ok(cache.agent_settings()),
            None => self.entities.list(&Scope::all()),
        }
    }

    pub fn save_agent_sched_info(&self, info: &AgentSchedInfo) -> StoreResult<()> {
        self.direct()?.save(info)
    }

    pub fn fetch_agent_sched_info(&self, hostname: &str) -> StoreResult<AgentSchedInfo> {
        self.direct()?.fetch(&ObjectKey::cluster(hostname))
    }

    pub fn delete_agent_sched_info(&self, hostname: &str) -> StoreResult<()> {
        self.direct()?
            .delete::<AgentSchedInfo>(&ObjectKey::cluster(hostname))
    }

    pub fn list_all_agent_sched_infos(&self) -> StoreResult<Vec<AgentSchedInfo>> {
        self.direct()?.list(&Scope::all())
    }

    // ── Config maps and secrets ───────────────────────────────────

    pub fn save_configmap(&self, cm: &ConfigMap) -> StoreResult<()> {
        let cache = self.cache()?;
        self.entities.save(cm)?;
        if let Some(cache) = cache {
            cache.put_configmap(cm);
        }
        Ok(())
    }

    pub fn fetch_configmap(&self, namespace: &str, name: &str) -> StoreResult<ConfigMap> {
        let key = ObjectKey::namespaced(namespace, name);
        match self.cache()? {
            Some(cache) => cache
                .configmap(namespace, name)
                .ok_or_else(|| not_found(Kind::ConfigMap, &key)),
            None => self.entities.fetch(&key),
        }
    }

    pub fn delete_configmap(&self, namespace: &str, name: &str) -> StoreResult<()> {
        let cache = self.cache()?;
        self.entities
            .delete::<ConfigMap>(&ObjectKey::namespaced(namespace, name))?;
        if let Some(cache) = cache {
            cache.remove_configmap(namespace, name);
        }
        Ok(())
    }

    pub fn list_configmaps(&self, namespace: &str) -> StoreResult<Vec<ConfigMap>> {
        match self.cache()? {
            Some(cache) => Ok(cache.configmaps(Some(namespace))),
            None => self.entities.list(&Scope::namespace(namespace)),
        }
    }

    pub fn list_all_configmaps(&self) -> StoreResult<Vec<ConfigMap>> {
        match self.cache()? {
            Some(cache) => Ok(cache.configmaps(None)),
            None => self.entities.list(&Scope::all()),
        }
    }

    pub fn save_secret(&self, secret: &Secret) -> StoreResult<()> {
        let cache = self.cache()?;
        self.entities.save(secret)?;
        if let Some(cache) = cache {
            cache.put_secret(secret);
        }
        Ok(())
    }

    pub fn fetch_secret(&self, namespace: &str, name: &str) -> StoreResult<Secret> {
        let key = ObjectKey::namespaced(namespace, name);
        match self.cache()? {
            Some(cache) => cache
                .secret(namespace, name)
                .ok_or_else(|| not_found(Kind::Secret, &key)),
            None => self.entities.fetch(&key),
        }
    }

    pub fn delete_secret(&self, namespace: &str, name: &str) -> StoreResult<()> {
        let cache = self.cache()?;
        self.entities
            .delete::<Secret>(&ObjectKey::namespaced(namespace, name))?;
        if let Some(cache) = cache {
            cache.remove_secret(namespace, name);
        }
        Ok(())
    }

    pub fn list_secrets(&self, namespace: &str) -> StoreResult<Vec<Secret>> {
        match self.cache()? {
            Some(cache) => Ok(cache.secrets(Some(namespace))),
            None => self.entities.list(&Scope::namespace(namespace)),
        }
    }

    pub fn list_all_secrets(&self) -> StoreResult<Vec<Secret>> {
        match self.cache()? {
            Some(cache) => Ok(cache.secrets(None)),
            None => self.entities.list(&Scope::all()),
        }
    }

    // ── Services, endpoints, deployments ──────────────────────────

    namespaced_direct!(
        Service,
        save_service,
        fetch_service,
        delete_service,
        list_services,
        list_all_services
    );

    namespaced_direct!(
        Endpoint,
        save_endpoint,
        fetch_endpoint,
        delete_endpoint,
        list_endpoints,
        list_all_endpoints
    );

    namespaced_direct!(
        Deployment,
        save_deployment,
        fetch_deployment,
        delete_deployment,
        list_deployments,
        list_all_deployments
    );

    // ── Commands ──────────────────────────────────────────────────

    pub fn save_command(&self, command: &Command) -> StoreResult<()> {
        self.direct()?.save(command)
    }

    pub fn fetch_command(&self, id: &str) -> StoreResult<Command> {
        self.direct()?.fetch(&ObjectKey::cluster(id))
    }

    pub fn delete_command(&self, id: &str) -> StoreResult<()> {
        self.direct()?.delete::<Command>(&ObjectKey::cluster(id))
    }

    // ── Custom resources ──────────────────────────────────────────

    pub fn save_custom_resource_register(&self, crr: &CustomResourceRegister) -> StoreResult<()> {
        self.direct()?.save(crr)
    }

    pub fn fetch_custom_resource_register(&self, kind: &str) -> StoreResult<CustomResourceRegister> {
        self.direct()?.fetch(&ObjectKey::cluster(kind))
    }

    /// Delete the registration of a custom kind.
    pub fn delete_custom_resource_register(&self, kind: &str) -> StoreResult<()> {
        self.direct()?
            .delete::<CustomResourceRegister>(&ObjectKey::cluster(kind))
    }

    pub fn list_all_custom_resource_registers(&self) -> StoreResult<Vec<CustomResourceRegister>> {
        self.direct()?.list(&Scope::all())
    }

    pub fn save_custom_resource_definition(
        &self,
        crd: &CustomResourceDefinition,
    ) -> StoreResult<()> {
        self.direct()?.save(crd)
    }

    pub fn fetch_custom_resource_definition(
        &self,
        kind: &str,
        namespace: &str,
        name: &str,
    ) -> StoreResult<CustomResourceDefinition> {
        self.direct()?
            .fetch(&ObjectKey::kind_scoped(kind, namespace, name))
    }

    pub fn delete_custom_resource_definition(
        &self,
        kind: &str,
        namespace: &str,
        name: &str,
    ) -> StoreResult<()> {
        self.direct()?
            .delete::<CustomResourceDefinition>(&ObjectKey::kind_scoped(kind, namespace, name))
    }

    pub fn list_custom_resource_definitions(
        &self,
        kind: &str,
        namespace: &str,
    ) -> StoreResult<Vec<CustomResourceDefinition>> {
        self.direct()?
            .list(&Scope::custom_kind(kind, Some(namespace)))
    }

    pub fn list_all_custom_resource_definitions(
        &self,
        kind: &str,
    ) -> StoreResult<Vec<CustomResourceDefinition>> {
        self.direct()?.list(&Scope::custom_kind(kind, None))
    }

    // ── Admission webhooks ────────────────────────────────────────

    pub fn save_admission_webhook(&self, hook: &AdmissionWebhookConfiguration) -> StoreResult<()> {
        self.direct()?.save(hook)
    }

    pub fn fetch_admission_webhook(
        &self,
        namespace: &str,
        name: &str,
    ) -> StoreResult<AdmissionWebhookConfiguration> {
        self.direct()?.fetch(&ObjectKey::namespaced(namespace, name))
    }

    pub fn delete_admission_webhook(&self, namespace: &str, name: &str) -> StoreResult<()> {
        self.direct()?
            .delete::<AdmissionWebhookConfiguration>(&ObjectKey::namespaced(namespace, name))
    }

    pub fn list_admission_webhooks(
        &self,
        namespace: &str,
    ) -> StoreResult<Vec<AdmissionWebhookConfiguration>> {
        self.direct()?.list(&Scope::namespace(namespace))
    }

    pub fn list_all_admission_webhooks(&self) -> StoreResult<Vec<AdmissionWebhookConfiguration>> {
        self.direct()?.list(&Scope::all())
    }

    // ── Locks ─────────────────────────────────────────────────────

    pub fn lock_application(&self, app_id: &str) {
        self.application_locks.lock(app_id);
    }

    pub fn unlock_application(&self, app_id: &str) {
        self.application_locks.unlock(app_id);
    }

    pub fn application_guard(&self, app_id: &str) -> PoolGuard<'_> {
        self.application_locks.guard(app_id)
    }

    pub fn lock_deployment(&self, name: &str) {
        self.deployment_locks.lock(name);
    }

    pub fn unlock_deployment(&self, name: &str) {
        self.deployment_locks.unlock(name);
    }

    pub fn deployment_guard(&self, name: &str) -> PoolGuard<'_> {
        self.deployment_locks.guard(name)
    }

    pub fn lock_command(&self, id: &str) {
        self.command_locks.lock(id);
    }

    pub fn unlock_command(&self, id: &str) {
        self.command_locks.unlock(id);
    }

    pub fn command_guard(&self, id: &str) -> PoolGuard<'_> {
        self.command_locks.guard(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::RedbTree;

    fn store() -> Store {
        Store::tree(
            Arc::new(RedbTree::open_in_memory().unwrap()),
            &TreeConfig::default(),
        )
    }

    #[test]
    fn calls_before_init_are_refused() {
        let s = store();
        assert!(matches!(s.list_run_as(), Err(StoreError::CacheNotInitialized)));
        assert!(matches!(s.fetch_command("c1"), Err(StoreError::CacheNotInitialized)));
        s.init_cache_mgr(false).unwrap();
        assert!(s.list_run_as().unwrap().is_empty());
        s.uninit_cache_mgr();
        assert!(matches!(s.has_framework_id(), Err(StoreError::CacheNotInitialized)));
    }

    #[test]
    fn locks_work_without_init() {
        let s = store();
        let _guard = s.deployment_guard("d1");
        s.lock_command("c1");
        s.unlock_command("c1");
        s.unlock_application("unknown");
    }

    #[test]
    fn cached_mode_reports_itself() {
        let s = store();
        s.init_cache_mgr(true).unwrap();
        assert!(s.is_cached());
        s.init_cache_mgr(false).unwrap();
        assert!(!s.is_cached());
    }
}

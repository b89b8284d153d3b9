//! Write-through cache of the scheduler's working set.
//!
//! Applications are held as nested entries (the application, its versions,
//! its task group records and its tasks); agents, agent settings, config maps
//! and secrets are flat maps. One coarse `RwLock` guards the whole state.
//! Values are cloned on the way in and on the way out.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use parking_lot::RwLock;
use tracing::info;

use crate::entity::{EntityStore, assemble_task_group};
use crate::error::StoreResult;
use crate::ids::{compare_version_no, task_group_id_of_task};
use crate::kind::{Entity, ObjectKey, Scope, TaskGroupRecord};
use crate::types::{Agent, AgentSetting, Application, ConfigMap, Secret, Task, TaskGroup, Version};

type NsName = (String, String);

fn ns_name(namespace: &str, name: &str) -> NsName {
    (namespace.to_string(), name.to_string())
}

#[derive(Debug, Default)]
struct AppEntry {
    application: Option<Application>,
    versions: HashMap<String, Version>,
    task_groups: HashMap<String, TaskGroupRecord>,
    tasks: HashMap<String, Task>,
}

impl AppEntry {
    fn is_empty(&self) -> bool {
        self.application.is_none()
            && self.versions.is_empty()
            && self.task_groups.is_empty()
            && self.tasks.is_empty()
    }

    fn assemble(&self, record: &TaskGroupRecord) -> TaskGroup {
        assemble_task_group(record.clone(), &self.tasks)
    }
}

#[derive(Debug, Default)]
struct CacheState {
    /// Keyed by `(namespace, app_id)`.
    apps: HashMap<NsName, AppEntry>,
    agents: HashMap<String, Agent>,
    agent_settings: HashMap<String, AgentSetting>,
    configmaps: HashMap<NsName, ConfigMap>,
    secrets: HashMap<NsName, Secret>,
}

impl CacheState {
    fn app_entry(&mut self, key: &ObjectKey) -> &mut AppEntry {
        self.apps
            .entry(ns_name(&key.namespace, &key.owner))
            .or_default()
    }

    /// Drop the entry for `(namespace, app_id)` once nothing is left in it.
    fn prune(&mut self, namespace: &str, app_id: &str) {
        let id = ns_name(namespace, app_id);
        if self.apps.get(&id).is_some_and(AppEntry::is_empty) {
            self.apps.remove(&id);
        }
    }
}

/// Sizes of the cached collections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheSizes {
    pub app_entries: usize,
    pub applications: usize,
    pub task_groups: usize,
    pub tasks: usize,
    pub agents: usize,
    pub agent_settings: usize,
    pub configmaps: usize,
    pub secrets: usize,
}

#[derive(Debug, Default)]
pub struct Cache {
    state: RwLock<CacheState>,
}

impl Cache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every cache-enabled kind from `store`.
    pub fn populate(store: &EntityStore) -> StoreResult<Self> {
        let mut state = CacheState::default();

        for app in store.list::<Application>(&Scope::all())? {
            let key = app.key()?;
            state
                .apps
                .entry(ns_name(&key.namespace, &key.name))
                .or_default()
                .application = Some(app);
        }
        for version in store.list::<Version>(&Scope::all())? {
            let key = version.key()?;
            state.app_entry(&key).versions.insert(key.name, version);
        }
        for record in store.list::<TaskGroupRecord>(&Scope::all())? {
            let key = record.key()?;
            state.app_entry(&key).task_groups.insert(key.name, record);
        }
        for task in store.list::<Task>(&Scope::all())? {
            let key = task.key()?;
            state.app_entry(&key).tasks.insert(key.name, task);
        }
        for agent in store.list::<Agent>(&Scope::all())? {
            state.agents.insert(agent.key.clone(), agent);
        }
        for setting in store.list::<AgentSetting>(&Scope::all())? {
            state.agent_settings.insert(setting.inner_ip.clone(), setting);
        }
        for cm in store.list::<ConfigMap>(&Scope::all())? {
            state
                .configmaps
                .insert(ns_name(&cm.meta.namespace, &cm.meta.name), cm);
        }
        for secret in store.list::<Secret>(&Scope::all())? {
            state
                .secrets
                .insert(ns_name(&secret.meta.namespace, &secret.meta.name), secret);
        }

        let cache = Self {
            state: RwLock::new(state),
        };
        let sizes = cache.sizes();
        info!(
            backend = store.backend_name(),
            applications = sizes.applications,
            task_groups = sizes.task_groups,
            tasks = sizes.tasks,
            agents = sizes.agents,
            agent_settings = sizes.agent_settings,
            configmaps = sizes.configmaps,
            secrets = sizes.secrets,
            "cache populated"
        );
        Ok(cache)
    }

    pub fn sizes(&self) -> CacheSizes {
        let state = self.state.read();
        let mut sizes = CacheSizes {
            app_entries: state.apps.len(),
            agents: state.agents.len(),
            agent_settings: state.agent_settings.len(),
            configmaps: state.configmaps.len(),
            secrets: state.secrets.len(),
            ..Default::default()
        };
        for entry in state.apps.values() {
            sizes.applications += usize::from(entry.application.is_some());
            sizes.task_groups += entry.task_groups.len();
            sizes.tasks += entry.tasks.len();
        }
        sizes
    }

    // ── Applications ──────────────────────────────────────────────

    pub fn put_application(&self, app: &Application) {
        let mut state = self.state.write();
        state
            .apps
            .entry(ns_name(&app.run_as, &app.id))
            .or_default()
            .application = Some(app.clone());
    }

    pub fn application(&self, run_as: &str, app_id: &str) -> Option<Application> {
        let state = self.state.read();
        state
            .apps
            .get(&ns_name(run_as, app_id))
            .and_then(|e| e.application.clone())
    }

    /// Clear the cached application; versions and task groups stay until
    /// they are deleted themselves.
    pub fn remove_application(&self, run_as: &str, app_id: &str) {
        let mut state = self.state.write();
        if let Some(entry) = state.apps.get_mut(&ns_name(run_as, app_id)) {
            entry.application = None;
        }
        state.prune(run_as, app_id);
    }

    /// Sorted namespaces holding at least one cached application.
    pub fn run_as(&self) -> Vec<String> {
        let state = self.state.read();
        let names: BTreeSet<&String> = state
            .apps
            .iter()
            .filter(|(_, e)| e.application.is_some())
            .map(|((ns, _), _)| ns)
            .collect();
        names.into_iter().cloned().collect()
    }

    /// Applications of one namespace, or of every namespace, sorted by
    /// `(namespace, id)`.
    pub fn applications(&self, run_as: Option<&str>) -> Vec<Application> {
        let state = self.state.read();
        let sorted: BTreeMap<&NsName, &Application> = state
            .apps
            .iter()
            .filter(|((ns, _), _)| run_as.is_none_or(|want| want == ns))
            .filter_map(|(id, e)| e.application.as_ref().map(|a| (id, a)))
            .collect();
        sorted.into_values().cloned().collect()
    }

    // ── Versions ──────────────────────────────────────────────────

    pub fn put_version(&self, key: &ObjectKey, version: &Version) {
        let mut state = self.state.write();
        state
            .app_entry(key)
            .versions
            .insert(key.name.clone(), version.clone());
    }

    pub fn version(&self, key: &ObjectKey) -> Option<Version> {
        let state = self.state.read();
        state
            .apps
            .get(&ns_name(&key.namespace, &key.owner))
            .and_then(|e| e.versions.get(&key.name).cloned())
    }

    pub fn remove_version(&self, key: &ObjectKey) {
        let mut state = self.state.write();
        if let Some(entry) = state.apps.get_mut(&ns_name(&key.namespace, &key.owner)) {
            entry.versions.remove(&key.name);
        }
        state.prune(&key.namespace, &key.owner);
    }

    /// Versions of an application, oldest first.
    pub fn versions(&self, run_as: &str, app_id: &str) -> Vec<Version> {
        let state = self.state.read();
        let mut versions: Vec<Version> = state
            .apps
            .get(&ns_name(run_as, app_id))
            .map(|e| e.versions.values().cloned().collect())
            .unwrap_or_default();
        versions.sort_by(|a, b| compare_version_no(&a.version_no, &b.version_no));
        versions
    }

    // ── Task groups and tasks ─────────────────────────────────────

    /// Store a task group record together with its tasks.
    pub fn put_task_group(&self, key: &ObjectKey, group: &TaskGroup, task_keys: &[ObjectKey]) {
        let mut state = self.state.write();
        for (task_key, task) in task_keys.iter().zip(&group.tasks) {
            state
                .app_entry(task_key)
                .tasks
                .insert(task_key.name.clone(), task.clone());
        }
        state
            .app_entry(key)
            .task_groups
            .insert(key.name.clone(), TaskGroupRecord::from_group(group));
    }

    pub fn task_group(&self, key: &ObjectKey) -> Option<TaskGroup> {
        let state = self.state.read();
        let entry = state.apps.get(&ns_name(&key.namespace, &key.owner))?;
        entry.task_groups.get(&key.name).map(|r| entry.assemble(r))
    }

    /// Remove a task group record and every task that belongs to it.
    pub fn remove_task_group(&self, key: &ObjectKey) {
        let mut state = self.state.write();
        if let Some(entry) = state.apps.get_mut(&ns_name(&key.namespace, &key.owner)) {
            let listed: BTreeSet<String> = entry
                .task_groups
                .remove(&key.name)
                .map(|r| r.task_ids.into_iter().collect())
                .unwrap_or_default();
            entry.tasks.retain(|id, _| {
                !listed.contains(id)
                    && !task_group_id_of_task(id).is_ok_and(|owner| owner == key.name)
            });
        }
        state.prune(&key.namespace, &key.owner);
    }

    /// Task groups of one application, sorted by ID.
    pub fn task_groups(&self, run_as: &str, app_id: &str) -> Vec<TaskGroup> {
        let state = self.state.read();
        let Some(entry) = state.apps.get(&ns_name(run_as, app_id)) else {
            return Vec::new();
        };
        let sorted: BTreeMap<&String, &TaskGroupRecord> = entry.task_groups.iter().collect();
        sorted.into_values().map(|r| entry.assemble(r)).collect()
    }

    /// Every cached task group.
    pub fn all_task_groups(&self) -> Vec<TaskGroup> {
        let state = self.state.read();
        let sorted: BTreeMap<&NsName, &AppEntry> = state.apps.iter().collect();
        sorted
            .into_values()
            .flat_map(|entry| {
                let records: BTreeMap<&String, &TaskGroupRecord> =
                    entry.task_groups.iter().collect();
                records
                    .into_values()
                    .map(|r| entry.assemble(r))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn put_task(&self, key: &ObjectKey, task: &Task) {
        let mut state = self.state.write();
        state
            .app_entry(key)
            .tasks
            .insert(key.name.clone(), task.clone());
    }

    pub fn task(&self, key: &ObjectKey) -> Option<Task> {
        let state = self.state.read();
        state
            .apps
            .get(&ns_name(&key.namespace, &key.owner))
            .and_then(|e| e.tasks.get(&key.name).cloned())
    }

    pub fn remove_task(&self, key: &ObjectKey) {
        let mut state = self.state.write();
        if let Some(entry) = state.apps.get_mut(&ns_name(&key.namespace, &key.owner)) {
            entry.tasks.remove(&key.name);
        }
        state.prune(&key.namespace, &key.owner);
    }

    // ── Agents ────────────────────────────────────────────────────

    pub fn put_agent(&self, agent: &Agent) {
        self.state
            .write()
            .agents
            .insert(agent.key.clone(), agent.clone());
    }

    pub fn agent(&self, key: &str) -> Option<Agent> {
        self.state.read().agents.get(key).cloned()
    }

    pub fn remove_agent(&self, key: &str) {
        self.state.write().agents.remove(key);
    }

    pub fn agents(&self) -> Vec<Agent> {
        let state = self.state.read();
        let sorted: BTreeMap<&String, &Agent> = state.agents.iter().collect();
        sorted.into_values().cloned().collect()
    }

    pub fn put_agent_setting(&self, setting: &AgentSetting) {
        self.state
            .write()
            .agent_settings
            .insert(setting.inner_ip.clone(), setting.clone());
    }

    pub fn agent_setting(&self, inner_ip: &str) -> Option<AgentSetting> {
        self.state.read().agent_settings.get(inner_ip).cloned()
    }

    pub fn remove_agent_setting(&self, inner_ip: &str) {
        self.state.write().agent_settings.remove(inner_ip);
    }

    pub fn agent_settings(&self) -> Vec<AgentSetting> {
        let state = self.state.read();
        let sorted: BTreeMap<&String, &AgentSetting> = state.agent_settings.iter().collect();
        sorted.into_values().cloned().collect()
    }

    // ── Config maps and secrets ───────────────────────────────────

    pub fn put_configmap(&self, cm: &ConfigMap) {
        self.state
            .write()
            .configmaps
            .insert(ns_name(&cm.meta.namespace, &cm.meta.name), cm.clone());
    }

    pub fn configmap(&self, namespace: &str, name: &str) -> Option<ConfigMap> {
        self.state
            .read()
            .configmaps
            .get(&ns_name(namespace, name))
            .cloned()
    }

    pub fn remove_configmap(&self, namespace: &str, name: &str) {
        self.state.write().configmaps.remove(&ns_name(namespace, name));
    }

    pub fn configmaps(&self, namespace: Option<&str>) -> Vec<ConfigMap> {
        let state = self.state.read();
        let sorted: BTreeMap<&NsName, &ConfigMap> = state
            .configmaps
            .iter()
            .filter(|((ns, _), _)| namespace.is_none_or(|want| want == ns))
            .collect();
        sorted.into_values().cloned().collect()
    }

    pub fn put_secret(&self, secret: &Secret) {
        self.state.write().secrets.insert(
            ns_name(&secret.meta.namespace, &secret.meta.name),
            secret.clone(),
        );
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.state
            .read()
            .secrets
            .get(&ns_name(namespace, name))
            .cloned()
    }

    pub fn remove_secret(&self, namespace: &str, name: &str) {
        self.state.write().secrets.remove(&ns_name(namespace, name));
    }

    pub fn secrets(&self, namespace: Option<&str>) -> Vec<Secret> {
        let state = self.state.read();
        let sorted: BTreeMap<&NsName, &Secret> = state
            .secrets
            .iter()
            .filter(|((ns, _), _)| namespace.is_none_or(|want| want == ns))
            .collect();
        sorted.into_values().cloned().collect()
    }
}

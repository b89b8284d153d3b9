//! Typed entity persistence over a [`Backend`].
//!
//! [`EntityStore`] serializes domain values to JSON and back, and carries the
//! kind-specific rules that sit above raw object storage: task groups are
//! stored without their tasks and rebuilt by resolving task IDs, deleting a
//! task group removes its tasks, and the current version of an application is
//! the highest-numbered one.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::backend::Backend;
use crate::error::{StoreError, StoreResult, map_err};
use crate::ids::{TaskGroupId, TaskId, compare_version_no, sort_version_nos, task_group_id_of_task};
use crate::kind::{Entity, FrameworkId, Kind, ObjectKey, Scope, TaskGroupRecord};
use crate::stats::StatsSnapshot;
use crate::types::{Application, Task, TaskGroup, Version};

/// Backend key of a task group, derived from its ID.
pub fn task_group_key(id: &str) -> StoreResult<ObjectKey> {
    let parsed: TaskGroupId = id.parse()?;
    Ok(ObjectKey::owned(&parsed.namespace, &parsed.app_id, id))
}

/// Backend key of a task, derived from its ID.
pub fn task_key(id: &str) -> StoreResult<ObjectKey> {
    let parsed: TaskId = id.parse()?;
    Ok(ObjectKey::owned(&parsed.namespace, &parsed.app_id, id))
}

/// Rebuild a task group from its record, taking tasks from `tasks`.
/// IDs that do not resolve are skipped.
pub fn assemble_task_group(record: TaskGroupRecord, tasks: &HashMap<String, Task>) -> TaskGroup {
    let mut resolved = Vec::with_capacity(record.task_ids.len());
    for id in &record.task_ids {
        match tasks.get(id) {
            Some(task) => resolved.push(task.clone()),
            None => warn!(task_group = %record.group.id, task = %id, "task missing, skipped"),
        }
    }
    record.into_group(resolved)
}

pub struct EntityStore {
    backend: Arc<dyn Backend>,
}

impl EntityStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.backend.stats()
    }

    // ── Generic ───────────────────────────────────────────────────

    pub fn save<E: Entity>(&self, entity: &E) -> StoreResult<()> {
        let key = entity.key()?;
        let value = serde_json::to_value(entity).map_err(map_err!(Serialize))?;
        self.backend.put(E::KIND, &key, &entity.labels(), value)?;
        debug!(kind = %E::KIND, key = %key, "saved");
        Ok(())
    }

    pub fn fetch<E: Entity>(&self, key: &ObjectKey) -> StoreResult<E> {
        let value = self.backend.get(E::KIND, key)?;
        serde_json::from_value(value).map_err(map_err!(Deserialize))
    }

    pub fn delete<E: Entity>(&self, key: &ObjectKey) -> StoreResult<()> {
        self.backend.remove(E::KIND, key)?;
        debug!(kind = %E::KIND, key = %key, "deleted");
        Ok(())
    }

    pub fn list<E: Entity>(&self, scope: &Scope) -> StoreResult<Vec<E>> {
        self.backend
            .list(E::KIND, scope)?
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(map_err!(Deserialize)))
            .collect()
    }

    pub fn namespaces(&self, kind: Kind) -> StoreResult<Vec<String>> {
        self.backend.namespaces(kind)
    }

    // ── Framework ID ──────────────────────────────────────────────

    pub fn save_framework_id(&self, id: &str) -> StoreResult<()> {
        self.save(&FrameworkId(id.to_string()))
    }

    pub fn fetch_framework_id(&self) -> StoreResult<String> {
        Ok(self.fetch::<FrameworkId>(&ObjectKey::singleton())?.0)
    }

    pub fn has_framework_id(&self) -> StoreResult<bool> {
        match self.fetch_framework_id() {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    // ── Applications and versions ─────────────────────────────────

    /// Namespaces holding at least one application.
    pub fn list_run_as(&self) -> StoreResult<Vec<String>> {
        self.namespaces(Kind::Application)
    }

    /// Sorted application IDs of a namespace.
    pub fn list_application_nodes(&self, run_as: &str) -> StoreResult<Vec<String>> {
        let mut ids: Vec<String> = self
            .list::<Application>(&Scope::namespace(run_as))?
            .into_iter()
            .map(|app| app.id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Version numbers of an application, oldest first.
    pub fn list_version_nos(&self, run_as: &str, app_id: &str) -> StoreResult<Vec<String>> {
        let mut nos: Vec<String> = self
            .list::<Version>(&Scope::owner(run_as, app_id))?
            .into_iter()
            .map(|v| v.version_no)
            .collect();
        sort_version_nos(&mut nos);
        Ok(nos)
    }

    /// The highest-numbered version of an application.
    pub fn fetch_current_version(&self, run_as: &str, app_id: &str) -> StoreResult<Version> {
        self.list::<Version>(&Scope::owner(run_as, app_id))?
            .into_iter()
            .max_by(|a, b| compare_version_no(&a.version_no, &b.version_no))
            .ok_or_else(|| StoreError::NotFound(format!("versions of {run_as}/{app_id}")))
    }

    // ── Task groups and tasks ─────────────────────────────────────

    /// Save every inline task, then the group record.
    pub fn save_task_group(&self, group: &TaskGroup) -> StoreResult<()> {
        for task in &group.tasks {
            self.save(task)?;
        }
        self.save(&TaskGroupRecord::from_group(group))
    }

    pub fn fetch_task_group_record(&self, id: &str) -> StoreResult<TaskGroupRecord> {
        self.fetch(&task_group_key(id)?)
    }

    /// Fetch a task group and resolve its tasks one by one.
    pub fn fetch_task_group(&self, id: &str) -> StoreResult<TaskGroup> {
        let record = self.fetch_task_group_record(id)?;
        let mut tasks = Vec::with_capacity(record.task_ids.len());
        for task_id in &record.task_ids {
            match self.fetch_task(task_id) {
                Ok(task) => tasks.push(task),
                Err(e) if e.is_not_found() => {
                    warn!(task_group = %id, task = %task_id, "task missing, skipped");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(record.into_group(tasks))
    }

    /// Delete a task group and every task belonging to it.
    ///
    /// Tasks are found both through the record's task IDs and by scanning the
    /// application's tasks for ones whose ID derives this group's ID, so tasks
    /// written ahead of an unsaved record go too.
    pub fn delete_task_group(&self, id: &str) -> StoreResult<()> {
        let parsed: TaskGroupId = id.parse()?;
        let key = ObjectKey::owned(&parsed.namespace, &parsed.app_id, id);

        let mut task_ids: BTreeSet<String> = match self.fetch::<TaskGroupRecord>(&key) {
            Ok(record) => record.task_ids.into_iter().collect(),
            Err(e) if e.is_not_found() => BTreeSet::new(),
            Err(e) => return Err(e),
        };
        for task in self.list::<Task>(&Scope::owner(&parsed.namespace, &parsed.app_id))? {
            if task_group_id_of_task(&task.id).is_ok_and(|owner| owner == id) {
                task_ids.insert(task.id);
            }
        }

        for task_id in &task_ids {
            match self.delete_task(task_id) {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        self.delete::<TaskGroupRecord>(&key)?;
        debug!(task_group = %id, tasks = task_ids.len(), "task group deleted with tasks");
        Ok(())
    }

    /// Task group records of one application.
    pub fn list_task_group_records(
        &self,
        run_as: &str,
        app_id: &str,
    ) -> StoreResult<Vec<TaskGroupRecord>> {
        self.list(&Scope::owner(run_as, app_id))
    }

    /// Task groups of one application with their tasks attached.
    pub fn list_task_groups(&self, run_as: &str, app_id: &str) -> StoreResult<Vec<TaskGroup>> {
        let scope = Scope::owner(run_as, app_id);
        let records: Vec<TaskGroupRecord> = self.list(&scope)?;
        let tasks = self.tasks_by_id(&scope)?;
        Ok(records
            .into_iter()
            .map(|record| assemble_task_group(record, &tasks))
            .collect())
    }

    /// Every task group in the cluster with its tasks attached.
    pub fn list_cluster_task_groups(&self) -> StoreResult<Vec<TaskGroup>> {
        let records: Vec<TaskGroupRecord> = self.list(&Scope::all())?;
        let tasks = self.tasks_by_id(&Scope::all())?;
        Ok(records
            .into_iter()
            .map(|record| assemble_task_group(record, &tasks))
            .collect())
    }

    fn tasks_by_id(&self, scope: &Scope) -> StoreResult<HashMap<String, Task>> {
        Ok(self
            .list::<Task>(scope)?
            .into_iter()
            .map(|t| (t.id.clone(), t))
            .collect())
    }

    pub fn save_task(&self, task: &Task) -> StoreResult<()> {
        self.save(task)
    }

    pub fn fetch_task(&self, id: &str) -> StoreResult<Task> {
        self.fetch(&task_key(id)?)
    }

    pub fn delete_task(&self, id: &str) -> StoreResult<()> {
        self.delete::<Task>(&task_key(id)?)
    }
}

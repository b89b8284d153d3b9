//! Composite identifiers and version numbering.
//!
//! Task group and task IDs pack several key fields into one dot-separated
//! string. The field order is a wire contract: both backends, the cache and
//! the migration log derive parent identity by splitting these strings, so
//! [`TaskGroupId`] and [`TaskId`] are the only place the layout is defined.
//!
//! ```text
//! task group: {instance}.{app_id}.{namespace}.{cluster_id}.{created}
//! task:       {created}.{task_index}.{instance}.{app_id}.{namespace}.{cluster_id}
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{StoreError, StoreResult};

pub const ID_SEPARATOR: char = '.';

const TASK_GROUP_ID_FIELDS: usize = 5;
const TASK_ID_FIELDS: usize = 6;

fn split_fields(id: &str, expected: usize) -> StoreResult<Vec<&str>> {
    let fields: Vec<&str> = id.split(ID_SEPARATOR).collect();
    if fields.len() != expected {
        return Err(StoreError::MalformedId {
            id: id.to_string(),
            expected,
            found: fields.len(),
        });
    }
    Ok(fields)
}

/// Decomposed task group ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskGroupId {
    pub instance: String,
    pub app_id: String,
    pub namespace: String,
    pub cluster_id: String,
    pub created: String,
}

impl TaskGroupId {
    pub fn new(instance: &str, app_id: &str, namespace: &str, cluster_id: &str, created: &str) -> Self {
        Self {
            instance: instance.to_string(),
            app_id: app_id.to_string(),
            namespace: namespace.to_string(),
            cluster_id: cluster_id.to_string(),
            created: created.to_string(),
        }
    }
}

impl fmt::Display for TaskGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}.{}",
            self.instance, self.app_id, self.namespace, self.cluster_id, self.created
        )
    }
}

impl FromStr for TaskGroupId {
    type Err = StoreError;

    fn from_str(s: &str) -> StoreResult<Self> {
        let f = split_fields(s, TASK_GROUP_ID_FIELDS)?;
        Ok(Self::new(f[0], f[1], f[2], f[3], f[4]))
    }
}

/// Decomposed task ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId {
    pub created: String,
    pub task_index: String,
    pub instance: String,
    pub app_id: String,
    pub namespace: String,
    pub cluster_id: String,
}

impl TaskId {
    pub fn new(
        created: &str,
        task_index: &str,
        instance: &str,
        app_id: &str,
        namespace: &str,
        cluster_id: &str,
    ) -> Self {
        Self {
            created: created.to_string(),
            task_index: task_index.to_string(),
            instance: instance.to_string(),
            app_id: app_id.to_string(),
            namespace: namespace.to_string(),
            cluster_id: cluster_id.to_string(),
        }
    }

    /// The ID of the task group this task was launched in.
    ///
    /// A task inherits its group's creation time, so the group ID is fully
    /// recoverable from the task ID.
    pub fn task_group_id(&self) -> TaskGroupId {
        TaskGroupId::new(
            &self.instance,
            &self.app_id,
            &self.namespace,
            &self.cluster_id,
            &self.created,
        )
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}.{}.{}",
            self.created, self.task_index, self.instance, self.app_id, self.namespace, self.cluster_id
        )
    }
}

impl FromStr for TaskId {
    type Err = StoreError;

    fn from_str(s: &str) -> StoreResult<Self> {
        let f = split_fields(s, TASK_ID_FIELDS)?;
        Ok(Self::new(f[0], f[1], f[2], f[3], f[4], f[5]))
    }
}

/// `(namespace, app_id)` of a task group ID.
pub fn run_as_and_app_id_of_task_group(id: &str) -> StoreResult<(String, String)> {
    let parsed: TaskGroupId = id.parse()?;
    Ok((parsed.namespace, parsed.app_id))
}

/// `(namespace, app_id)` of a task ID.
pub fn run_as_and_app_id_of_task(id: &str) -> StoreResult<(String, String)> {
    let parsed: TaskId = id.parse()?;
    Ok((parsed.namespace, parsed.app_id))
}

/// Task group ID owning the given task ID.
pub fn task_group_id_of_task(id: &str) -> StoreResult<String> {
    let parsed: TaskId = id.parse()?;
    Ok(parsed.task_group_id().to_string())
}

// ── Version numbers ───────────────────────────────────────────────

/// Order two version numbers: numerically when both are integers,
/// lexically otherwise.
pub fn compare_version_no(a: &str, b: &str) -> Ordering {
    match (a.parse::<u128>(), b.parse::<u128>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

/// Sort version numbers oldest first.
pub fn sort_version_nos(versions: &mut [String]) {
    versions.sort_by(|a, b| compare_version_no(a, b));
}

/// A fresh version number strictly greater than every existing one.
pub fn next_version_no<S: AsRef<str>>(existing: &[S]) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let floor = existing
        .iter()
        .filter_map(|v| v.as_ref().parse::<u128>().ok())
        .max()
        .map(|max| max + 1)
        .unwrap_or(0);
    now.max(floor).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_group_id_round_trip() {
        let id = TaskGroupId::new("3", "app1", "ns1", "c1", "100");
        let s = id.to_string();
        assert_eq!(s, "3.app1.ns1.c1.100");

        let parsed: TaskGroupId = s.parse().unwrap();
        assert_eq!(parsed, id);
        assert_eq!(
            run_as_and_app_id_of_task_group(&s).unwrap(),
            ("ns1".to_string(), "app1".to_string())
        );
    }

    #[test]
    fn task_id_round_trip() {
        let id = TaskId::new("100", "0", "3", "app1", "ns1", "c1");
        let s = id.to_string();
        assert_eq!(s, "100.0.3.app1.ns1.c1");

        let parsed: TaskId = s.parse().unwrap();
        assert_eq!(parsed.cluster_id, "c1");
        assert_eq!(
            run_as_and_app_id_of_task(&s).unwrap(),
            ("ns1".to_string(), "app1".to_string())
        );
    }

    #[test]
    fn task_resolves_its_group() {
        let group = TaskGroupId::new("3", "app1", "ns1", "c1", "100").to_string();
        let task = TaskId::new("100", "1", "3", "app1", "ns1", "c1").to_string();
        assert_eq!(task_group_id_of_task(&task).unwrap(), group);
    }

    #[test]
    fn wrong_field_count_is_malformed() {
        let err = "a.b.c".parse::<TaskGroupId>().unwrap_err();
        assert!(matches!(
            err,
            StoreError::MalformedId { expected: 5, found: 3, .. }
        ));

        // A task group ID is not a task ID.
        let err = run_as_and_app_id_of_task("3.app1.ns1.c1.100").unwrap_err();
        assert!(matches!(err, StoreError::MalformedId { expected: 6, found: 5, .. }));
    }

    #[test]
    fn version_numbers_compare_numerically() {
        let mut v = vec!["900".to_string(), "1000".to_string(), "95".to_string()];
        sort_version_nos(&mut v);
        assert_eq!(v, vec!["95", "900", "1000"]);
        assert_eq!(compare_version_no("b", "a"), Ordering::Greater);
    }

    #[test]
    fn next_version_is_never_reused() {
        let far_future = "99999999999999999999999".to_string();
        let next = next_version_no(&[far_future.clone()]);
        assert_eq!(compare_version_no(&next, &far_future), Ordering::Greater);

        let fresh = next_version_no::<String>(&[]);
        assert!(fresh.parse::<u128>().unwrap() > 0);
    }
}

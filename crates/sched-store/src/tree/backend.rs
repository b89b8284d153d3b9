//! Entity layout on the coordination tree.
//!
//! ```text
//! {root}/frameworkid
//! {root}/{kind}/{name}                        agents, settings, commands, crr
//! {root}/{kind}/{namespace}/{name}            applications, config objects
//! {root}/{kind}/{namespace}/{app_id}/{name}   versions, task groups, tasks
//! {root}/crd/{custom_kind}/{namespace}/{name}
//! ```
//!
//! Listing walks the layout level by level: a level fixed by the scope is
//! descended directly, an open level fans out over its children.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::{TreeClient, TreeDriver};
use crate::backend::Backend;
use crate::config::TreeConfig;
use crate::error::{StoreError, StoreResult, map_err};
use crate::kind::{KeyShape, Kind, ObjectKey, Scope};
use crate::stats::StatsSnapshot;
use crate::types::Labels;

pub struct TreeBackend {
    driver: TreeDriver,
    root: String,
}

fn segment(value: &str) -> StoreResult<&str> {
    if value.is_empty() || value.contains('/') {
        return Err(StoreError::InvalidKey(format!(
            "tree segment {value:?} must be non-empty and contain no '/'"
        )));
    }
    Ok(value)
}

impl TreeBackend {
    pub fn new(client: Arc<dyn TreeClient>, config: &TreeConfig) -> Self {
        Self {
            driver: TreeDriver::new(client),
            root: config.root.clone(),
        }
    }

    fn kind_root(&self, kind: Kind) -> String {
        format!("{}/{}", self.root, kind.as_str())
    }

    fn path(&self, kind: Kind, key: &ObjectKey) -> StoreResult<String> {
        let base = self.kind_root(kind);
        let path = match kind.shape() {
            KeyShape::Singleton => base,
            KeyShape::Cluster => format!("{base}/{}", segment(&key.name)?),
            KeyShape::Namespaced => format!(
                "{base}/{}/{}",
                segment(&key.namespace)?,
                segment(&key.name)?
            ),
            KeyShape::Owned => format!(
                "{base}/{}/{}/{}",
                segment(&key.namespace)?,
                segment(&key.owner)?,
                segment(&key.name)?
            ),
            KeyShape::KindScoped => format!(
                "{base}/{}/{}/{}",
                segment(&key.owner)?,
                segment(&key.namespace)?,
                segment(&key.name)?
            ),
        };
        Ok(path)
    }

    /// Intermediate levels between the kind root and the leaf names.
    fn levels(kind: Kind, scope: &Scope) -> Vec<Option<String>> {
        match kind.shape() {
            KeyShape::Singleton | KeyShape::Cluster => Vec::new(),
            KeyShape::Namespaced => vec![scope.namespace.clone()],
            KeyShape::Owned => vec![scope.namespace.clone(), scope.owner.clone()],
            KeyShape::KindScoped => vec![scope.owner.clone(), scope.namespace.clone()],
        }
    }

    fn leaf_paths(&self, kind: Kind, scope: &Scope) -> StoreResult<Vec<String>> {
        let mut parents = vec![self.kind_root(kind)];
        for level in Self::levels(kind, scope) {
            let mut next = Vec::new();
            for parent in &parents {
                match &level {
                    Some(fixed) => next.push(format!("{parent}/{}", segment(fixed)?)),
                    None => {
                        for child in self.driver.list(parent)? {
                            next.push(format!("{parent}/{child}"));
                        }
                    }
                }
            }
            parents = next;
        }

        let mut leaves = Vec::new();
        for parent in &parents {
            for child in self.driver.list(parent)? {
                leaves.push(format!("{parent}/{child}"));
            }
        }
        Ok(leaves)
    }

    fn read(&self, path: &str) -> StoreResult<Value> {
        let data = self.driver.fetch(path)?;
        serde_json::from_slice(&data).map_err(map_err!(Deserialize))
    }
}

impl Backend for TreeBackend {
    fn name(&self) -> &'static str {
        "tree"
    }

    fn put(&self, kind: Kind, key: &ObjectKey, _labels: &Labels, value: Value) -> StoreResult<()> {
        let path = self.path(kind, key)?;
        let data = serde_json::to_vec(&value).map_err(map_err!(Serialize))?;
        if self.driver.exists(&path)? {
            self.driver.update(&path, &data)
        } else {
            self.driver.insert(&path, &data)
        }
    }

    fn get(&self, kind: Kind, key: &ObjectKey) -> StoreResult<Value> {
        let path = self.path(kind, key)?;
        self.read(&path)
    }

    fn remove(&self, kind: Kind, key: &ObjectKey) -> StoreResult<()> {
        let path = self.path(kind, key)?;
        self.driver.delete(&path)
    }

    fn list(&self, kind: Kind, scope: &Scope) -> StoreResult<Vec<Value>> {
        if kind.shape() == KeyShape::Singleton {
            return match self.read(&self.kind_root(kind)) {
                Ok(value) => Ok(vec![value]),
                Err(e) if e.is_not_found() => Ok(Vec::new()),
                Err(e) => Err(e),
            };
        }

        let mut values = Vec::new();
        for path in self.leaf_paths(kind, scope)? {
            match self.read(&path) {
                Ok(value) => values.push(value),
                Err(e) if e.is_not_found() => {
                    debug!(%path, "node vanished during list");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(values)
    }

    fn namespaces(&self, kind: Kind) -> StoreResult<Vec<String>> {
        match kind.shape() {
            KeyShape::Namespaced | KeyShape::Owned => {
                let names: BTreeSet<String> =
                    self.driver.list(&self.kind_root(kind))?.into_iter().collect();
                Ok(names.into_iter().collect())
            }
            _ => Ok(Vec::new()),
        }
    }

    fn stats(&self) -> StatsSnapshot {
        self.driver.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::RedbTree;
    use serde_json::json;

    fn backend() -> (RedbTree, TreeBackend) {
        let tree = RedbTree::open_in_memory().unwrap();
        let backend = TreeBackend::new(Arc::new(tree.clone()), &TreeConfig::default());
        (tree, backend)
    }

    #[test]
    fn paths_follow_layout() {
        let (_, b) = backend();
        assert_eq!(
            b.path(Kind::Application, &ObjectKey::namespaced("ns1", "app1")).unwrap(),
            "/blueking/application/ns1/app1"
        );
        assert_eq!(
            b.path(Kind::Version, &ObjectKey::owned("ns1", "app1", "100")).unwrap(),
            "/blueking/version/ns1/app1/100"
        );
        assert_eq!(
            b.path(Kind::CustomResourceDefinition, &ObjectKey::kind_scoped("Foo", "ns1", "x"))
                .unwrap(),
            "/blueking/crd/Foo/ns1/x"
        );
        assert_eq!(
            b.path(Kind::Framework, &ObjectKey::singleton()).unwrap(),
            "/blueking/frameworkid"
        );
        assert!(b.path(Kind::Agent, &ObjectKey::cluster("")).is_err());
        assert!(b.path(Kind::Agent, &ObjectKey::cluster("a/b")).is_err());
    }

    #[test]
    fn put_get_remove() {
        let (tree, b) = backend();
        let key = ObjectKey::namespaced("ns1", "cm1");
        b.put(Kind::ConfigMap, &key, &Labels::new(), json!({"v": 1})).unwrap();
        assert_eq!(b.get(Kind::ConfigMap, &key).unwrap(), json!({"v": 1}));
        assert!(tree.exists("/blueking/configmap/ns1/cm1").unwrap());

        b.remove(Kind::ConfigMap, &key).unwrap();
        assert!(b.get(Kind::ConfigMap, &key).unwrap_err().is_not_found());
        // Absent node delete is benign.
        b.remove(Kind::ConfigMap, &key).unwrap();
    }

    #[test]
    fn list_flattens_open_levels() {
        let (_, b) = backend();
        let none = Labels::new();
        b.put(Kind::Task, &ObjectKey::owned("ns1", "a", "t1"), &none, json!(1)).unwrap();
        b.put(Kind::Task, &ObjectKey::owned("ns1", "b", "t2"), &none, json!(2)).unwrap();
        b.put(Kind::Task, &ObjectKey::owned("ns2", "a", "t3"), &none, json!(3)).unwrap();

        assert_eq!(b.list(Kind::Task, &Scope::all()).unwrap().len(), 3);
        assert_eq!(b.list(Kind::Task, &Scope::namespace("ns1")).unwrap().len(), 2);
        assert_eq!(
            b.list(Kind::Task, &Scope::owner("ns1", "a")).unwrap(),
            vec![json!(1)]
        );
        assert!(b.list(Kind::Task, &Scope::owner("ns9", "a")).unwrap().is_empty());
    }

    #[test]
    fn list_custom_kind_across_namespaces() {
        let (_, b) = backend();
        let none = Labels::new();
        let crd = Kind::CustomResourceDefinition;
        b.put(crd, &ObjectKey::kind_scoped("Foo", "ns1", "x"), &none, json!("x")).unwrap();
        b.put(crd, &ObjectKey::kind_scoped("Foo", "ns2", "y"), &none, json!("y")).unwrap();
        b.put(crd, &ObjectKey::kind_scoped("Bar", "ns1", "z"), &none, json!("z")).unwrap();

        assert_eq!(b.list(crd, &Scope::custom_kind("Foo", None)).unwrap().len(), 2);
        assert_eq!(b.list(crd, &Scope::custom_kind("Foo", Some("ns2"))).unwrap(), vec![json!("y")]);
        assert_eq!(b.list(crd, &Scope::all()).unwrap().len(), 3);
    }

    #[test]
    fn singleton_list_and_namespaces() {
        let (_, b) = backend();
        assert!(b.list(Kind::Framework, &Scope::all()).unwrap().is_empty());
        b.put(Kind::Framework, &ObjectKey::singleton(), &Labels::new(), json!("fw-1")).unwrap();
        assert_eq!(b.list(Kind::Framework, &Scope::all()).unwrap(), vec![json!("fw-1")]);

        b.put(Kind::Application, &ObjectKey::namespaced("b-ns", "x"), &Labels::new(), json!({})).unwrap();
        b.put(Kind::Application, &ObjectKey::namespaced("a-ns", "y"), &Labels::new(), json!({})).unwrap();
        assert_eq!(b.namespaces(Kind::Application).unwrap(), vec!["a-ns", "b-ns"]);
    }
}

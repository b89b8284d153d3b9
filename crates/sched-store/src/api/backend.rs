//! Entity layout on the API server.
//!
//! | Kind                       | Namespace                 | Object name            |
//! |----------------------------|---------------------------|------------------------|
//! | Framework                  | internal                  | `frameworkid`          |
//! | Agent, settings, commands  | internal                  | key name               |
//! | CustomResourceRegister     | internal                  | custom kind            |
//! | AdmissionWebhook           | internal                  | `{namespace}.{name}`   |
//! | Version                    | domain                    | `{app_id}-{version_no}`|
//! | CustomResourceDefinition   | `{kind}-{namespace}`      | name                   |
//! | everything else            | domain                    | key name               |
//!
//! Objects that cannot be found by coordinates alone carry system labels:
//! `appid` on versions, task groups and tasks; `crdkind` and `namespace` on
//! custom resource definitions; `namespace` on admission webhooks.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::{
    ApiClient, ApiDriver, LabelSelector, NamespacePolicy, is_valid_label_value,
    namespace_policy, sanitize_labels,
};
use crate::backend::Backend;
use crate::config::ApiConfig;
use crate::error::{StoreError, StoreResult};
use crate::kind::{KeyShape, Kind, ObjectKey, Scope};
use crate::stats::StatsSnapshot;
use crate::types::Labels;

const FRAMEWORK_OBJECT: &str = "frameworkid";
const LABEL_APP_ID: &str = "appid";
const LABEL_CRD_KIND: &str = "crdkind";
const LABEL_NAMESPACE: &str = "namespace";

pub struct ApiBackend {
    driver: ApiDriver,
}

fn required(what: &str, value: &str) -> StoreResult<()> {
    if value.is_empty() {
        return Err(StoreError::InvalidKey(format!("{what} must not be empty")));
    }
    Ok(())
}

fn system_label(
    labels: &mut BTreeMap<String, String>,
    key: &str,
    value: &str,
) -> StoreResult<()> {
    if !is_valid_label_value(value) {
        return Err(StoreError::InvalidKey(format!(
            "{value:?} cannot be used as the {key} label"
        )));
    }
    labels.insert(key.to_string(), value.to_string());
    Ok(())
}

fn custom_kind_namespace(kind: &str, namespace: &str) -> String {
    format!("{kind}-{namespace}").to_lowercase()
}

/// Object name of a namespaced kind stored in the internal namespace. Domain
/// namespaces never contain `.`, which keeps the encoding injective.
fn internal_object_name(namespace: &str, name: &str) -> StoreResult<String> {
    required("namespace", namespace)?;
    if namespace.contains('.') {
        return Err(StoreError::InvalidKey(format!(
            "namespace {namespace:?} must not contain '.'"
        )));
    }
    Ok(format!("{namespace}.{name}"))
}

impl ApiBackend {
    pub fn new(client: Arc<dyn ApiClient>, config: &ApiConfig) -> Self {
        Self {
            driver: ApiDriver::new(client, config),
        }
    }

    /// `(namespace, name)` of the API object holding `key`.
    fn coordinates(&self, kind: Kind, key: &ObjectKey) -> StoreResult<(String, String)> {
        if kind == Kind::Framework {
            return Ok((
                self.driver.config().internal_namespace.clone(),
                FRAMEWORK_OBJECT.to_string(),
            ));
        }
        required("object name", &key.name)?;
        match namespace_policy(kind) {
            NamespacePolicy::Internal => {
                let name = if kind == Kind::AdmissionWebhook {
                    internal_object_name(&key.namespace, &key.name)?
                } else {
                    key.name.clone()
                };
                Ok((self.driver.config().internal_namespace.clone(), name))
            }
            NamespacePolicy::CustomKind => {
                required("custom kind", &key.owner)?;
                required("namespace", &key.namespace)?;
                Ok((
                    custom_kind_namespace(&key.owner, &key.namespace),
                    key.name.clone(),
                ))
            }
            NamespacePolicy::Domain => {
                required("namespace", &key.namespace)?;
                let name = if kind == Kind::Version {
                    required("application id", &key.owner)?;
                    format!("{}-{}", key.owner, key.name)
                } else {
                    key.name.clone()
                };
                Ok((key.namespace.clone(), name))
            }
        }
    }

    fn object_labels(
        &self,
        kind: Kind,
        key: &ObjectKey,
        labels: &Labels,
    ) -> StoreResult<BTreeMap<String, String>> {
        let mut out = sanitize_labels(labels);
        match kind.shape() {
            KeyShape::Owned => system_label(&mut out, LABEL_APP_ID, &key.owner)?,
            KeyShape::KindScoped => {
                system_label(&mut out, LABEL_CRD_KIND, &key.owner)?;
                system_label(&mut out, LABEL_NAMESPACE, &key.namespace)?;
            }
            _ if kind == Kind::AdmissionWebhook => {
                system_label(&mut out, LABEL_NAMESPACE, &key.namespace)?;
            }
            _ => {}
        }
        Ok(out)
    }

    /// Namespace and selector a list of `kind` under `scope` runs with.
    fn list_query(&self, kind: Kind, scope: &Scope) -> (Option<String>, LabelSelector) {
        let mut selector = LabelSelector::new();
        let namespace = match namespace_policy(kind) {
            NamespacePolicy::Internal => {
                if let (Kind::AdmissionWebhook, Some(ns)) = (kind, &scope.namespace) {
                    selector.insert(LABEL_NAMESPACE.to_string(), ns.clone());
                }
                Some(self.driver.config().internal_namespace.clone())
            }
            NamespacePolicy::CustomKind => match (&scope.owner, &scope.namespace) {
                (Some(custom), Some(ns)) => {
                    selector.insert(LABEL_CRD_KIND.to_string(), custom.clone());
                    Some(custom_kind_namespace(custom, ns))
                }
                (Some(custom), None) => {
                    selector.insert(LABEL_CRD_KIND.to_string(), custom.clone());
                    None
                }
                (None, ns) => {
                    if let Some(ns) = ns {
                        selector.insert(LABEL_NAMESPACE.to_string(), ns.clone());
                    }
                    None
                }
            },
            NamespacePolicy::Domain => {
                if let Some(owner) = &scope.owner {
                    selector.insert(LABEL_APP_ID.to_string(), owner.clone());
                }
                scope.namespace.clone()
            }
        };
        (namespace, selector)
    }
}

impl Backend for ApiBackend {
    fn name(&self) -> &'static str {
        "api"
    }

    fn put(&self, kind: Kind, key: &ObjectKey, labels: &Labels, value: Value) -> StoreResult<()> {
        let (namespace, name) = self.coordinates(kind, key)?;
        let labels = self.object_labels(kind, key, labels)?;
        self.driver.upsert(kind, &namespace, &name, labels, value)
    }

    fn get(&self, kind: Kind, key: &ObjectKey) -> StoreResult<Value> {
        let (namespace, name) = self.coordinates(kind, key)?;
        Ok(self.driver.get(kind, &namespace, &name)?.spec)
    }

    /// Removing an object that is already gone succeeds.
    fn remove(&self, kind: Kind, key: &ObjectKey) -> StoreResult<()> {
        let (namespace, name) = self.coordinates(kind, key)?;
        match self.driver.delete(kind, &namespace, &name) {
            Err(e) if e.is_not_found() => {
                debug!(%kind, %namespace, %name, "delete of absent object ignored");
                Ok(())
            }
            other => other,
        }
    }

    fn list(&self, kind: Kind, scope: &Scope) -> StoreResult<Vec<Value>> {
        let (namespace, selector) = self.list_query(kind, scope);
        let objects = self.driver.list(kind, namespace.as_deref(), &selector)?;
        Ok(objects.into_iter().map(|o| o.spec).collect())
    }

    fn namespaces(&self, kind: Kind) -> StoreResult<Vec<String>> {
        let objects = self.driver.list(kind, None, &LabelSelector::new())?;
        let names: BTreeSet<String> = match namespace_policy(kind) {
            NamespacePolicy::Domain => objects
                .into_iter()
                .map(|o| o.metadata.namespace)
                .collect(),
            _ => objects
                .into_iter()
                .filter_map(|mut o| o.metadata.labels.remove(LABEL_NAMESPACE))
                .collect(),
        };
        Ok(names.into_iter().collect())
    }

    fn stats(&self) -> StatsSnapshot {
        self.driver.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RedbApiServer;
    use serde_json::json;

    fn backend() -> (RedbApiServer, ApiBackend) {
        let server = RedbApiServer::open_in_memory().unwrap();
        let backend = ApiBackend::new(Arc::new(server.clone()), &ApiConfig::default());
        (server, backend)
    }

    #[test]
    fn coordinates_follow_namespace_policy() {
        let (_, b) = backend();
        assert_eq!(
            b.coordinates(Kind::Agent, &ObjectKey::cluster("10.0.0.1")).unwrap(),
            ("bcs-system".to_string(), "10.0.0.1".to_string())
        );
        assert_eq!(
            b.coordinates(Kind::Version, &ObjectKey::owned("ns1", "app1", "100")).unwrap(),
            ("ns1".to_string(), "app1-100".to_string())
        );
        assert_eq!(
            b.coordinates(
                Kind::CustomResourceDefinition,
                &ObjectKey::kind_scoped("Foo", "NS1", "x")
            )
            .unwrap(),
            ("foo-ns1".to_string(), "x".to_string())
        );
        assert_eq!(
            b.coordinates(Kind::Framework, &ObjectKey::singleton()).unwrap(),
            ("bcs-system".to_string(), "frameworkid".to_string())
        );
        assert!(b.coordinates(Kind::Application, &ObjectKey::namespaced("", "a")).is_err());
    }

    #[test]
    fn put_sanitizes_user_labels_and_adds_app_label() {
        let (server, b) = backend();
        let mut labels = Labels::new();
        labels.insert("tier".into(), "web".into());
        labels.insert("bad key".into(), "x".into());
        let key = ObjectKey::owned("ns1", "app1", "100");
        b.put(Kind::Version, &key, &labels, json!({"n": 1})).unwrap();

        let stored = server.get("versions", "ns1", "app1-100").unwrap();
        assert_eq!(stored.metadata.labels.get("tier").map(String::as_str), Some("web"));
        assert_eq!(stored.metadata.labels.get("appid").map(String::as_str), Some("app1"));
        assert!(!stored.metadata.labels.contains_key("bad key"));
        assert_eq!(b.get(Kind::Version, &key).unwrap(), json!({"n": 1}));
    }

    #[test]
    fn owned_list_is_label_filtered() {
        let (_, b) = backend();
        let none = Labels::new();
        b.put(Kind::Task, &ObjectKey::owned("ns1", "a", "t1"), &none, json!(1)).unwrap();
        b.put(Kind::Task, &ObjectKey::owned("ns1", "b", "t2"), &none, json!(2)).unwrap();
        b.put(Kind::Task, &ObjectKey::owned("ns2", "a", "t3"), &none, json!(3)).unwrap();

        assert_eq!(b.list(Kind::Task, &Scope::all()).unwrap().len(), 3);
        assert_eq!(b.list(Kind::Task, &Scope::owner("ns1", "a")).unwrap(), vec![json!(1)]);
        assert_eq!(b.list(Kind::Task, &Scope::namespace("ns1")).unwrap().len(), 2);
    }

    #[test]
    fn same_named_definitions_of_different_kinds_coexist() {
        let (_, b) = backend();
        let none = Labels::new();
        let crd = Kind::CustomResourceDefinition;
        b.put(crd, &ObjectKey::kind_scoped("Foo", "ns1", "x"), &none, json!("foo")).unwrap();
        b.put(crd, &ObjectKey::kind_scoped("Bar", "ns1", "x"), &none, json!("bar")).unwrap();
        b.put(crd, &ObjectKey::kind_scoped("Foo", "ns2", "y"), &none, json!("foo2")).unwrap();

        assert_eq!(
            b.get(crd, &ObjectKey::kind_scoped("Bar", "ns1", "x")).unwrap(),
            json!("bar")
        );
        assert_eq!(b.list(crd, &Scope::custom_kind("Foo", None)).unwrap().len(), 2);
        assert_eq!(
            b.list(crd, &Scope::custom_kind("Foo", Some("ns2"))).unwrap(),
            vec![json!("foo2")]
        );
        assert_eq!(b.namespaces(crd).unwrap(), vec!["ns1", "ns2"]);
    }

    #[test]
    fn application_namespaces_are_distinct_and_sorted() {
        let (_, b) = backend();
        let none = Labels::new();
        b.put(Kind::Application, &ObjectKey::namespaced("b-ns", "x"), &none, json!({})).unwrap();
        b.put(Kind::Application, &ObjectKey::namespaced("a-ns", "y"), &none, json!({})).unwrap();
        b.put(Kind::Application, &ObjectKey::namespaced("a-ns", "z"), &none, json!({})).unwrap();
        assert_eq!(b.namespaces(Kind::Application).unwrap(), vec!["a-ns", "b-ns"]);
    }

    #[test]
    fn remove_missing_succeeds() {
        let (server, b) = backend();
        let key = ObjectKey::cluster("10.0.0.9");
        b.remove(Kind::Agent, &key).unwrap();

        b.put(Kind::Agent, &key, &Labels::new(), json!({"key": "10.0.0.9"})).unwrap();
        server.delete("agents", "bcs-system", "10.0.0.9").unwrap();
        b.remove(Kind::Agent, &key).unwrap();
        assert!(b.get(Kind::Agent, &key).unwrap_err().is_not_found());
    }

    #[test]
    fn webhooks_of_different_namespaces_do_not_collide() {
        let (server, b) = backend();
        let none = Labels::new();
        let hook = Kind::AdmissionWebhook;
        b.put(hook, &ObjectKey::namespaced("ns1", "policy"), &none, json!("one")).unwrap();
        b.put(hook, &ObjectKey::namespaced("ns2", "policy"), &none, json!("two")).unwrap();

        assert_eq!(
            b.get(hook, &ObjectKey::namespaced("ns1", "policy")).unwrap(),
            json!("one")
        );
        assert_eq!(
            b.get(hook, &ObjectKey::namespaced("ns2", "policy")).unwrap(),
            json!("two")
        );
        assert!(server.get("admissionwebhookconfigurations", "bcs-system", "ns1.policy").is_ok());
        assert_eq!(b.list(hook, &Scope::all()).unwrap().len(), 2);
        assert_eq!(
            b.list(hook, &Scope::namespace("ns2")).unwrap(),
            vec![json!("two")]
        );
        assert_eq!(b.namespaces(hook).unwrap(), vec!["ns1", "ns2"]);

        let dotted = b.put(hook, &ObjectKey::namespaced("a.b", "policy"), &none, json!(0));
        assert!(matches!(dotted, Err(StoreError::InvalidKey(_))));
    }
}

//! Write-through cache behavior seen through the store contract.

mod common;

use std::sync::Arc;

use common::*;
use sched_store::api::RedbApiServer;
use sched_store::tree::{RedbTree, TreeClient};
use sched_store::*;

/// A second, uncached store over the same tree, standing in for a writer that
/// bypasses the contract.
fn side_channel(tree: &RedbTree) -> Store {
    let store = Store::tree(Arc::new(tree.clone()), &TreeConfig::default());
    store.init_cache_mgr(false).unwrap();
    store
}

fn api_side_channel(server: &RedbApiServer) -> Store {
    let store = Store::api(Arc::new(server.clone()), &ApiConfig::default());
    store.init_cache_mgr(false).unwrap();
    store
}

#[test]
fn population_loads_existing_objects() {
    let (tree, store) = tree_store();
    let seed = side_channel(&tree);
    seed.save_application(&application("ns1", "web")).unwrap();
    seed.save_version(&version("ns1", "web", "100")).unwrap();
    seed.save_task_group(&task_group("ns1", "web", 0, 100, 2)).unwrap();
    seed.save_agent(&agent("10.0.0.1")).unwrap();
    seed.save_agent_setting(&agent_setting("10.0.0.1")).unwrap();
    seed.save_configmap(&configmap("ns1", "conf")).unwrap();
    seed.save_secret(&secret("ns1", "pw")).unwrap();

    store.init_cache_mgr(true).unwrap();
    assert_eq!(store.fetch_application("ns1", "web").unwrap(), application("ns1", "web"));
    assert_eq!(store.list_versions("ns1", "web").unwrap(), vec!["100"]);
    assert_eq!(
        store.fetch_task_group("0.web.ns1.c1.100").unwrap(),
        task_group("ns1", "web", 0, 100, 2)
    );
    assert_eq!(store.list_all_agents().unwrap().len(), 1);
    assert_eq!(store.list_all_agent_settings().unwrap().len(), 1);
    assert_eq!(store.list_all_configmaps().unwrap().len(), 1);
    assert_eq!(store.list_all_secrets().unwrap().len(), 1);
}

#[test]
fn cache_is_authoritative_once_enabled() {
    let (tree, store) = tree_store();
    let seed = side_channel(&tree);
    seed.save_application(&application("ns1", "web")).unwrap();
    store.init_cache_mgr(true).unwrap();

    // Mutations behind the contract's back stay invisible.
    let mut changed = application("ns1", "web");
    changed.instances = 9;
    seed.save_application(&changed).unwrap();
    seed.save_application(&application("ns1", "late")).unwrap();
    assert_eq!(store.fetch_application("ns1", "web").unwrap().instances, 2);
    assert!(store.fetch_application("ns1", "late").unwrap_err().is_not_found());

    seed.delete_application("ns1", "web").unwrap();
    assert!(store.fetch_application("ns1", "web").is_ok());

    // The contract's own save path is what the cache follows.
    store.save_application(&changed).unwrap();
    assert_eq!(store.fetch_application("ns1", "web").unwrap().instances, 9);
    assert_eq!(seed.fetch_application("ns1", "web").unwrap().instances, 9);
}

#[test]
fn objects_created_after_population_are_added_lazily() {
    let (_tree, store) = tree_store();
    store.init_cache_mgr(true).unwrap();

    let tg = task_group("ns7", "fresh", 0, 500, 2);
    store.save_task_group(&tg).unwrap();
    assert_eq!(store.fetch_task_group(&tg.id).unwrap(), tg);

    let mut t = tg.tasks[0].clone();
    t.status = TaskStatus::Failed;
    store.save_task(&t).unwrap();
    let fetched = store.fetch_task_group(&tg.id).unwrap();
    assert_eq!(fetched.tasks[0].status, TaskStatus::Failed);
}

#[test]
fn deleting_application_keeps_its_task_groups_until_deleted() {
    let (_tree, store) = tree_store();
    store.init_cache_mgr(true).unwrap();
    store.save_application(&application("ns1", "web")).unwrap();
    let tg = task_group("ns1", "web", 0, 100, 1);
    store.save_task_group(&tg).unwrap();

    store.delete_application("ns1", "web").unwrap();
    assert!(store.fetch_application("ns1", "web").unwrap_err().is_not_found());
    assert!(store.list_run_as().unwrap().is_empty());
    assert_eq!(store.list_task_groups("ns1", "web").unwrap().len(), 1);

    store.delete_task_group(&tg.id).unwrap();
    assert!(store.list_task_groups("ns1", "web").unwrap().is_empty());
    assert!(store.fetch_task(&tg.tasks[0].id).unwrap_err().is_not_found());
}

#[test]
fn failed_backend_write_leaves_cache_untouched() {
    let (tree, store) = tree_store();
    store.init_cache_mgr(true).unwrap();

    // A child under the task's node makes the tree refuse the delete.
    let tg = task_group("ns1", "web", 0, 100, 1);
    store.save_task_group(&tg).unwrap();
    let task_path = format!("/blueking/task/ns1/web/{}", tg.tasks[0].id);
    tree.set(&format!("{task_path}/stray"), b"x").unwrap();

    let err = store.delete_task(&tg.tasks[0].id).unwrap_err();
    assert!(matches!(err, StoreError::NotEmpty(_)));
    assert_eq!(store.fetch_task(&tg.tasks[0].id).unwrap(), tg.tasks[0]);
}

#[test]
fn delete_evicts_objects_already_gone_from_the_api_server() {
    let (server, store) = api_store();
    store.init_cache_mgr(true).unwrap();
    let side = api_side_channel(&server);

    store.save_configmap(&configmap("ns1", "cm")).unwrap();
    store.save_application(&application("ns1", "web")).unwrap();
    let tg = task_group("ns1", "web", 0, 100, 2);
    store.save_task_group(&tg).unwrap();

    side.delete_configmap("ns1", "cm").unwrap();
    side.delete_application("ns1", "web").unwrap();
    side.delete_task_group(&tg.id).unwrap();
    assert!(store.fetch_configmap("ns1", "cm").is_ok());

    store.delete_configmap("ns1", "cm").unwrap();
    store.delete_application("ns1", "web").unwrap();
    store.delete_task_group(&tg.id).unwrap();
    assert!(store.fetch_configmap("ns1", "cm").unwrap_err().is_not_found());
    assert!(store.fetch_application("ns1", "web").unwrap_err().is_not_found());
    assert!(store.fetch_task_group(&tg.id).unwrap_err().is_not_found());
    for t in &tg.tasks {
        assert!(store.fetch_task(&t.id).unwrap_err().is_not_found());
    }
}

#[test]
fn returned_values_are_independent_copies() {
    let (_tree, store) = tree_store();
    store.init_cache_mgr(true).unwrap();
    let mut cm = configmap("ns1", "conf");
    store.save_configmap(&cm).unwrap();

    cm.data.clear();
    let mut fetched = store.fetch_configmap("ns1", "conf").unwrap();
    assert_eq!(fetched.data.len(), 1);
    fetched.meta.labels.clear();
    assert_eq!(store.fetch_configmap("ns1", "conf").unwrap().meta.labels.len(), 1);
}

#[test]
fn uninit_requires_reinit() {
    let (_tree, store) = tree_store();
    store.init_cache_mgr(true).unwrap();
    store.save_agent(&agent("10.0.0.1")).unwrap();
    store.uninit_cache_mgr();
    assert!(matches!(store.list_all_agents(), Err(StoreError::CacheNotInitialized)));

    // Reinitializing reloads from the backend.
    store.init_cache_mgr(true).unwrap();
    assert_eq!(store.list_all_agents().unwrap().len(), 1);
}

//! Per-ID lock pools exposed by the store.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use common::*;

#[test]
fn application_lock_serializes_save_sequences() {
    let (_tree, store) = tree_store();
    store.init_cache_mgr(true).unwrap();
    let store = Arc::new(store);
    let inside = Arc::new(AtomicUsize::new(0));
    let max_inside = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..4u64)
        .map(|i| {
            let store = Arc::clone(&store);
            let inside = Arc::clone(&inside);
            let max_inside = Arc::clone(&max_inside);
            thread::spawn(move || {
                store.lock_application("web");
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_inside.fetch_max(now, Ordering::SeqCst);

                let mut app = application("ns1", "web");
                app.instances = i;
                store.save_application(&app).unwrap();
                store.save_task_group(&task_group("ns1", "web", i, 100, 1)).unwrap();
                thread::sleep(Duration::from_millis(10));

                inside.fetch_sub(1, Ordering::SeqCst);
                store.unlock_application("web");
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    assert_eq!(store.list_task_groups("ns1", "web").unwrap().len(), 4);
}

#[test]
fn pools_are_independent() {
    let (_tree, store) = tree_store();
    let _app = store.application_guard("same-id");
    let _dep = store.deployment_guard("same-id");
    let _cmd = store.command_guard("same-id");
}

#[test]
fn unlock_of_unknown_id_returns() {
    let (_tree, store) = tree_store();
    store.unlock_application("nobody");
    store.unlock_deployment("nobody");
    store.unlock_command("nobody");
    // The pool still works afterwards.
    store.lock_application("nobody");
    store.unlock_application("nobody");
}

#[test]
fn guard_release_wakes_waiter() {
    let (_tree, store) = tree_store();
    let store = Arc::new(store);
    let guard = store.deployment_guard("d1");

    let waiter = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            let _g = store.deployment_guard("d1");
        })
    };
    thread::sleep(Duration::from_millis(50));
    assert!(!waiter.is_finished());
    drop(guard);
    waiter.join().unwrap();
}

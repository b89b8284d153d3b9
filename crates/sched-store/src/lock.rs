//! Per-ID mutual exclusion for multi-step business operations.
//!
//! A [`LockPool`] lazily creates one lock per ID. Unlike a `MutexGuard`, a
//! pool lock can be released by an explicit [`LockPool::unlock`] call from
//! any thread, so callers that split lock and unlock across functions work
//! the same as callers that use the RAII [`PoolGuard`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex, RwLock, RwLockUpgradableReadGuard};
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct KeyedLock {
    held: Mutex<bool>,
    released: Condvar,
}

impl KeyedLock {
    fn acquire(&self) {
        let mut held = self.held.lock();
        while *held {
            self.released.wait(&mut held);
        }
        *held = true;
    }

    fn try_acquire(&self) -> bool {
        let mut held = self.held.lock();
        if *held {
            return false;
        }
        *held = true;
        true
    }

    /// Returns whether the lock was held.
    fn release(&self) -> bool {
        let mut held = self.held.lock();
        let was_held = *held;
        *held = false;
        drop(held);
        self.released.notify_one();
        was_held
    }
}

pub struct LockPool {
    name: &'static str,
    locks: RwLock<HashMap<String, Arc<KeyedLock>>>,
}

impl LockPool {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            locks: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of IDs that have a lock.
    pub fn len(&self) -> usize {
        self.locks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.read().is_empty()
    }

    /// The lock for `id`, created on first use. Exactly one lock ever exists
    /// per ID.
    fn entry(&self, id: &str) -> Arc<KeyedLock> {
        if let Some(lock) = self.locks.read().get(id) {
            return Arc::clone(lock);
        }
        let locks = self.locks.upgradable_read();
        if let Some(lock) = locks.get(id) {
            return Arc::clone(lock);
        }
        let mut locks = RwLockUpgradableReadGuard::upgrade(locks);
        Arc::clone(locks.entry(id.to_string()).or_default())
    }

    /// Block until the lock for `id` is held by the caller.
    pub fn lock(&self, id: &str) {
        self.entry(id).acquire();
        debug!(pool = self.name, %id, "locked");
    }

    /// Take the lock for `id` if it is free.
    pub fn try_lock(&self, id: &str) -> bool {
        self.entry(id).try_acquire()
    }

    /// Release the lock for `id`. Unknown or unheld IDs are logged and
    /// otherwise ignored.
    pub fn unlock(&self, id: &str) {
        let lock = self.locks.read().get(id).cloned();
        match lock {
            Some(lock) => {
                if lock.release() {
                    debug!(pool = self.name, %id, "unlocked");
                } else {
                    warn!(pool = self.name, %id, "unlock of a lock that was not held");
                }
            }
            None => warn!(pool = self.name, %id, "unlock of unknown id"),
        }
    }

    /// Lock `id` until the returned guard drops.
    pub fn guard(&self, id: &str) -> PoolGuard<'_> {
        self.lock(id);
        PoolGuard {
            pool: self,
            id: id.to_string(),
        }
    }
}

/// Holds a pool lock; releases it on drop.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct PoolGuard<'a> {
    pool: &'a LockPool,
    id: String,
}

impl PoolGuard<'_> {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for PoolGuard<'_> {
    fn drop(&mut self) {
        self.pool.unlock(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn second_locker_waits_for_unlock() {
        let pool = Arc::new(LockPool::new("application"));
        let entered = Arc::new(AtomicBool::new(false));
        pool.lock("A");

        let handle = {
            let pool = Arc::clone(&pool);
            let entered = Arc::clone(&entered);
            thread::spawn(move || {
                pool.lock("A");
                entered.store(true, Ordering::SeqCst);
                pool.unlock("A");
            })
        };

        thread::sleep(Duration::from_millis(100));
        assert!(!entered.load(Ordering::SeqCst));
        pool.unlock("A");
        handle.join().unwrap();
        assert!(entered.load(Ordering::SeqCst));
    }

    #[test]
    fn distinct_ids_do_not_block() {
        let pool = LockPool::new("deployment");
        pool.lock("A");
        assert!(pool.try_lock("B"));
        assert!(!pool.try_lock("A"));
        pool.unlock("A");
        pool.unlock("B");
    }

    #[test]
    fn unlock_unknown_is_noop() {
        let pool = LockPool::new("command");
        pool.unlock("never-seen");
        assert!(pool.is_empty());
        pool.lock("x");
        pool.unlock("x");
        // Double unlock is tolerated too.
        pool.unlock("x");
        assert!(pool.try_lock("x"));
    }

    #[test]
    fn one_lock_per_id_under_concurrent_first_use() {
        let pool = Arc::new(LockPool::new("application"));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || pool.entry("shared"))
            })
            .collect();
        let locks: Vec<Arc<KeyedLock>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(locks.iter().all(|l| Arc::ptr_eq(l, &locks[0])));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn guard_releases_on_drop() {
        let pool = LockPool::new("application");
        {
            let guard = pool.guard("A");
            assert_eq!(guard.id(), "A");
            assert!(!pool.try_lock("A"));
        }
        assert!(pool.try_lock("A"));
    }
}

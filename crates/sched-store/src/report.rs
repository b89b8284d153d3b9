//! Periodic object-count reporting.
//!
//! [`ObjectReporter`] takes a read-only [`ObjectCounts`] snapshot through the
//! store contract every interval and logs it along with the backend's driver
//! statistics.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::store::Store;
use crate::types::TaskStatus;

/// Counts of the main object kinds at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ObjectCounts {
    pub namespaces: usize,
    pub applications: usize,
    pub task_groups: usize,
    pub running_task_groups: usize,
    pub agents: usize,
    pub configmaps: usize,
    pub secrets: usize,
    pub services: usize,
    pub deployments: usize,
}

impl ObjectCounts {
    pub fn collect(store: &Store) -> StoreResult<Self> {
        let task_groups = store.list_cluster_task_groups()?;
        Ok(Self {
            namespaces: store.list_run_as()?.len(),
            applications: store.list_all_applications()?.len(),
            running_task_groups: task_groups
                .iter()
                .filter(|tg| tg.status == TaskStatus::Running)
                .count(),
            task_groups: task_groups.len(),
            agents: store.list_all_agents()?.len(),
            configmaps: store.list_all_configmaps()?.len(),
            secrets: store.list_all_secrets()?.len(),
            services: store.list_all_services()?.len(),
            deployments: store.list_all_deployments()?.len(),
        })
    }
}

pub struct ObjectReporter {
    store: Arc<Store>,
    interval: Duration,
}

impl ObjectReporter {
    pub fn new(store: Arc<Store>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Take one snapshot off the async runtime's worker threads.
    pub async fn snapshot(&self) -> StoreResult<ObjectCounts> {
        let store = Arc::clone(&self.store);
        match tokio::task::spawn_blocking(move || ObjectCounts::collect(&store)).await {
            Ok(result) => result,
            Err(e) => Err(StoreError::Backend(format!("count task failed: {e}"))),
        }
    }

    /// Run the reporting loop until shutdown signal.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            backend = self.store.backend_name(),
            "object reporter started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {
                    match self.snapshot().await {
                        Ok(counts) => {
                            info!(
                                namespaces = counts.namespaces,
                                applications = counts.applications,
                                task_groups = counts.task_groups,
                                running_task_groups = counts.running_task_groups,
                                agents = counts.agents,
                                configmaps = counts.configmaps,
                                secrets = counts.secrets,
                                services = counts.services,
                                deployments = counts.deployments,
                                "object counts"
                            );
                            debug!(
                                backend = self.store.backend_name(),
                                calls = self.store.stats().total_calls(),
                                "driver stats"
                            );
                        }
                        Err(e) => warn!(error = %e, "object count failed"),
                    }
                }
                _ = shutdown.changed() => {
                    info!("object reporter shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TreeConfig;
    use crate::tree::RedbTree;
    use crate::types::{Agent, ConfigMap, ObjectMeta};

    fn store() -> Arc<Store> {
        let store = Store::tree(
            Arc::new(RedbTree::open_in_memory().unwrap()),
            &TreeConfig::default(),
        );
        store.init_cache_mgr(true).unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn snapshot_counts_objects() {
        let store = store();
        store
            .save_agent(&Agent {
                key: "10.0.0.1".into(),
                last_sync_time: 1,
                agent_info: "{}".into(),
            })
            .unwrap();
        store
            .save_configmap(&ConfigMap {
                meta: ObjectMeta::new("ns1", "cm1"),
                data: Default::default(),
            })
            .unwrap();

        let reporter = ObjectReporter::new(store, Duration::from_secs(60));
        let counts = reporter.snapshot().await.unwrap();
        assert_eq!(counts.agents, 1);
        assert_eq!(counts.configmaps, 1);
        assert_eq!(counts.applications, 0);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let reporter = ObjectReporter::new(store(), Duration::from_millis(10));
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { reporter.run(rx).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("reporter drains after shutdown")
            .unwrap();
    }

    #[tokio::test]
    async fn snapshot_before_init_fails() {
        let store = Store::tree(
            Arc::new(RedbTree::open_in_memory().unwrap()),
            &TreeConfig::default(),
        );
        let reporter = ObjectReporter::new(Arc::new(store), Duration::from_secs(60));
        assert!(reporter.snapshot().await.is_err());
    }
}

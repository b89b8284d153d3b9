//! sched-migrate — one-shot copy of every durable scheduler object from the
//! coordination tree to the API server.
//!
//! The run is sequential and fail-fast; see [`migrator`] for the phase order.
//! Re-running over a partially migrated target is safe because every write
//! is an upsert.

pub mod config;
pub mod error;
pub mod migrator;

use std::path::Path;
use std::sync::Arc;

use sched_store::api::RedbApiServer;
use sched_store::config::TreeConfig;
use sched_store::tree::RedbTree;
use sched_store::{Store, StoreError};
use tracing::info;

pub use config::MigrateConfig;
pub use error::{MigrateError, MigrateResult};
pub use migrator::{MigrationReport, Migrator};

/// Open both ends of a migration: `(legacy, target)`, both uncached.
///
/// A legacy address must already exist; an empty tree is never created on
/// the migration source.
pub fn connect(config: &MigrateConfig) -> MigrateResult<(Store, Store)> {
    config.validate()?;

    let addresses = config.legacy.addresses.join(",");
    let existing: Vec<&String> = config
        .legacy
        .addresses
        .iter()
        .filter(|addr| Path::new(addr.as_str()).exists())
        .collect();
    if existing.is_empty() {
        return Err(MigrateError::Connect {
            endpoint: addresses,
            source: StoreError::NotFound("no legacy tree at any address".into()),
        });
    }
    let tree = RedbTree::connect(&existing).map_err(|source| MigrateError::Connect {
        endpoint: addresses.clone(),
        source,
    })?;
    let legacy = Store::tree(
        Arc::new(tree),
        &TreeConfig {
            root: config.legacy.root.clone(),
        },
    );
    legacy
        .init_cache_mgr(false)
        .map_err(|source| MigrateError::Connect {
            endpoint: addresses.clone(),
            source,
        })?;

    let path = config
        .target
        .path
        .as_deref()
        .ok_or_else(|| MigrateError::Config("no target given".into()))?;
    let endpoint = path.display().to_string();
    let server = RedbApiServer::open(path).map_err(|source| MigrateError::Connect {
        endpoint: endpoint.clone(),
        source,
    })?;
    let target = Store::api(Arc::new(server), &config.target.api);
    target
        .init_cache_mgr(false)
        .map_err(|source| MigrateError::Connect {
            endpoint: endpoint.clone(),
            source,
        })?;

    info!(legacy = %addresses, target = %endpoint, "stores connected");
    Ok((legacy, target))
}

/// Connect and run a full migration.
pub fn migrate(config: &MigrateConfig) -> MigrateResult<MigrationReport> {
    let (legacy, target) = connect(config)?;
    Migrator::new(&legacy, &target).run()
}

//! Error types for the migration utility.

use sched_store::{Kind, StoreError};
use thiserror::Error;

pub type MigrateResult<T> = Result<T, MigrateError>;

/// A failure that aborts the whole migration run. Every variant names the
/// object it happened on.
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("{kind} {id}: {source}")]
    Store {
        kind: Kind,
        id: String,
        #[source]
        source: StoreError,
    },

    /// The object read back from the target differs from the legacy copy.
    #[error("{kind} {id}: read-back from target does not match legacy object")]
    Mismatch { kind: Kind, id: String },

    #[error("cannot open {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: StoreError,
    },

    #[error("config error: {0}")]
    Config(String),
}

impl MigrateError {
    /// Closure wrapping a store error with the object it concerns.
    pub(crate) fn store(kind: Kind, id: &str) -> impl FnOnce(StoreError) -> Self + '_ {
        move |source| MigrateError::Store {
            kind,
            id: id.to_string(),
            source,
        }
    }
}

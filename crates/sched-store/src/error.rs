//! Error types for the scheduler object store.

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested object does not exist. Callers routinely branch on this.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// An update carried a stale resource version.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Transient failure in the underlying coordination service or API server.
    #[error("backend error: {0}")]
    Backend(String),

    #[error("malformed id {id:?}: expected {expected} fields, found {found}")]
    MalformedId {
        id: String,
        expected: usize,
        found: usize,
    },

    /// A key segment cannot be mapped onto the backend's naming rules.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    /// Tree delete of a node that still has children.
    #[error("node not empty: {0}")]
    NotEmpty(String),

    #[error("cache manager not initialized")]
    CacheNotInitialized,

    #[error("config error: {0}")]
    Config(String),
}

impl StoreError {
    /// Whether this is the distinguished not-found sentinel.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists(_))
    }
}

/// Convert any `Display` error into a `StoreError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| $crate::error::StoreError::$variant(e.to_string())
    };
}

pub(crate) use map_err;

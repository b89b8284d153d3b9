//! Hierarchical-tree backend.
//!
//! A coordination service exposing a tree of nodes, each holding an opaque
//! value. [`TreeClient`] is the wire seam, [`TreeDriver`] adds timing and the
//! forgiving delete/list semantics, and [`TreeBackend`] lays entity kinds out
//! as paths under a fixed root.

mod backend;
mod driver;
mod embedded;

pub use self::backend::TreeBackend;
pub use self::driver::TreeDriver;
pub use self::embedded::RedbTree;

use crate::error::StoreResult;

/// Primitive operations of a hierarchical coordination service.
///
/// Paths are absolute, `/`-separated and never end with `/`.
pub trait TreeClient: Send + Sync {
    /// Set the value at `path`, creating missing ancestors with empty values.
    fn set(&self, path: &str, data: &[u8]) -> StoreResult<()>;

    /// Read the value at `path`.
    fn get(&self, path: &str) -> StoreResult<Vec<u8>>;

    fn exists(&self, path: &str) -> StoreResult<bool>;

    /// Delete a leaf node. Fails with `NotFound` if absent and `NotEmpty` if
    /// the node still has children.
    fn delete(&self, path: &str) -> StoreResult<()>;

    /// Names of the direct children of `path`, sorted. `NotFound` if absent.
    fn children(&self, path: &str) -> StoreResult<Vec<String>>;
}

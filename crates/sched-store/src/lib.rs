//! sched-store — the persistence layer of a Mesos-style cluster scheduler.
//!
//! One object-store contract over two structurally different backends: a
//! hierarchical coordination tree and a Kubernetes-style API server. Both are
//! reached through client traits ([`tree::TreeClient`], [`api::ApiClient`])
//! and ship with embedded [redb](https://docs.rs/redb) implementations.
//!
//! # Architecture
//!
//! ```text
//! Store ──► Cache (write-through, optional)
//!   │   └─► LockPool × 3 (application, deployment, command)
//!   ▼
//! EntityStore ──► dyn Backend ──► TreeBackend ──► TreeDriver ──► TreeClient
//!                             └─► ApiBackend  ──► ApiDriver  ──► ApiClient
//! ```
//!
//! [`Store`] is `Send + Sync` and is shared across scheduler threads behind an
//! `Arc`.

pub mod api;
pub mod backend;
pub mod cache;
pub mod config;
pub mod entity;
pub mod error;
pub mod ids;
pub mod kind;
pub mod lock;
pub mod report;
pub mod stats;
pub mod store;
pub mod tree;
pub mod types;

pub use backend::Backend;
pub use config::{ApiConfig, StoreConfig, TreeConfig};
pub use entity::EntityStore;
pub use error::{StoreError, StoreResult};
pub use kind::{Entity, FrameworkId, Kind, ObjectKey, Scope, TaskGroupRecord};
pub use lock::{LockPool, PoolGuard};
pub use report::{ObjectCounts, ObjectReporter};
pub use stats::StatsSnapshot;
pub use store::Store;
pub use types::*;

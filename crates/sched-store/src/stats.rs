//! Per-primitive call accounting for backend drivers.
//!
//! Every driver primitive is timed and counted. Counters are plain atomics so
//! recording never contends with concurrent callers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Driver primitives that are timed and counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Set,
    Get,
    Exists,
    Delete,
    Children,
    Create,
    Update,
    List,
}

impl Primitive {
    pub const ALL: [Primitive; 8] = [
        Primitive::Set,
        Primitive::Get,
        Primitive::Exists,
        Primitive::Delete,
        Primitive::Children,
        Primitive::Create,
        Primitive::Update,
        Primitive::List,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Primitive::Set => "set",
            Primitive::Get => "get",
            Primitive::Exists => "exists",
            Primitive::Delete => "delete",
            Primitive::Children => "children",
            Primitive::Create => "create",
            Primitive::Update => "update",
            Primitive::List => "list",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Default)]
struct Counter {
    calls: AtomicU64,
    errors: AtomicU64,
    micros: AtomicU64,
}

/// Call counters for one driver instance.
#[derive(Default)]
pub struct DriverStats {
    counters: [Counter; 8],
}

/// Point-in-time counters for a single primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimitiveStats {
    pub primitive: &'static str,
    pub calls: u64,
    pub errors: u64,
    pub total_micros: u64,
}

/// Point-in-time counters for a driver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub backend: &'static str,
    pub primitives: Vec<PrimitiveStats>,
}

impl StatsSnapshot {
    pub fn calls(&self, primitive: Primitive) -> u64 {
        self.primitives
            .iter()
            .find(|p| p.primitive == primitive.as_str())
            .map(|p| p.calls)
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> u64 {
        self.primitives.iter().map(|p| p.calls).sum()
    }
}

impl DriverStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, primitive: Primitive, elapsed: Duration, ok: bool) {
        let c = &self.counters[primitive.index()];
        c.calls.fetch_add(1, Ordering::Relaxed);
        c.micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
        if !ok {
            c.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self, backend: &'static str) -> StatsSnapshot {
        let primitives = Primitive::ALL
            .iter()
            .map(|p| {
                let c = &self.counters[p.index()];
                PrimitiveStats {
                    primitive: p.as_str(),
                    calls: c.calls.load(Ordering::Relaxed),
                    errors: c.errors.load(Ordering::Relaxed),
                    total_micros: c.micros.load(Ordering::Relaxed),
                }
            })
            .collect();
        StatsSnapshot {
            backend,
            primitives,
        }
    }
}

// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Per-run serialization.
//!
//! The sweep and the per-run admin actions may target the same run at the
//! same time. Every reconciliation or override holds the run's lock for its
//! whole read, fetch, decide and write sequence, so at most one writer
//! touches a run at once.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Held while a run is being reconciled or overridden.
pub type RunLockGuard = OwnedMutexGuard<()>;

/// Registry of per-run async locks.
#[derive(Clone, Default)]
pub struct RunLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl RunLocks {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, run_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(run_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Wait for the lock on `run_id`.
    pub async fn lock(&self, run_id: &str) -> RunLockGuard {
        self.slot(run_id).lock_owned().await
    }

    /// Take the lock on `run_id` if nobody holds it.
    pub fn try_lock(&self, run_id: &str) -> Option<RunLockGuard> {
        self.slot(run_id).try_lock_owned().ok()
    }

    /// Drop entries nobody holds or waits for.
    pub fn prune(&self) {
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    /// Number of tracked runs.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// True if no run is tracked.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

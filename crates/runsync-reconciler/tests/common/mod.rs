// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use runsync_reconciler::clock::ManualClock;
use runsync_reconciler::engine::MockEngine;
use runsync_reconciler::persistence::{RunCursor, RunStore, SqliteRunStore, StatusUpdate};
use runsync_reconciler::{Error, Reconciler, ReconcilerConfig, Result, RunStatus, WorkflowRun};

pub const SIX_HOURS: Duration = Duration::from_secs(6 * 3600);

/// Fixed "now" for every test.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

/// A running run last updated `age` before [`now`].
pub fn running(run_id: &str, handle: Option<&str>, age: chrono::Duration) -> WorkflowRun {
    let at = now() - age;
    let mut run = WorkflowRun::new(run_id, format!("story-{run_id}"), at - chrono::Duration::minutes(1));
    run.updated_at = at;
    run.execution_handle = handle.map(str::to_string);
    run.with_status(RunStatus::Running)
}

/// Run store that counts writes and can be told to fail some of them.
pub struct TestStore {
    inner: SqliteRunStore,
    writes: AtomicUsize,
    failing_writes: std::sync::Mutex<HashSet<String>>,
}

impl TestStore {
    pub async fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: SqliteRunStore::connect("sqlite::memory:")
                .await
                .expect("Failed to create in-memory SQLite store"),
            writes: AtomicUsize::new(0),
            failing_writes: std::sync::Mutex::new(HashSet::new()),
        })
    }

    pub fn fail_writes_for(&self, run_id: &str) {
        self.failing_writes
            .lock()
            .unwrap()
            .insert(run_id.to_string());
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn seed(&self, runs: &[WorkflowRun]) {
        for run in runs {
            self.inner.insert_run(run).await.expect("Failed to seed run");
        }
    }

    pub async fn load(&self, run_id: &str) -> WorkflowRun {
        self.inner
            .get_run(run_id)
            .await
            .expect("Failed to load run")
            .expect("Run should exist")
    }
}

#[async_trait]
impl RunStore for TestStore {
    fn backend(&self) -> &'static str {
        "test"
    }

    async fn insert_run(&self, run: &WorkflowRun) -> Result<()> {
        self.inner.insert_run(run).await
    }

    async fn get_run(&self, run_id: &str) -> Result<Option<WorkflowRun>> {
        self.inner.get_run(run_id).await
    }

    async fn list_runs_by_status(
        &self,
        status: RunStatus,
        after: Option<&RunCursor>,
        limit: i64,
    ) -> Result<Vec<WorkflowRun>> {
        self.inner.list_runs_by_status(status, after, limit).await
    }

    async fn update_run_status(&self, update: &StatusUpdate) -> Result<Option<WorkflowRun>> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.failing_writes.lock().unwrap().contains(&update.run_id) {
            return Err(Error::Other(format!(
                "simulated write failure for {}",
                update.run_id
            )));
        }
        self.inner.update_run_status(update).await
    }
}

/// Everything a reconciler test needs.
pub struct Harness {
    pub store: Arc<TestStore>,
    pub engine: Arc<MockEngine>,
    pub clock: Arc<ManualClock>,
    pub reconciler: Arc<Reconciler>,
}

impl Harness {
    pub async fn new(engine: MockEngine) -> Self {
        Self::with_config(engine, test_config()).await
    }

    pub async fn with_config(engine: MockEngine, config: ReconcilerConfig) -> Self {
        let store = TestStore::new().await;
        let engine = Arc::new(engine);
        let clock = Arc::new(ManualClock::new(now()));
        let reconciler = Arc::new(Reconciler::new(
            store.clone(),
            engine.clone(),
            clock.clone(),
            config,
        ));

        Self {
            store,
            engine,
            clock,
            reconciler,
        }
    }
}

/// Six hour threshold and a short fetch timeout.
pub fn test_config() -> ReconcilerConfig {
    ReconcilerConfig {
        stale_threshold: SIX_HOURS,
        fetch_timeout: Duration::from_millis(200),
        ..Default::default()
    }
}

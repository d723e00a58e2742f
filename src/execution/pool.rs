//! # Execution Pools
//!
//! Named pools that run async work with a bounded number of worker slots and
//! count everything still outstanding so shutdown can wait for quiescence.
//!
//! Submission never blocks: the task is spawned immediately and waits for a
//! worker slot inside the runtime. Work that only waits on other pool work
//! (continuations, the listener loop) is tracked without taking a slot, so a
//! saturated pool can never deadlock on its own continuations.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::ExecutionConfig;

/// A named, bounded execution pool
#[derive(Debug, Clone)]
pub struct ExecutionPool {
    inner: Arc<PoolInner>,
}

#[derive(Debug)]
struct PoolInner {
    label: String,
    max_workers: usize,
    slots: Arc<Semaphore>,
    outstanding: AtomicUsize,
    idle: Notify,
}

/// Decrements the outstanding count even if the task panics
struct OutstandingGuard {
    inner: Arc<PoolInner>,
}

impl Drop for OutstandingGuard {
    fn drop(&mut self) {
        if self.inner.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

impl ExecutionPool {
    pub fn new(label: impl Into<String>, max_workers: usize) -> Self {
        let label = label.into();
        let max_workers = max_workers.max(1);
        info!(
            "🏊 POOL: Creating execution pool {} with {} workers",
            label, max_workers
        );
        Self {
            inner: Arc::new(PoolInner {
                label,
                max_workers,
                slots: Arc::new(Semaphore::new(max_workers)),
                outstanding: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        }
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn max_workers(&self) -> usize {
        self.inner.max_workers
    }

    /// Submitted work that has not finished yet, queued or running
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::Acquire)
    }

    fn track(&self) -> OutstandingGuard {
        self.inner.outstanding.fetch_add(1, Ordering::AcqRel);
        OutstandingGuard {
            inner: self.inner.clone(),
        }
    }

    /// Run `work` on one of the pool's worker slots
    pub fn submit<F>(&self, work: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let guard = self.track();
        let slots = self.inner.slots.clone();
        let label = self.inner.label.clone();
        tokio::spawn(async move {
            let _guard = guard;
            // The semaphore is never closed, so acquisition only fails if
            // the pool itself is being torn down; run unthrottled then.
            let _permit = slots.acquire_owned().await.ok();
            debug!("⚙️ POOL: {} worker slot acquired", label);
            work.await
        })
    }

    /// Run `work` as tracked pool work without occupying a worker slot.
    ///
    /// For tasks that spend their life waiting on other submitted work.
    pub fn spawn_dependent<F>(&self, work: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let guard = self.track();
        tokio::spawn(async move {
            let _guard = guard;
            work.await
        })
    }

    /// Wait until no submitted work is outstanding
    pub async fn wait_for_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent last completion is not missed
            notified.as_mut().enable();
            if self.outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// The two pools the method server schedules on
#[derive(Debug, Clone)]
pub struct ExecutionPools {
    /// Out-of-process simulation jobs
    pub external: ExecutionPool,
    /// In-process continuations: artifact parsing and result publishing
    pub local: ExecutionPool,
}

impl ExecutionPools {
    pub fn from_config(config: &ExecutionConfig) -> Self {
        Self {
            external: ExecutionPool::new(
                config.external_pool.label.clone(),
                config.external_workers(),
            ),
            local: ExecutionPool::new(config.local_pool.label.clone(), config.local_pool.max_workers),
        }
    }

    /// Wait for the external pool, then the local pool, to go idle
    pub async fn wait_for_current_tasks(&self) {
        self.external.wait_for_idle().await;
        self.local.wait_for_idle().await;
    }
}

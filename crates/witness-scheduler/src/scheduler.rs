// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-interval driver for scheduled jobs.
//!
//! One tokio task per job. Ticks of the same job never overlap within a
//! process; across processes the job lock serializes them.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use witness_core::LockClient;

use crate::job::{ScheduledJob, TickOutcome, run_locked};

/// Owns the recurring tasks.
pub struct Scheduler {
    lock: Arc<dyn LockClient>,
    jobs: Vec<Arc<dyn ScheduledJob>>,
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(lock: Arc<dyn LockClient>) -> Self {
        Self::with_cancel(lock, CancellationToken::new())
    }

    /// Stops when `cancel` fires, e.g. from a signal handler.
    pub fn with_cancel(lock: Arc<dyn LockClient>, cancel: CancellationToken) -> Self {
        Self {
            lock,
            jobs: Vec::new(),
            cancel,
            handles: Vec::new(),
        }
    }

    pub fn add(&mut self, job: Arc<dyn ScheduledJob>) {
        self.jobs.push(job);
    }

    pub fn job_names(&self) -> Vec<String> {
        self.jobs.iter().map(|j| j.name().to_string()).collect()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.handles.is_empty()
    }

    /// Spawns one task per job. The first tick of each fires immediately.
    pub fn start(&mut self) {
        if self.is_running() {
            warn!("scheduler already started");
            return;
        }
        for job in &self.jobs {
            let job = Arc::clone(job);
            let lock = Arc::clone(&self.lock);
            let cancel = self.cancel.clone();
            info!(job = job.name(), interval = ?job.interval(), "scheduling job");
            self.handles
                .push(tokio::spawn(drive(job, lock, cancel)));
        }
    }

    /// Cancels every task and waits for them. A tick in progress finishes
    /// its body first.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "scheduled task ended abnormally");
            }
        }
        info!("scheduler stopped");
    }

    /// Blocks until the cancel token fires, then stops.
    pub async fn run_until_cancelled(&mut self) {
        self.start();
        self.cancel.cancelled().await;
        self.stop().await;
    }
}

async fn drive(job: Arc<dyn ScheduledJob>, lock: Arc<dyn LockClient>, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(job.interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(job = job.name(), "job loop cancelled");
                break;
            }
            _ = interval.tick() => {
                let outcome = run_locked(lock.as_ref(), job.as_ref()).await;
                match &outcome {
                    TickOutcome::Completed => debug!(job = job.name(), "tick completed"),
                    TickOutcome::Skipped => debug!(job = job.name(), "tick skipped"),
                    TickOutcome::Failed(reason) => {
                        debug!(job = job.name(), reason = %reason, "tick failed, waiting for next tick");
                    }
                }
            }
        }
    }
}

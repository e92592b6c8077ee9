// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduled jobs and the lock-guarded tick.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{debug, info, warn};
use witness_core::{LockClient, WitnessError};

/// A recurring unit of work serialized fleet-wide by a named lock.
#[async_trait]
pub trait ScheduledJob: Send + Sync + 'static {
    /// Job name used in logs.
    fn name(&self) -> &str;

    /// Lock guarding the job. Defaults to the job name.
    fn lock_name(&self) -> &str {
        self.name()
    }

    /// Lease length; bounds how long a crashed holder blocks the job.
    fn lock_ttl(&self) -> Duration;

    /// Time between ticks.
    fn interval(&self) -> Duration;

    /// The job body.
    async fn run(&self) -> Result<(), WitnessError>;
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Completed,
    /// Another holder had the lock; the body did not run.
    Skipped,
    /// The lock could not be consulted or the body failed.
    Failed(String),
}

/// Runs one tick of `job`: acquire, run, release.
///
/// The lock is released whether the body succeeds, fails or panics. A
/// release failure is logged and left to the lease expiry.
pub async fn run_locked(lock: &dyn LockClient, job: &dyn ScheduledJob) -> TickOutcome {
    let lock_name = job.lock_name();
    match lock.acquire(lock_name, job.lock_ttl()).await {
        Ok(true) => info!(lock = lock_name, holder = lock.holder_id(), "lock acquired"),
        Ok(false) => {
            info!(lock = lock_name, "lock in use, tick skipped");
            return TickOutcome::Skipped;
        }
        Err(e) => {
            warn!(lock = lock_name, error = %e, "lock unavailable, tick failed");
            return TickOutcome::Failed(e.to_string());
        }
    }

    let result = AssertUnwindSafe(job.run()).catch_unwind().await;

    match lock.release(lock_name).await {
        Ok(()) => info!(lock = lock_name, "lock released"),
        Err(e) => warn!(lock = lock_name, error = %e, "lock release failed, lease will expire"),
    }

    match result {
        Ok(Ok(())) => {
            debug!(job = job.name(), "tick completed");
            TickOutcome::Completed
        }
        Ok(Err(e)) => {
            warn!(job = job.name(), error = %e, "job failed");
            TickOutcome::Failed(e.to_string())
        }
        Err(_) => {
            warn!(job = job.name(), "job panicked");
            TickOutcome::Failed(format!("job `{}` panicked", job.name()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tracing_test::traced_test;
    use witness_test_utils::InMemoryLockClient;

    use super::*;

    #[derive(Default)]
    struct SampleJob {
        runs: AtomicUsize,
        fail: bool,
        panic: bool,
    }

    #[async_trait]
    impl ScheduledJob for SampleJob {
        fn name(&self) -> &str {
            "sample"
        }

        fn lock_ttl(&self) -> Duration {
            Duration::from_secs(60)
        }

        fn interval(&self) -> Duration {
            Duration::from_secs(1)
        }

        async fn run(&self) -> Result<(), WitnessError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.panic {
                panic!("sample panic");
            }
            if self.fail {
                return Err(WitnessError::Internal("sample failure".into()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn completed_tick_releases_lock() {
        let lock = InMemoryLockClient::new("a");
        let job = SampleJob::default();
        assert_eq!(run_locked(&lock, &job).await, TickOutcome::Completed);
        assert_eq!(job.runs.load(Ordering::SeqCst), 1);
        assert_eq!(lock.holder("sample").await.unwrap(), None);
    }

    #[tokio::test]
    async fn held_lock_skips_without_running() {
        let holder = InMemoryLockClient::new("a");
        let other = InMemoryLockClient::with_table(holder.table(), "b");
        holder.acquire("sample", Duration::from_secs(60)).await.unwrap();

        let job = SampleJob::default();
        assert_eq!(run_locked(&other, &job).await, TickOutcome::Skipped);
        assert_eq!(job.runs.load(Ordering::SeqCst), 0);
        assert_eq!(other.release_calls(), 0);
        assert_eq!(holder.holder("sample").await.unwrap().as_deref(), Some("a"));
    }

    #[tokio::test]
    #[traced_test]
    async fn skip_and_failure_are_logged() {
        let holder = InMemoryLockClient::new("a");
        let other = InMemoryLockClient::with_table(holder.table(), "b");
        holder.acquire("sample", Duration::from_secs(60)).await.unwrap();
        run_locked(&other, &SampleJob::default()).await;
        assert!(logs_contain("lock in use, tick skipped"));

        holder.release("sample").await.unwrap();
        let failing = SampleJob {
            fail: true,
            ..SampleJob::default()
        };
        run_locked(&holder, &failing).await;
        assert!(logs_contain("job failed"));
        assert!(logs_contain("lock released"));
    }

    #[tokio::test]
    async fn failing_body_still_releases() {
        let lock = InMemoryLockClient::new("a");
        let job = SampleJob {
            fail: true,
            ..SampleJob::default()
        };
        assert!(matches!(run_locked(&lock, &job).await, TickOutcome::Failed(_)));
        assert_eq!(lock.holder("sample").await.unwrap(), None);
    }

    #[tokio::test]
    async fn panicking_body_still_releases() {
        let lock = InMemoryLockClient::new("a");
        let job = SampleJob {
            panic: true,
            ..SampleJob::default()
        };
        assert!(matches!(run_locked(&lock, &job).await, TickOutcome::Failed(_)));
        assert_eq!(lock.release_calls(), 1);
        assert_eq!(lock.holder("sample").await.unwrap(), None);
    }

    #[tokio::test]
    async fn unavailable_lock_fails_tick() {
        let lock = InMemoryLockClient::new("a");
        lock.set_unavailable(true);
        let job = SampleJob::default();
        assert!(matches!(run_locked(&lock, &job).await, TickOutcome::Failed(_)));
        assert_eq!(job.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn racing_instances_run_body_once() {
        struct Slow(AtomicUsize);

        #[async_trait]
        impl ScheduledJob for Slow {
            fn name(&self) -> &str {
                "slow"
            }
            fn lock_ttl(&self) -> Duration {
                Duration::from_secs(60)
            }
            fn interval(&self) -> Duration {
                Duration::from_secs(1)
            }
            async fn run(&self) -> Result<(), WitnessError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(())
            }
        }

        let a = InMemoryLockClient::new("a");
        let b = InMemoryLockClient::with_table(a.table(), "b");
        let job = Arc::new(Slow(AtomicUsize::new(0)));
        let (ra, rb) = tokio::join!(run_locked(&a, job.as_ref()), run_locked(&b, job.as_ref()));

        let outcomes = [ra, rb];
        assert_eq!(outcomes.iter().filter(|o| **o == TickOutcome::Completed).count(), 1);
        assert_eq!(outcomes.iter().filter(|o| **o == TickOutcome::Skipped).count(), 1);
        assert_eq!(job.0.load(Ordering::SeqCst), 1);
    }
}

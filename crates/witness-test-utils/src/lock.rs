// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory lock client.
//!
//! Several clients may share one [`LockTable`] to play a fleet of instances
//! inside a single test process. There is no cross-process coordination.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use witness_core::{AdapterType, HealthStatus, LockClient, PluginAdapter, WitnessError};

/// One holder's claim on a name.
#[derive(Debug, Clone)]
pub struct Lease {
    holder: String,
    expires_at: DateTime<Utc>,
}

/// Lease table shared between clients.
pub type LockTable = Arc<RwLock<HashMap<String, Lease>>>;

fn poison_err<T>(_: PoisonError<T>) -> WitnessError {
    WitnessError::Internal("lock table poisoned".to_string())
}

/// A [`LockClient`] over an in-process lease table.
#[derive(Debug)]
pub struct InMemoryLockClient {
    table: LockTable,
    holder_id: String,
    unavailable: AtomicBool,
    acquire_calls: AtomicUsize,
    release_calls: AtomicUsize,
}

impl InMemoryLockClient {
    /// A client with its own table.
    pub fn new(holder_id: impl Into<String>) -> Self {
        Self::with_table(Arc::new(RwLock::new(HashMap::new())), holder_id)
    }

    /// A client competing over `table` with any other client using it.
    pub fn with_table(table: LockTable, holder_id: impl Into<String>) -> Self {
        Self {
            table,
            holder_id: holder_id.into(),
            unavailable: AtomicBool::new(false),
            acquire_calls: AtomicUsize::new(0),
            release_calls: AtomicUsize::new(0),
        }
    }

    /// The table behind this client, to hand to another client.
    pub fn table(&self) -> LockTable {
        Arc::clone(&self.table)
    }

    /// Makes every call fail as if the lock service were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn acquire_calls(&self) -> usize {
        self.acquire_calls.load(Ordering::SeqCst)
    }

    pub fn release_calls(&self) -> usize {
        self.release_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), WitnessError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(WitnessError::Storage {
                source: "lock service unreachable".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for InMemoryLockClient {
    fn name(&self) -> &str {
        "in-memory-lock"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Lock
    }

    async fn health_check(&self) -> Result<HealthStatus, WitnessError> {
        match self.check_available() {
            Ok(()) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), WitnessError> {
        Ok(())
    }
}

#[async_trait]
impl LockClient for InMemoryLockClient {
    fn holder_id(&self) -> &str {
        &self.holder_id
    }

    async fn acquire(&self, name: &str, ttl: Duration) -> Result<bool, WitnessError> {
        self.acquire_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let now = Utc::now();
        let mut leases = self.table.write().map_err(poison_err)?;

        if let Some(lease) = leases.get(name)
            && lease.expires_at > now
            && lease.holder != self.holder_id
        {
            return Ok(false);
        }
        leases.insert(
            name.to_string(),
            Lease {
                holder: self.holder_id.clone(),
                expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
            },
        );
        Ok(true)
    }

    async fn release(&self, name: &str) -> Result<(), WitnessError> {
        self.release_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let mut leases = self.table.write().map_err(poison_err)?;
        if leases.get(name).is_some_and(|l| l.holder == self.holder_id) {
            leases.remove(name);
        }
        Ok(())
    }

    async fn holder(&self, name: &str) -> Result<Option<String>, WitnessError> {
        self.check_available()?;
        let leases = self.table.read().map_err(poison_err)?;
        let now = Utc::now();
        Ok(leases
            .get(name)
            .filter(|l| l.expires_at > now)
            .map(|l| l.holder.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shared_table_allows_one_holder() {
        let a = InMemoryLockClient::new("a");
        let b = InMemoryLockClient::with_table(a.table(), "b");

        assert!(a.acquire("advance_all", Duration::from_secs(30)).await.unwrap());
        assert!(!b.acquire("advance_all", Duration::from_secs(30)).await.unwrap());
        assert!(a.acquire("advance_all", Duration::from_secs(30)).await.unwrap());

        b.release("advance_all").await.unwrap();
        assert_eq!(b.holder("advance_all").await.unwrap().as_deref(), Some("a"));

        a.release("advance_all").await.unwrap();
        assert!(b.acquire("advance_all", Duration::from_secs(30)).await.unwrap());
    }

    #[tokio::test]
    async fn lease_expires_after_ttl() {
        let a = InMemoryLockClient::new("a");
        let b = InMemoryLockClient::with_table(a.table(), "b");
        assert!(a.acquire("db_update", Duration::from_millis(50)).await.unwrap());
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(a.holder("db_update").await.unwrap().is_none());
        assert!(b.acquire("db_update", Duration::from_millis(50)).await.unwrap());
    }

    #[tokio::test]
    async fn unavailable_client_errors() {
        let a = InMemoryLockClient::new("a");
        a.set_unavailable(true);
        assert!(a.acquire("x", Duration::from_secs(1)).await.is_err());
        assert_eq!(a.acquire_calls(), 1);
    }
}

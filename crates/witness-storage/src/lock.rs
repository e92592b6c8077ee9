// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`LockClient`] backed by the `job_locks` table.
//!
//! Every instance pointed at the same database file competes for the same
//! rows, which makes this the cluster lock for single-host fleets.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};
use witness_core::{AdapterType, HealthStatus, LockClient, PluginAdapter, WitnessError};

use crate::database::Database;
use crate::queries;

/// SQLite lock client.
pub struct SqliteLockClient {
    db: Database,
    holder_id: String,
}

impl SqliteLockClient {
    /// A client for `db` identifying itself as `holder_id`.
    pub fn new(db: Database, holder_id: impl Into<String>) -> Self {
        Self {
            db,
            holder_id: holder_id.into(),
        }
    }

    /// A client with a random UUID v4 holder id.
    pub fn with_random_holder(db: Database) -> Self {
        Self::new(db, uuid::Uuid::new_v4().to_string())
    }

    /// A client for one process of the named instance.
    ///
    /// The holder id is `{instance_id}-{uuid}`, so two processes sharing a
    /// configured instance id never share a lease.
    pub fn for_instance(db: Database, instance_id: Option<&str>) -> Self {
        let process = uuid::Uuid::new_v4();
        match instance_id {
            Some(id) => Self::new(db, format!("{id}-{process}")),
            None => Self::new(db, process.to_string()),
        }
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[async_trait]
impl PluginAdapter for SqliteLockClient {
    fn name(&self) -> &str {
        "sqlite-lock"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Lock
    }

    async fn health_check(&self) -> Result<HealthStatus, WitnessError> {
        self.db
            .connection()
            .call(|conn| conn.execute_batch("SELECT 1;"))
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WitnessError> {
        Ok(())
    }
}

#[async_trait]
impl LockClient for SqliteLockClient {
    fn holder_id(&self) -> &str {
        &self.holder_id
    }

    async fn acquire(&self, name: &str, ttl: Duration) -> Result<bool, WitnessError> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let acquired =
            queries::locks::try_acquire(&self.db, name, &self.holder_id, now_ms(), ttl_ms).await?;
        if acquired {
            info!(lock = name, holder = %self.holder_id, ttl_ms, "lock acquired");
        } else {
            debug!(lock = name, holder = %self.holder_id, "lock held elsewhere");
        }
        Ok(acquired)
    }

    async fn release(&self, name: &str) -> Result<(), WitnessError> {
        if queries::locks::release(&self.db, name, &self.holder_id).await? {
            info!(lock = name, holder = %self.holder_id, "lock released");
        } else {
            debug!(lock = name, holder = %self.holder_id, "release of unheld lock ignored");
        }
        Ok(())
    }

    async fn holder(&self, name: &str) -> Result<Option<String>, WitnessError> {
        queries::locks::holder(&self.db, name, now_ms()).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::queries::test_support::setup_db;

    #[tokio::test]
    async fn racing_holders_get_one_winner() {
        let (db, _dir) = setup_db().await;
        let clients: Vec<Arc<SqliteLockClient>> = (0..8)
            .map(|i| Arc::new(SqliteLockClient::new(db.clone(), format!("instance-{i}"))))
            .collect();

        let handles: Vec<_> = clients
            .iter()
            .map(|client| {
                let client = Arc::clone(client);
                tokio::spawn(async move {
                    client
                        .acquire("advance_all", Duration::from_secs(30))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn expired_lock_is_acquirable_by_another_holder() {
        let (db, _dir) = setup_db().await;
        let a = SqliteLockClient::new(db.clone(), "a");
        let b = SqliteLockClient::new(db.clone(), "b");

        assert!(a.acquire("db_update", Duration::from_millis(100)).await.unwrap());
        assert!(!b.acquire("db_update", Duration::from_millis(100)).await.unwrap());
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(b.acquire("db_update", Duration::from_millis(100)).await.unwrap());
        assert_eq!(b.holder("db_update").await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn processes_sharing_an_instance_id_exclude_each_other() {
        let (db, dir) = setup_db().await;
        let path = dir.path().join("test.db");
        let other_db = Database::open(path.to_str().unwrap()).await.unwrap();

        let serve = SqliteLockClient::for_instance(db, Some("host-1"));
        let cli = SqliteLockClient::for_instance(other_db, Some("host-1"));
        assert_ne!(serve.holder_id(), cli.holder_id());
        assert!(serve.holder_id().starts_with("host-1-"));

        assert!(serve.acquire("advance_all", Duration::from_secs(900)).await.unwrap());
        assert!(!cli.acquire("advance_all", Duration::from_secs(900)).await.unwrap());

        cli.release("advance_all").await.unwrap();
        assert_eq!(
            cli.holder("advance_all").await.unwrap().as_deref(),
            Some(serve.holder_id())
        );
    }

    #[tokio::test]
    async fn health_check_reports_healthy() {
        let (db, _dir) = setup_db().await;
        let client = SqliteLockClient::with_random_holder(db);
        assert_eq!(client.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn releasing_unheld_lock_is_noop() {
        let (db, _dir) = setup_db().await;
        let a = SqliteLockClient::with_random_holder(db);
        a.release("never-taken").await.unwrap();
        assert!(a.holder("never-taken").await.unwrap().is_none());
    }
}

// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use witness_config::model::StorageConfig;
use witness_core::{
    AdapterType, ApprovalStatus, CandidatePost, Conversation, ConversationNode,
    ConversationState, HealthStatus, InsertOutcome, PluginAdapter, Script, StorageAdapter,
    WitnessError,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// The database is opened by [`StorageAdapter::initialize`]; every other
/// operation fails until then.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, WitnessError> {
        self.db.get().ok_or_else(|| WitnessError::Storage {
            source: "storage not initialized, call initialize() first".into(),
        })
    }

    /// A handle sharing this adapter's connection, e.g. for a
    /// [`SqliteLockClient`](crate::SqliteLockClient).
    pub fn database(&self) -> Result<Database, WitnessError> {
        self.db().cloned()
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, WitnessError> {
        self.db()?
            .connection()
            .call(|conn| conn.execute_batch("SELECT 1;"))
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WitnessError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), WitnessError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| WitnessError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), WitnessError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- Conversations ---

    async fn insert_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<InsertOutcome, WitnessError> {
        queries::conversations::insert_conversation(self.db()?, conversation).await
    }

    async fn get_conversation(
        &self,
        subject_id: &str,
    ) -> Result<Option<Conversation>, WitnessError> {
        queries::conversations::get_conversation(self.db()?, subject_id).await
    }

    async fn update_conversation(&self, conversation: &Conversation) -> Result<(), WitnessError> {
        queries::conversations::update_conversation(self.db()?, conversation).await
    }

    async fn list_conversations(
        &self,
        states: Option<&[ConversationState]>,
    ) -> Result<Vec<Conversation>, WitnessError> {
        queries::conversations::list_conversations(self.db()?, states).await
    }

    // --- Scripts ---

    async fn insert_script(&self, script: &Script) -> Result<InsertOutcome, WitnessError> {
        queries::scripts::insert_script(self.db()?, script).await
    }

    async fn get_script(&self, id: &str) -> Result<Option<Script>, WitnessError> {
        queries::scripts::get_script(self.db()?, id).await
    }

    async fn list_scripts(
        &self,
        node: Option<ConversationNode>,
        active_only: bool,
    ) -> Result<Vec<Script>, WitnessError> {
        queries::scripts::list_scripts(self.db()?, node, active_only).await
    }

    async fn set_script_active(&self, id: &str, active: bool) -> Result<bool, WitnessError> {
        queries::scripts::set_script_active(self.db()?, id, active).await
    }

    async fn increment_script_use(&self, id: &str) -> Result<bool, WitnessError> {
        queries::scripts::increment_use(self.db()?, id).await
    }

    async fn increment_script_positive(&self, id: &str) -> Result<bool, WitnessError> {
        queries::scripts::increment_positive(self.db()?, id).await
    }

    // --- Candidate posts ---

    async fn insert_post(&self, post: &CandidatePost) -> Result<InsertOutcome, WitnessError> {
        queries::posts::insert_post(self.db()?, post).await
    }

    async fn get_post(&self, id: &str) -> Result<Option<CandidatePost>, WitnessError> {
        queries::posts::get_post(self.db()?, id).await
    }

    async fn existing_post_ids(&self, ids: &[String]) -> Result<HashSet<String>, WitnessError> {
        queries::posts::existing_ids(self.db()?, ids).await
    }

    async fn update_post(&self, post: &CandidatePost) -> Result<(), WitnessError> {
        queries::posts::update_post(self.db()?, post).await
    }

    async fn list_posts(
        &self,
        status: Option<ApprovalStatus>,
        limit: Option<i64>,
    ) -> Result<Vec<CandidatePost>, WitnessError> {
        queries::posts::list_posts(self.db()?, status, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn health_check_tracks_initialization() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("health.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert!(storage.health_check().await.is_err());
        storage.initialize().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn operations_fail_before_initialize() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(make_config(
            dir.path().join("early.db").to_str().unwrap(),
        ));
        let err = storage.get_conversation("1").await.unwrap_err();
        assert!(matches!(err, WitnessError::Storage { .. }));
    }

    #[tokio::test]
    async fn shutdown_runs_checkpoint() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("shutdown.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();
        storage.shutdown().await.unwrap();
        storage.close().await.unwrap();
    }
}

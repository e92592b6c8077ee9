// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for integration tests.
//!
//! `TestHarness` assembles temp SQLite storage, every mock collaborator and a
//! configuration. Crates above storage build their engines from these parts.

use std::sync::Arc;

use chrono::Utc;
use witness_config::model::{StorageConfig, WitnessConfig};
use witness_core::types::{RawPost, Ranking};
use witness_core::{
    CandidatePost, ConversationNode, ForceRank, Script, StorageAdapter, WitnessError,
};
use witness_storage::SqliteStorage;

use crate::lock::InMemoryLockClient;
use crate::mock_collaborators::{MockClassifier, MockGeocoder, MockPostSource};
use crate::mock_messaging::MockMessaging;

/// Builder for [`TestHarness`].
pub struct TestHarnessBuilder {
    config: WitnessConfig,
    scripts: Vec<(ConversationNode, String)>,
    posts: Vec<RawPost>,
    holder_id: String,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = WitnessConfig::default();
        config.selector.seed = Some(7);
        config.ingest.seed = Some(7);
        config.conversation.form_base_url = "https://forms.test/edit".to_string();
        Self {
            config,
            scripts: Vec::new(),
            posts: Vec::new(),
            holder_id: "test-instance".to_string(),
        }
    }

    /// Replaces the configuration. The storage section is always overridden.
    pub fn with_config(mut self, config: WitnessConfig) -> Self {
        self.config = config;
        self
    }

    /// Seeds an active script for `node`.
    pub fn with_script(mut self, node: ConversationNode, text: impl Into<String>) -> Self {
        self.scripts.push((node, text.into()));
        self
    }

    /// Seeds one active script for every node.
    pub fn with_default_scripts(self) -> Self {
        self.with_script(ConversationNode::Welcome, "Thanks for sharing. Could we message you?")
            .with_script(
                ConversationNode::Confirmation,
                "Can you provide more information about this incident?",
            )
            .with_script(
                ConversationNode::FormRequest,
                "Please tell us what happened here: {form_link}",
            )
            .with_script(
                ConversationNode::FormReminder,
                "A reminder, the form is still open: {form_link}",
            )
            .with_script(ConversationNode::Closing, "Understood. Thank you for your time.")
    }

    /// Seeds a ranked candidate post.
    pub fn with_post(mut self, post: RawPost) -> Self {
        self.posts.push(post);
        self
    }

    pub fn with_holder_id(mut self, holder_id: impl Into<String>) -> Self {
        self.holder_id = holder_id.into();
        self
    }

    /// Creates the temp database and seeds it.
    pub async fn build(self) -> Result<TestHarness, WitnessError> {
        let temp_dir = tempfile::TempDir::new().map_err(WitnessError::storage)?;
        let db_path = temp_dir.path().join("test.db").to_string_lossy().to_string();

        let mut config = self.config;
        config.storage = StorageConfig {
            database_path: db_path,
            wal_mode: true,
        };

        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        let storage: Arc<dyn StorageAdapter> = Arc::new(storage);

        for (i, (node, text)) in self.scripts.into_iter().enumerate() {
            let script = Script {
                id: format!("{node}-{i}"),
                node,
                text,
                active: true,
                use_count: 0,
                positive_count: 0,
                external_ref: None,
                created_at: Utc::now(),
            };
            storage.insert_script(&script).await?;
        }

        for raw in self.posts {
            let post = CandidatePost::from_raw(
                raw,
                Ranking {
                    label: ForceRank::BluntForce,
                    confidence: 0.9,
                },
                Some("police".to_string()),
            );
            storage.insert_post(&post).await?;
        }

        Ok(TestHarness {
            storage,
            messaging: Arc::new(MockMessaging::new()),
            classifier: Arc::new(MockClassifier::new()),
            geocoder: Arc::new(MockGeocoder::new()),
            source: Arc::new(MockPostSource::new()),
            lock: Arc::new(InMemoryLockClient::new(self.holder_id)),
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock collaborators and temp storage.
pub struct TestHarness {
    /// SQLite storage adapter (temp DB, cleaned up on drop).
    pub storage: Arc<dyn StorageAdapter>,
    pub messaging: Arc<MockMessaging>,
    pub classifier: Arc<MockClassifier>,
    pub geocoder: Arc<MockGeocoder>,
    pub source: Arc<MockPostSource>,
    pub lock: Arc<InMemoryLockClient>,
    pub config: WitnessConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Id of the first seeded script for `node`.
    pub async fn script_id(&self, node: ConversationNode) -> Result<String, WitnessError> {
        self.storage
            .list_scripts(Some(node), false)
            .await?
            .into_iter()
            .next()
            .map(|s| s.id)
            .ok_or(WitnessError::NoActiveScript { node })
    }
}

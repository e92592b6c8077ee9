// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter and lock client against a real database file.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use witness_config::model::StorageConfig;
use witness_core::types::{RawPost, Ranking};
use witness_core::{
    CandidatePost, Conversation, ConversationNode, ConversationState, ForceRank, InsertOutcome,
    LockClient, Script, StorageAdapter,
};
use witness_storage::{Database, SqliteLockClient, SqliteStorage};

async fn storage(dir: &tempfile::TempDir) -> SqliteStorage {
    let storage = SqliteStorage::new(StorageConfig {
        database_path: dir.path().join("witness.db").display().to_string(),
        wal_mode: true,
    });
    storage.initialize().await.unwrap();
    storage
}

#[tokio::test]
async fn conversation_lifecycle_through_adapter() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage(&dir).await;

    let post = CandidatePost::from_raw(
        RawPost {
            id: "1399".to_string(),
            author: "witness_account".to_string(),
            text: "police fired tear gas at protesters".to_string(),
            posted_at: Some(Utc::now()),
        },
        Ranking {
            label: ForceRank::ChemicalElectric,
            confidence: 0.91,
        },
        Some("tear gas".to_string()),
    );
    assert_eq!(storage.insert_post(&post).await.unwrap(), InsertOutcome::Inserted);

    let mut conversation = Conversation::for_post(&post);
    storage.insert_conversation(&conversation).await.unwrap();
    conversation.state = ConversationState::Contacted;
    storage.update_conversation(&conversation).await.unwrap();

    let open = storage
        .list_conversations(Some(&[ConversationState::Contacted]))
        .await
        .unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].recipient, "witness_account");

    let script = Script {
        id: "welcome-1".to_string(),
        node: ConversationNode::Welcome,
        text: "We'd like to hear more.".to_string(),
        active: true,
        use_count: 0,
        positive_count: 0,
        external_ref: Some("1402".to_string()),
        created_at: Utc::now(),
    };
    storage.insert_script(&script).await.unwrap();
    storage.increment_script_use("welcome-1").await.unwrap();
    let stored = storage.get_script("welcome-1").await.unwrap().unwrap();
    assert_eq!(stored.use_count, 1);
    assert_eq!(stored.external_ref.as_deref(), Some("1402"));

    storage.close().await.unwrap();
}

#[tokio::test]
async fn separate_connections_share_one_lock() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("locks.db").display().to_string();
    let first = Database::open(&path).await.unwrap();
    let second = Database::open(&path).await.unwrap();

    let a = Arc::new(SqliteLockClient::new(first, "instance-a"));
    let b = Arc::new(SqliteLockClient::new(second, "instance-b"));

    let (ra, rb) = tokio::join!(
        a.acquire("db_update", Duration::from_secs(60)),
        b.acquire("db_update", Duration::from_secs(60)),
    );
    assert!(ra.unwrap() ^ rb.unwrap(), "exactly one instance must win");

    let winner = a.holder("db_update").await.unwrap().unwrap();
    let (owner, other) = if winner == "instance-a" { (&a, &b) } else { (&b, &a) };
    other.release("db_update").await.unwrap();
    assert_eq!(other.holder("db_update").await.unwrap().as_deref(), Some(winner.as_str()));

    owner.release("db_update").await.unwrap();
    assert!(other.acquire("db_update", Duration::from_secs(60)).await.unwrap());
}

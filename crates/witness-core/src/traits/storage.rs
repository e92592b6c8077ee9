// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends (SQLite, etc.).

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::WitnessError;
use crate::state::ConversationState;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    ApprovalStatus, CandidatePost, Conversation, ConversationNode, InsertOutcome, Script,
};

/// Adapter for storage and persistence backends.
///
/// Offers keyed get/update/insert over conversations, scripts and candidate
/// posts. Inserts are idempotent on the key: an existing key yields
/// [`InsertOutcome::Duplicate`] and leaves the stored record untouched.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), WitnessError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), WitnessError>;

    // --- Conversations ---

    async fn insert_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<InsertOutcome, WitnessError>;

    async fn get_conversation(
        &self,
        subject_id: &str,
    ) -> Result<Option<Conversation>, WitnessError>;

    /// Overwrites the record keyed by `conversation.subject_id`.
    async fn update_conversation(&self, conversation: &Conversation) -> Result<(), WitnessError>;

    /// Lists conversations, optionally restricted to the given states.
    async fn list_conversations(
        &self,
        states: Option<&[ConversationState]>,
    ) -> Result<Vec<Conversation>, WitnessError>;

    // --- Scripts ---

    async fn insert_script(&self, script: &Script) -> Result<InsertOutcome, WitnessError>;

    async fn get_script(&self, id: &str) -> Result<Option<Script>, WitnessError>;

    async fn list_scripts(
        &self,
        node: Option<ConversationNode>,
        active_only: bool,
    ) -> Result<Vec<Script>, WitnessError>;

    /// Sets the active flag. Returns `false` if no such script exists.
    async fn set_script_active(&self, id: &str, active: bool) -> Result<bool, WitnessError>;

    /// Atomically increments the use counter. Returns `false` if no such script exists.
    async fn increment_script_use(&self, id: &str) -> Result<bool, WitnessError>;

    /// Atomically increments the positive counter, but only while it is below
    /// the use counter. Returns whether an increment happened.
    async fn increment_script_positive(&self, id: &str) -> Result<bool, WitnessError>;

    // --- Candidate posts ---

    async fn insert_post(&self, post: &CandidatePost) -> Result<InsertOutcome, WitnessError>;

    async fn get_post(&self, id: &str) -> Result<Option<CandidatePost>, WitnessError>;

    /// Which of `ids` already exist in storage.
    async fn existing_post_ids(&self, ids: &[String]) -> Result<HashSet<String>, WitnessError>;

    /// Overwrites the record keyed by `post.id`.
    async fn update_post(&self, post: &CandidatePost) -> Result<(), WitnessError>;

    /// Lists posts, optionally by status, newest first.
    async fn list_posts(
        &self,
        status: Option<ApprovalStatus>,
        limit: Option<i64>,
    ) -> Result<Vec<CandidatePost>, WitnessError>;
}

// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Witness outreach engine.
//!
//! This crate provides the foundational trait definitions, error types,
//! conversation states and domain records used throughout the Witness
//! workspace. Every external collaborator is reached through a trait
//! defined here.

pub mod error;
pub mod state;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::WitnessError;
pub use state::ConversationState;
pub use types::{
    AdapterType, ApprovalStatus, CandidatePost, Conversation, ConversationNode, Fetch,
    ForceRank, HealthStatus, InsertOutcome, MessageId, Script,
};

// Re-export all adapter traits at crate root.
pub use traits::{
    ClassifierAdapter, GeocoderAdapter, LockClient, MessagingAdapter, PluginAdapter, PostSource,
    StorageAdapter,
};

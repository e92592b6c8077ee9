// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Witness outreach engine.

use std::time::Duration;

use thiserror::Error;

use crate::state::ConversationState;
use crate::types::ConversationNode;

/// The primary error type used across all Witness adapter traits and core operations.
#[derive(Debug, Error)]
pub enum WitnessError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A named job lock is held by another instance. Contention, not a fault.
    #[error("lock `{name}` is held by another instance")]
    LockUnavailable { name: String },

    /// An upstream collaborator asked us to back off.
    #[error("upstream rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// An upstream collaborator failed (bad status, malformed payload, transport).
    #[error("upstream api error: {message}")]
    UpstreamApi {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The geocoder could not resolve a location.
    #[error("geocode unresolved: {status}")]
    GeocodeUnresolved { status: String },

    /// No active script exists for a conversation node.
    #[error("no active script for node `{node}`")]
    NoActiveScript { node: ConversationNode },

    /// A conversation state change that is not in the transition table.
    #[error("invalid conversation transition {from} -> {to}")]
    InvalidTransition {
        from: ConversationState,
        to: ConversationState,
    },

    /// A keyed record does not exist.
    #[error("{kind} `{id}` not found")]
    NotFound { kind: &'static str, id: String },

    /// Input failed domain validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl WitnessError {
    /// Shorthand for an upstream error without an underlying source.
    pub fn upstream(message: impl Into<String>) -> Self {
        WitnessError::UpstreamApi {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a storage error from any error value.
    pub fn storage(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        WitnessError::Storage {
            source: source.into(),
        }
    }

    /// Whether the error is an upstream throttling or transport condition that
    /// should truncate the current batch rather than fail it.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            WitnessError::RateLimited { .. } | WitnessError::UpstreamApi { .. }
        )
    }
}

// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation state machine for the Witness outreach engine.
//!
//! [`ConversationEngine`] drives each subject from first contact through the
//! form request to an administrator decision.

pub mod classify;
pub mod engine;

pub use classify::{ReplyKind, classify_reply, classify_text};
pub use engine::{AdvanceReport, ConversationEngine};

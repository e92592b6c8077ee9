// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Witness integration tests.
//!
//! Mock collaborators and a harness for fast, deterministic tests without
//! external services.
//!
//! - [`MockMessaging`] captures outbound messages and replays injected replies
//! - [`MockClassifier`], [`MockGeocoder`], [`MockPostSource`] script the other collaborators
//! - [`InMemoryLockClient`] shares a lease table between simulated instances
//! - [`TestHarness`] wires them to a temp SQLite database

pub mod harness;
pub mod lock;
pub mod mock_collaborators;
pub mod mock_messaging;

pub use harness::TestHarness;
pub use lock::{InMemoryLockClient, LockTable};
pub use mock_collaborators::{MockClassifier, MockGeocoder, MockPostSource, raw_post};
pub use mock_messaging::{MockMessaging, SentMessage};

// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Witness outreach engine.
//!
//! WAL-mode SQLite with embedded migrations and a single-writer connection
//! via `tokio-rusqlite`. Provides the [`SqliteStorage`] adapter for
//! conversations, scripts and candidate posts, and [`SqliteLockClient`] for
//! named job locks.

pub mod adapter;
pub mod database;
pub mod lock;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
pub use lock::SqliteLockClient;

// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements run on tokio-rusqlite's background thread, one at a time.
//! Clones of a [`Database`] share that thread.

use std::path::Path;

use tracing::debug;
use witness_core::WitnessError;

use crate::migrations;

/// Convert a tokio-rusqlite error into `WitnessError::Storage`.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> WitnessError {
    WitnessError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the SQLite database.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Opens `path` in WAL mode, creating it and applying migrations as needed.
    pub async fn open(path: &str) -> Result<Self, WitnessError> {
        Self::open_with(path, true).await
    }

    /// Opens `path`, choosing the journal mode.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, WitnessError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(WitnessError::storage)?;
        }

        // Schema setup runs on a plain connection before the async one opens.
        let setup_path = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), WitnessError> {
            let mut conn =
                rusqlite::Connection::open(&setup_path).map_err(WitnessError::storage)?;
            apply_pragmas(&conn, wal_mode).map_err(WitnessError::storage)?;
            migrations::run_migrations(&mut conn)
        })
        .await
        .map_err(|e| WitnessError::Internal(format!("migration task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(WitnessError::storage)?;
        conn.call(move |conn| apply_pragmas(conn, wal_mode))
            .await
            .map_err(map_tr_err)?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The async connection used by the query modules.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Truncates the WAL into the main database file.
    pub async fn checkpoint(&self) -> Result<(), WitnessError> {
        self.conn
            .call(|conn| conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);"))
            .await
            .map_err(map_tr_err)
    }

    /// Checkpoints and closes the connection.
    pub async fn close(self) -> Result<(), WitnessError> {
        self.checkpoint().await?;
        self.conn.close().await.map_err(WitnessError::storage)
    }
}

fn apply_pragmas(conn: &rusqlite::Connection, wal_mode: bool) -> Result<(), rusqlite::Error> {
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    if wal_mode {
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(mode = %mode, "journal mode set");
    }
    conn.execute_batch("PRAGMA synchronous = NORMAL; PRAGMA foreign_keys = ON;")
}

// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded database migrations using refinery.
//!
//! SQL files under `migrations/` are compiled into the binary and applied
//! when a [`Database`](crate::Database) is opened.

use witness_core::WitnessError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Applies every pending migration. Refinery records applied versions in
/// `refinery_schema_history`, so this is safe to call on every open.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), WitnessError> {
    let report = embedded::migrations::runner()
        .run(conn)
        .map_err(WitnessError::storage)?;
    for migration in report.applied_migrations() {
        tracing::info!(migration = %migration, "applied migration");
    }
    Ok(())
}

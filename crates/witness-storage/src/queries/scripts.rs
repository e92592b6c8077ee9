// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Script catalog rows and their counters.
//!
//! Counter changes are single `UPDATE ... SET n = n + 1` statements so that
//! concurrent selections never lose an increment.

use rusqlite::params;
use witness_core::{ConversationNode, InsertOutcome, Script, WitnessError};

use crate::database::Database;
use crate::queries::{counter_column, parse_column};

const COLUMNS: &str = "id, node, text, active, use_count, positive_count, external_ref, created_at";

fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Script> {
    Ok(Script {
        id: row.get(0)?,
        node: parse_column(row, 1)?,
        text: row.get(2)?,
        active: row.get(3)?,
        use_count: counter_column(row, 4)?,
        positive_count: counter_column(row, 5)?,
        external_ref: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Inserts a script unless its id is taken.
pub async fn insert_script(db: &Database, script: &Script) -> Result<InsertOutcome, WitnessError> {
    let s = script.clone();
    let use_count = i64::try_from(s.use_count).map_err(WitnessError::storage)?;
    let positive_count = i64::try_from(s.positive_count).map_err(WitnessError::storage)?;
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                &format!("INSERT OR IGNORE INTO scripts ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
                params![
                    s.id,
                    s.node.to_string(),
                    s.text,
                    s.active,
                    use_count,
                    positive_count,
                    s.external_ref,
                    s.created_at,
                ],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(if changed == 1 {
        InsertOutcome::Inserted
    } else {
        InsertOutcome::Duplicate
    })
}

/// Gets a script by id.
pub async fn get_script(db: &Database, id: &str) -> Result<Option<Script>, WitnessError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM scripts WHERE id = ?1"))?;
            match stmt.query_row(params![id], from_row) {
                Ok(script) => Ok(Some(script)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Lists scripts in creation order, optionally for one node and only active ones.
pub async fn list_scripts(
    db: &Database,
    node: Option<ConversationNode>,
    active_only: bool,
) -> Result<Vec<Script>, WitnessError> {
    let node = node.map(|n| n.to_string());
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM scripts
                 WHERE (?1 IS NULL OR node = ?1) AND (?2 = 0 OR active = 1)
                 ORDER BY created_at, id"
            ))?;
            let rows = stmt.query_map(params![node, active_only], from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Sets the active flag; `false` when no such script exists.
pub async fn set_script_active(db: &Database, id: &str, active: bool) -> Result<bool, WitnessError> {
    let id = id.to_string();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE scripts SET active = ?2 WHERE id = ?1",
                params![id, active],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(changed == 1)
}

/// Adds one use.
pub async fn increment_use(db: &Database, id: &str) -> Result<bool, WitnessError> {
    let id = id.to_string();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE scripts SET use_count = use_count + 1 WHERE id = ?1",
                params![id],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(changed == 1)
}

/// Adds one positive outcome while positives trail uses.
pub async fn increment_positive(db: &Database, id: &str) -> Result<bool, WitnessError> {
    let id = id.to_string();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE scripts SET positive_count = positive_count + 1
                 WHERE id = ?1 AND positive_count < use_count",
                params![id],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(changed == 1)
}

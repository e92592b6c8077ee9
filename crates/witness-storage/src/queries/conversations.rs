// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation CRUD operations.

use rusqlite::{params, params_from_iter};
use witness_core::{Conversation, ConversationState, InsertOutcome, WitnessError};

use crate::database::Database;
use crate::queries::{parse_column, rank_column};

const COLUMNS: &str = "subject_id, recipient, state, root_location, root_city, root_region, \
     root_lat, root_long, root_incident_date, root_force_rank, last_script_id, \
     last_inbound_at, last_outbound_at, contact_attempts, created_at, updated_at, archived_at, \
     form_reminders";

fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        subject_id: row.get(0)?,
        recipient: row.get(1)?,
        state: parse_column(row, 2)?,
        root_location: row.get(3)?,
        root_city: row.get(4)?,
        root_region: row.get(5)?,
        root_lat: row.get(6)?,
        root_long: row.get(7)?,
        root_incident_date: row.get(8)?,
        root_force_rank: rank_column(row, 9)?,
        last_script_id: row.get(10)?,
        last_inbound_at: row.get(11)?,
        last_outbound_at: row.get(12)?,
        contact_attempts: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
        archived_at: row.get(16)?,
        form_reminders: row.get(17)?,
    })
}

/// Inserts a conversation unless its subject already has one.
pub async fn insert_conversation(
    db: &Database,
    conversation: &Conversation,
) -> Result<InsertOutcome, WitnessError> {
    let c = conversation.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "INSERT OR IGNORE INTO conversations ({COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)"
                ),
                params![
                    c.subject_id,
                    c.recipient,
                    c.state.to_string(),
                    c.root_location,
                    c.root_city,
                    c.root_region,
                    c.root_lat,
                    c.root_long,
                    c.root_incident_date,
                    c.root_force_rank.map(|r| r.level()),
                    c.last_script_id,
                    c.last_inbound_at,
                    c.last_outbound_at,
                    c.contact_attempts,
                    c.created_at,
                    c.updated_at,
                    c.archived_at,
                    c.form_reminders,
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

/// Gets a conversation by subject id.
pub async fn get_conversation(
    db: &Database,
    subject_id: &str,
) -> Result<Option<Conversation>, WitnessError> {
    let subject_id = subject_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM conversations WHERE subject_id = ?1"
            ))?;
            match stmt.query_row(params![subject_id], from_row) {
                Ok(conversation) => Ok(Some(conversation)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Overwrites a conversation by subject id.
pub async fn update_conversation(
    db: &Database,
    conversation: &Conversation,
) -> Result<(), WitnessError> {
    let c = conversation.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET recipient = ?2, state = ?3, root_location = ?4,
                     root_city = ?5, root_region = ?6, root_lat = ?7, root_long = ?8,
                     root_incident_date = ?9, root_force_rank = ?10, last_script_id = ?11,
                     last_inbound_at = ?12, last_outbound_at = ?13, contact_attempts = ?14,
                     updated_at = ?15, archived_at = ?16, form_reminders = ?17
                 WHERE subject_id = ?1",
                params![
                    c.subject_id,
                    c.recipient,
                    c.state.to_string(),
                    c.root_location,
                    c.root_city,
                    c.root_region,
                    c.root_lat,
                    c.root_long,
                    c.root_incident_date,
                    c.root_force_rank.map(|r| r.level()),
                    c.last_script_id,
                    c.last_inbound_at,
                    c.last_outbound_at,
                    c.contact_attempts,
                    c.updated_at,
                    c.archived_at,
                    c.form_reminders,
                ],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    if changed == 0 {
        return Err(WitnessError::NotFound {
            kind: "conversation",
            id: conversation.subject_id.clone(),
        });
    }
    Ok(())
}

/// Lists conversations, oldest first, optionally restricted to `states`.
pub async fn list_conversations(
    db: &Database,
    states: Option<&[ConversationState]>,
) -> Result<Vec<Conversation>, WitnessError> {
    let states: Option<Vec<String>> = states.map(|s| s.iter().map(|st| st.to_string()).collect());
    db.connection()
        .call(move |conn| {
            let sql = match &states {
                Some(states) if states.is_empty() => return Ok(Vec::new()),
                Some(states) => format!(
                    "SELECT {COLUMNS} FROM conversations WHERE state IN ({}) ORDER BY created_at, subject_id",
                    vec!["?"; states.len()].join(", ")
                ),
                None => format!("SELECT {COLUMNS} FROM conversations ORDER BY created_at, subject_id"),
            };
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(states.iter().flatten()), from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Candidate post records.

use std::collections::HashSet;

use rusqlite::{params, params_from_iter};
use witness_core::{ApprovalStatus, CandidatePost, InsertOutcome, WitnessError};

use crate::database::Database;
use crate::queries::{parse_column, rank_column};

const COLUMNS: &str = "id, author, text, topic, posted_at, ingested_at, rank, confidence, status, \
     city, region, lat, long, incident_date, contacted_at";

/// Host parameters per `IN (...)` lookup, well under SQLite's limit.
const ID_CHUNK: usize = 500;

fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CandidatePost> {
    Ok(CandidatePost {
        id: row.get(0)?,
        author: row.get(1)?,
        text: row.get(2)?,
        topic: row.get(3)?,
        posted_at: row.get(4)?,
        ingested_at: row.get(5)?,
        rank: rank_column(row, 6)?,
        confidence: row.get::<_, Option<f64>>(7)?.map(|c| c as f32),
        status: parse_column(row, 8)?,
        city: row.get(9)?,
        region: row.get(10)?,
        lat: row.get(11)?,
        long: row.get(12)?,
        incident_date: row.get(13)?,
        contacted_at: row.get(14)?,
    })
}

/// Inserts a post unless its id is already stored.
pub async fn insert_post(db: &Database, post: &CandidatePost) -> Result<InsertOutcome, WitnessError> {
    let p = post.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "INSERT OR IGNORE INTO candidate_posts ({COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
                ),
                params![
                    p.id,
                    p.author,
                    p.text,
                    p.topic,
                    p.posted_at,
                    p.ingested_at,
                    p.rank.map(|r| r.level()),
                    p.confidence.map(f64::from),
                    p.status.to_string(),
                    p.city,
                    p.region,
                    p.lat,
                    p.long,
                    p.incident_date,
                    p.contacted_at,
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

/// Gets a post by id.
pub async fn get_post(db: &Database, id: &str) -> Result<Option<CandidatePost>, WitnessError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {COLUMNS} FROM candidate_posts WHERE id = ?1"))?;
            match stmt.query_row(params![id], from_row) {
                Ok(post) => Ok(Some(post)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The subset of `ids` already stored.
pub async fn existing_ids(db: &Database, ids: &[String]) -> Result<HashSet<String>, WitnessError> {
    if ids.is_empty() {
        return Ok(HashSet::new());
    }
    let ids = ids.to_vec();
    db.connection()
        .call(move |conn| {
            let mut found = HashSet::new();
            for chunk in ids.chunks(ID_CHUNK) {
                let sql = format!(
                    "SELECT id FROM candidate_posts WHERE id IN ({})",
                    vec!["?"; chunk.len()].join(", ")
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params_from_iter(chunk), |row| row.get::<_, String>(0))?;
                for id in rows {
                    found.insert(id?);
                }
            }
            Ok(found)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Overwrites a post by id.
pub async fn update_post(db: &Database, post: &CandidatePost) -> Result<(), WitnessError> {
    let p = post.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE candidate_posts SET author = ?2, text = ?3, topic = ?4, posted_at = ?5,
                     rank = ?6, confidence = ?7, status = ?8, city = ?9, region = ?10,
                     lat = ?11, long = ?12, incident_date = ?13, contacted_at = ?14
                 WHERE id = ?1",
                params![
                    p.id,
                    p.author,
                    p.text,
                    p.topic,
                    p.posted_at,
                    p.rank.map(|r| r.level()),
                    p.confidence.map(f64::from),
                    p.status.to_string(),
                    p.city,
                    p.region,
                    p.lat,
                    p.long,
                    p.incident_date,
                    p.contacted_at,
                ],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    if changed == 0 {
        return Err(WitnessError::NotFound {
            kind: "post",
            id: post.id.clone(),
        });
    }
    Ok(())
}

/// Lists posts newest first, optionally by status.
pub async fn list_posts(
    db: &Database,
    status: Option<ApprovalStatus>,
    limit: Option<i64>,
) -> Result<Vec<CandidatePost>, WitnessError> {
    let status = status.map(|s| s.to_string());
    let limit = limit.unwrap_or(-1);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM candidate_posts
                 WHERE (?1 IS NULL OR status = ?1)
                 ORDER BY ingested_at DESC, id LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![status, limit], from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job lock rows. Instants are Unix milliseconds.

use rusqlite::{TransactionBehavior, params};
use witness_core::WitnessError;

use crate::database::Database;

/// Takes `name` for `holder` until `now_ms + ttl_ms`.
///
/// Runs in an immediate transaction: an expired row, or one already owned by
/// `holder`, is dropped first, then the insert decides the outcome.
pub async fn try_acquire(
    db: &Database,
    name: &str,
    holder: &str,
    now_ms: i64,
    ttl_ms: i64,
) -> Result<bool, WitnessError> {
    let name = name.to_string();
    let holder = holder.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                "DELETE FROM job_locks WHERE name = ?1 AND (expires_at <= ?2 OR holder = ?3)",
                params![name, now_ms, holder],
            )?;
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO job_locks (name, holder, acquired_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![name, holder, now_ms, now_ms.saturating_add(ttl_ms)],
            )?;
            tx.commit()?;
            Ok(inserted == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Drops `name` if `holder` owns it. Returns whether a row was removed.
pub async fn release(db: &Database, name: &str, holder: &str) -> Result<bool, WitnessError> {
    let name = name.to_string();
    let holder = holder.to_string();
    let removed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM job_locks WHERE name = ?1 AND holder = ?2",
                params![name, holder],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(removed == 1)
}

/// Current holder of `name` if its lease is still live at `now_ms`.
pub async fn holder(db: &Database, name: &str, now_ms: i64) -> Result<Option<String>, WitnessError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| {
            match conn.query_row(
                "SELECT holder FROM job_locks WHERE name = ?1 AND expires_at > ?2",
                params![name, now_ms],
                |row| row.get(0),
            ) {
                Ok(holder) => Ok(Some(holder)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::setup_db;

    #[tokio::test]
    async fn second_holder_is_refused_until_expiry() {
        let (db, _dir) = setup_db().await;
        assert!(try_acquire(&db, "advance_all", "a", 1_000, 500).await.unwrap());
        assert!(!try_acquire(&db, "advance_all", "b", 1_200, 500).await.unwrap());
        assert_eq!(holder(&db, "advance_all", 1_200).await.unwrap().as_deref(), Some("a"));

        assert!(try_acquire(&db, "advance_all", "b", 1_500, 500).await.unwrap());
        assert_eq!(holder(&db, "advance_all", 1_600).await.unwrap().as_deref(), Some("b"));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn same_holder_refreshes() {
        let (db, _dir) = setup_db().await;
        assert!(try_acquire(&db, "db_update", "a", 0, 100).await.unwrap());
        assert!(try_acquire(&db, "db_update", "a", 50, 100).await.unwrap());
        assert_eq!(holder(&db, "db_update", 120).await.unwrap().as_deref(), Some("a"));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn release_only_affects_owner() {
        let (db, _dir) = setup_db().await;
        try_acquire(&db, "db_update", "a", 0, 1_000).await.unwrap();
        assert!(!release(&db, "db_update", "b").await.unwrap());
        assert!(release(&db, "db_update", "a").await.unwrap());
        assert!(!release(&db, "db_update", "a").await.unwrap());
        assert!(holder(&db, "db_update", 10).await.unwrap().is_none());
        db.close().await.unwrap();
    }
}

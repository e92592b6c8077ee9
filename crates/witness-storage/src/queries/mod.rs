// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per table.

pub mod conversations;
pub mod locks;
pub mod posts;
pub mod scripts;

use std::str::FromStr;

use rusqlite::types::Type;
use witness_core::ForceRank;

/// Reads a text column through `FromStr`, e.g. a state or node name.
pub(crate) fn parse_column<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Reads a nullable force rank stored as its numeric level.
pub(crate) fn rank_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Option<ForceRank>> {
    match row.get::<_, Option<i64>>(idx)? {
        None => Ok(None),
        Some(level) => u8::try_from(level)
            .ok()
            .and_then(ForceRank::from_level)
            .map(Some)
            .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, level)),
    }
}

/// Reads a non-negative counter column.
pub(crate) fn counter_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let value: i64 = row.get(idx)?;
    u64::try_from(value).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(idx, value))
}

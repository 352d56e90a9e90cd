//! Chunked, paced upserts.

use crate::context::SyncContext;
use crate::error::{SyncError, SyncResult};
use crate::store::{Row, Table};
use serde::Serialize;
use std::collections::HashMap;

/// Upsert `rows` into `table` in chunks of at most `batch_size`, pausing
/// between chunks (never after the last one).
///
/// Rows sharing a natural key are collapsed first: the last occurrence wins
/// and keeps the position of the first. Returns the number of rows written.
pub fn upsert_batched<R: Serialize>(
    ctx: &SyncContext<'_>,
    table: &Table,
    rows: &[R],
) -> SyncResult<usize> {
    let rows = dedup_by_key(table, to_rows(rows)?);
    if rows.is_empty() {
        return Ok(0);
    }

    let chunks: Vec<&[Row]> = rows.chunks(ctx.settings.batch_size).collect();
    let last = chunks.len() - 1;
    for (i, chunk) in chunks.into_iter().enumerate() {
        ctx.store.upsert(table, chunk)?;
        tracing::debug!(table = table.name, batch = i + 1, rows = chunk.len(), "batch written");
        if i < last {
            ctx.clock.pause(ctx.settings.batch_delay());
        }
    }
    Ok(rows.len())
}

fn to_rows<R: Serialize>(rows: &[R]) -> SyncResult<Vec<Row>> {
    rows.iter()
        .map(|r| match serde_json::to_value(r) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(other) => Err(SyncError::Storage(format!(
                "row did not serialize to an object: {other}"
            ))),
            Err(e) => Err(SyncError::Storage(format!("row serialization: {e}"))),
        })
        .collect()
}

fn dedup_by_key(table: &Table, rows: Vec<Row>) -> Vec<Row> {
    let mut seen: HashMap<Vec<String>, usize> = HashMap::with_capacity(rows.len());
    let mut out: Vec<Row> = Vec::with_capacity(rows.len());
    for row in rows {
        let key = table.key_of(&row);
        match seen.get(&key) {
            Some(&idx) => out[idx] = row,
            None => {
                seen.insert(key, out.len());
                out.push(row);
            }
        }
    }
    out
}

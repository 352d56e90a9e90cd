//! In-process store with upsert-by-key semantics.
//!
//! Backs the test suite. Every accepted upsert call is logged so batching can
//! be asserted exactly.

use super::{Filter, Row, Store, Table};
use crate::error::{SyncError, SyncResult};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

/// One `upsert` call as seen by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRecord {
    pub table: String,
    pub rows: usize,
}

/// Rows in insertion order plus the position of each natural key.
#[derive(Debug, Default)]
struct StoredTable {
    rows: Vec<Row>,
    by_key: HashMap<Vec<String>, usize>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<BTreeMap<String, StoredTable>>,
    writes: Mutex<Vec<WriteRecord>>,
    failing_tables: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All rows of a table in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.rows(table).len()
    }

    /// Upsert calls made so far, in order.
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.writes.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear_writes(&self) {
        self.writes.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Make every upsert into `table` fail with a storage error.
    pub fn fail_writes_to(&self, table: &str) {
        self.failing_tables
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(table.to_string());
    }
}

impl Store for MemoryStore {
    fn select_first(
        &self,
        table: &Table,
        column: &str,
        filter: Option<Filter<'_>>,
    ) -> SyncResult<Option<Value>> {
        let tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        let Some(stored) = tables.get(table.name) else {
            return Ok(None);
        };
        let hit = stored.rows.iter().find(|row| match filter {
            Some(f) => row.get(f.column).and_then(Value::as_str) == Some(f.equals),
            None => true,
        });
        Ok(hit.map(|row| row.get(column).cloned().unwrap_or(Value::Null)))
    }

    fn upsert(&self, table: &Table, rows: &[Row]) -> SyncResult<()> {
        if self
            .failing_tables
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(table.name)
        {
            return Err(SyncError::Storage(format!(
                "simulated write failure for '{}'",
                table.name
            )));
        }

        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        let stored = tables.entry(table.name.to_string()).or_default();
        for row in rows {
            let key = table.key_of(row);
            match stored.by_key.get(&key) {
                // merge-duplicates: provided columns overwrite, others are kept
                Some(&idx) => {
                    let existing = &mut stored.rows[idx];
                    for (col, value) in row {
                        existing.insert(col.clone(), value.clone());
                    }
                }
                None => {
                    stored.by_key.insert(key, stored.rows.len());
                    stored.rows.push(row.clone());
                }
            }
        }

        self.writes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(WriteRecord {
                table: table.name.to_string(),
                rows: rows.len(),
            });
        Ok(())
    }
}

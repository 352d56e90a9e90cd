//! Tabular storage seam.
//!
//! Every table is addressed through a [`Table`] descriptor that names its
//! natural key. Upserts overwrite rows whose key already exists, which is what
//! makes re-fetching an already-synced range harmless.

pub mod memory;
pub mod postgrest;

pub use memory::{MemoryStore, WriteRecord};
pub use postgrest::PostgrestStore;

use crate::error::SyncResult;
use serde_json::Value;

/// One row as sent to storage.
pub type Row = serde_json::Map<String, Value>;

/// A destination table and its natural (conflict) key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Table {
    pub name: &'static str,
    pub key: &'static [&'static str],
}

impl Table {
    /// Key tuple of a row, rendered for comparison. Missing key columns render as `null`.
    pub fn key_of(&self, row: &Row) -> Vec<String> {
        self.key
            .iter()
            .map(|col| row.get(*col).unwrap_or(&Value::Null).to_string())
            .collect()
    }
}

/// Equality filter on a single column.
#[derive(Debug, Clone, Copy)]
pub struct Filter<'a> {
    pub column: &'a str,
    pub equals: &'a str,
}

pub trait Store: Send + Sync {
    /// Value of `column` in the first row matching `filter`.
    ///
    /// `Ok(None)` means no row matched; a matching row whose column is null
    /// yields `Ok(Some(Value::Null))`.
    fn select_first(
        &self,
        table: &Table,
        column: &str,
        filter: Option<Filter<'_>>,
    ) -> SyncResult<Option<Value>>;

    /// Insert-or-update `rows` in a single request.
    fn upsert(&self, table: &Table, rows: &[Row]) -> SyncResult<()>;
}

pub mod tables {
    use super::Table;

    pub const META: Table = Table {
        name: "meta",
        key: &["source"],
    };
    pub const MOEX_STOCK_HISTORY: Table = Table {
        name: "moex_stock_history",
        key: &["trade_date"],
    };
    pub const MOEX_LIVE: Table = Table {
        name: "moex_live",
        key: &["id"],
    };
    pub const MOEX_DIVIDENDS: Table = Table {
        name: "moex_dividends",
        key: &["registry_close_date"],
    };
    pub const INDEX_HISTORY: Table = Table {
        name: "index_history",
        key: &["ticker", "trade_date"],
    };
    pub const CURRENCY_HISTORY: Table = Table {
        name: "currency_history",
        key: &["pair", "trade_date"],
    };
    pub const BRENT_HISTORY: Table = Table {
        name: "brent_history",
        key: &["trade_date"],
    };
    pub const TRADING_VOLUMES: Table = Table {
        name: "trading_volumes",
        key: &["trade_date"],
    };
    pub const WORLD_BANK_INDICATORS: Table = Table {
        name: "world_bank_indicators",
        key: &["country", "indicator", "year"],
    };
    pub const GLOBAL_EXCHANGES: Table = Table {
        name: "global_exchanges",
        key: &["ticker", "trade_date"],
    };
    pub const KEY_RATES: Table = Table {
        name: "key_rates",
        key: &["effective_date"],
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> Row {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn key_of_uses_declared_columns_in_order() {
        let r = row(json!({"close": 1.0, "trade_date": "2024-01-02", "ticker": "IMOEX"}));
        assert_eq!(
            tables::INDEX_HISTORY.key_of(&r),
            vec!["\"IMOEX\"".to_string(), "\"2024-01-02\"".to_string()]
        );
    }

    #[test]
    fn key_of_renders_missing_column_as_null() {
        let r = row(json!({"close": 1.0}));
        assert_eq!(tables::BRENT_HISTORY.key_of(&r), vec!["null".to_string()]);
    }
}

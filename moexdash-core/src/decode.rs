//! Column-addressed records.
//!
//! ISS responses ship each section as a `columns` list plus positional `data`
//! rows. Column positions are resolved once per page into a decoder-specific
//! layout, so a reordered upstream is harmless while a dropped column fails
//! loudly with [`SyncError::SchemaMismatch`].

use crate::error::{SyncError, SyncResult};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// One `{columns, data}` block of an ISS response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub data: Vec<Vec<Value>>,
}

impl Section {
    /// Extract section `name` from a response body. An absent section reads as empty.
    pub fn from_body(body: &Value, name: &str) -> SyncResult<Self> {
        match body.get(name) {
            None | Some(Value::Null) => Ok(Section::default()),
            Some(raw) => Section::deserialize(raw).map_err(|e| {
                SyncError::ResponseFormat(format!("section '{name}' is malformed: {e}"))
            }),
        }
    }

    pub fn header(&self, name: &str) -> Columns {
        Columns::new(name, &self.columns)
    }
}

/// Name → position lookup for one section header.
#[derive(Debug, Clone)]
pub struct Columns {
    section: String,
    positions: HashMap<String, usize>,
}

impl Columns {
    pub fn new(section: &str, names: &[String]) -> Self {
        let positions = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        Self {
            section: section.to_string(),
            positions,
        }
    }

    pub fn position(&self, column: &str) -> SyncResult<usize> {
        self.positions
            .get(column)
            .copied()
            .ok_or_else(|| SyncError::schema(&self.section, column))
    }
}

/// Maps positional records of one section into typed rows.
pub trait RowDecoder {
    type Row;
    /// Column positions resolved from a page header.
    type Layout;

    fn layout(&self, columns: &Columns) -> SyncResult<Self::Layout>;

    /// `None` rejects the record (null or non-positive primary value).
    fn decode(&self, layout: &Self::Layout, record: &[Value]) -> Option<Self::Row>;
}

pub(crate) fn field(record: &[Value], pos: usize) -> &Value {
    record.get(pos).unwrap_or(&Value::Null)
}

/// Numeric cell; numeric strings are accepted too.
pub(crate) fn number(record: &[Value], pos: usize) -> Option<f64> {
    match field(record, pos) {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Numeric cell that must be strictly positive.
pub(crate) fn positive(record: &[Value], pos: usize) -> Option<f64> {
    number(record, pos).filter(|v| *v > 0.0)
}

pub(crate) fn integer(record: &[Value], pos: usize) -> Option<i64> {
    match field(record, pos) {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn text(record: &[Value], pos: usize) -> Option<String> {
    match field(record, pos) {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// ISO date cell (`YYYY-MM-DD`).
pub(crate) fn date(record: &[Value], pos: usize) -> Option<NaiveDate> {
    match field(record, pos) {
        Value::String(s) => NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), "%Y-%m-%d").ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_section_reads_as_empty() {
        let s = Section::from_body(&json!({"other": {}}), "history").unwrap();
        assert!(s.columns.is_empty());
        assert!(s.data.is_empty());
    }

    #[test]
    fn malformed_section_is_format_error() {
        let err = Section::from_body(&json!({"history": {"columns": 5}}), "history").unwrap_err();
        assert!(matches!(err, SyncError::ResponseFormat(_)));
    }

    #[test]
    fn positions_follow_header_order() {
        let cols = Columns::new("history", &["B".to_string(), "A".to_string()]);
        assert_eq!(cols.position("A").unwrap(), 1);
        assert_eq!(cols.position("B").unwrap(), 0);
    }

    #[test]
    fn missing_column_is_schema_mismatch() {
        let cols = Columns::new("history", &["TRADEDATE".to_string()]);
        match cols.position("CLOSE").unwrap_err() {
            SyncError::SchemaMismatch { section, column } => {
                assert_eq!(section, "history");
                assert_eq!(column, "CLOSE");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn cell_helpers() {
        let rec = vec![
            json!("2024-01-03"),
            json!(12.5),
            json!(null),
            json!(0),
            json!("7"),
            json!(-1.0),
        ];
        assert_eq!(date(&rec, 0), NaiveDate::from_ymd_opt(2024, 1, 3));
        assert_eq!(number(&rec, 1), Some(12.5));
        assert_eq!(positive(&rec, 1), Some(12.5));
        assert_eq!(number(&rec, 2), None);
        assert_eq!(positive(&rec, 3), None);
        assert_eq!(integer(&rec, 4), Some(7));
        assert_eq!(positive(&rec, 5), None);
        assert_eq!(number(&rec, 99), None);
    }
}

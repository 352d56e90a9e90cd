//! Per-source "last synced date" bookkeeping and fetch-window arithmetic.
//!
//! The watermark write is not transactional with the data write. A crash in
//! between re-fetches the same range on the next run, and the re-upsert is a
//! no-op because every table upserts by natural key.

use crate::error::{SyncError, SyncResult};
use crate::store::{tables, Filter, Row, Store};
use chrono::{Days, NaiveDate};
use serde_json::Value;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Reads and writes rows of the `meta` table.
pub struct Watermarks<'a> {
    store: &'a dyn Store,
}

impl<'a> Watermarks<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Last synced date, or `None` if the source was never synced.
    pub fn get_last_date(&self, source: &str) -> SyncResult<Option<NaiveDate>> {
        let value = self.store.select_first(
            &tables::META,
            "last_date",
            Some(Filter {
                column: "source",
                equals: source,
            }),
        )?;
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => parse_stored_date(&s).map(Some).ok_or_else(|| {
                SyncError::Storage(format!("meta.last_date for '{source}' is not a date: {s}"))
            }),
            Some(other) => Err(SyncError::Storage(format!(
                "meta.last_date for '{source}' has unexpected type: {other}"
            ))),
        }
    }

    /// Upsert the watermark row for `source`. Last write wins.
    pub fn set_last_date(&self, source: &str, date: NaiveDate) -> SyncResult<()> {
        let mut row = Row::new();
        row.insert("source".into(), Value::String(source.to_string()));
        row.insert(
            "last_date".into(),
            Value::String(date.format(DATE_FORMAT).to_string()),
        );
        self.store.upsert(&tables::META, &[row])
    }

    /// Write `candidate` unless it would move the watermark backwards.
    ///
    /// Returns the watermark now in effect.
    pub fn advance(
        &self,
        source: &str,
        previous: Option<NaiveDate>,
        candidate: NaiveDate,
    ) -> SyncResult<NaiveDate> {
        match previous {
            Some(prev) if prev >= candidate => Ok(prev),
            _ => {
                self.set_last_date(source, candidate)?;
                Ok(candidate)
            }
        }
    }
}

// Timestamps from a `date`-typed column may come back as full ISO datetimes.
fn parse_stored_date(s: &str) -> Option<NaiveDate> {
    let day = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(day, DATE_FORMAT).ok()
}

/// Inclusive date range to request from upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl FetchWindow {
    /// `[last + 1 day, today]`, or `[default_from, today]` for a never-synced source.
    pub fn resume_after(last: Option<NaiveDate>, default_from: NaiveDate, today: NaiveDate) -> Self {
        let from = match last {
            Some(d) => d.checked_add_days(Days::new(1)).unwrap_or(d),
            None => default_from,
        };
        Self { from, to: today }
    }

    /// True when the source is already current and no request should be made.
    pub fn is_empty(&self) -> bool {
        self.from > self.to
    }
}

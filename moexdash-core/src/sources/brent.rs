//! Brent crude daily price from the DataHub `oil-prices` dataset (EIA data).
//!
//! The full CSV is downloaded every run and filtered locally to dates after
//! the watermark.

use crate::context::SyncContext;
use crate::error::{SyncError, SyncResult};
use crate::http::Request;
use crate::store::tables;
use crate::updater::{commit, retain_newer, Category, Dated, UpdateOutcome, Updater};
use chrono::NaiveDate;
use serde::Serialize;

const BRENT_CSV_URL: &str =
    "https://raw.githubusercontent.com/datasets/oil-prices/main/data/brent-daily.csv";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrentPrice {
    pub trade_date: NaiveDate,
    pub close: f64,
}

impl Dated for BrentPrice {
    fn watermark_date(&self) -> NaiveDate {
        self.trade_date
    }
}

/// Parse `Date,Price` CSV. Lines with a bad date or a non-positive price are skipped.
pub fn parse_brent_csv(body: &str) -> SyncResult<Vec<BrentPrice>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| SyncError::ResponseFormat(format!("Brent CSV: {e}")))?;
        let (Some(date), Some(price)) = (record.get(0), record.get(1)) else {
            continue;
        };
        let Ok(trade_date) = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d") else {
            continue;
        };
        match price.trim().parse::<f64>() {
            Ok(close) if close > 0.0 => rows.push(BrentPrice { trade_date, close }),
            _ => continue,
        }
    }
    Ok(rows)
}

pub struct BrentHistory;

impl BrentHistory {
    pub const SOURCE: &'static str = "brent_history";
}

impl Updater for BrentHistory {
    fn name(&self) -> &str {
        Self::SOURCE
    }

    fn category(&self) -> Category {
        Category::AppendOnly
    }

    fn run(&self, ctx: &SyncContext<'_>) -> SyncResult<UpdateOutcome> {
        let last = ctx.watermarks().get_last_date(Self::SOURCE)?;
        let request = Request::get(BRENT_CSV_URL, ctx.settings.bulk_timeout())
            .with_user_agent(ctx.settings.user_agent.clone());
        let mut rows = parse_brent_csv(&ctx.http.get_text(&request)?)?;

        let fetched = rows.len();
        retain_newer(&mut rows, last);
        tracing::debug!(source = Self::SOURCE, fetched, newer = rows.len(), "filtered to watermark");
        commit(ctx, Self::SOURCE, &tables::BRENT_HISTORY, last, &rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_bad_lines() {
        let csv = "Date,Price\n2024-01-02,75.89\n2024-01-03,\n2024-01-04,0\nnot-a-date,70\n2024-01-05,77.1\n2024-01-08\n";
        let rows = parse_brent_csv(csv).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].close, 75.89);
        assert_eq!(rows[1].trade_date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
    }

    #[test]
    fn header_only_is_empty() {
        assert!(parse_brent_csv("Date,Price\n").unwrap().is_empty());
    }
}

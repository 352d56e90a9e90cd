//! Monthly closes of listed exchange operators from stooq.

use crate::context::SyncContext;
use crate::error::{SyncError, SyncResult};
use crate::http::Request;
use crate::store::tables;
use crate::updater::{commit_items, Category, Dated, UpdateOutcome, Updater};
use chrono::NaiveDate;
use serde::Serialize;

/// `(stooq symbol, stored ticker)` pairs.
pub const EXCHANGES: &[(&str, &str)] = &[
    ("ice.us", "ICE"),
    ("cme.us", "CME"),
    ("388.hk", "HKEX"),
    ("lseg.uk", "LSEG"),
    ("db1.de", "DB1"),
];

const CLOSE_COLUMN: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeClose {
    pub ticker: String,
    pub trade_date: NaiveDate,
    pub close: f64,
}

impl Dated for ExchangeClose {
    fn watermark_date(&self) -> NaiveDate {
        self.trade_date
    }
}

fn stooq_url(symbol: &str, from: NaiveDate, to: NaiveDate) -> String {
    format!(
        "https://stooq.com/q/d/l/?s={symbol}&i=m&d1={}&d2={}",
        from.format("%Y%m%d"),
        to.format("%Y%m%d")
    )
}

/// Parse `Date,Open,High,Low,Close[,Volume]`. Short lines, bad dates and
/// non-positive closes are skipped; a `No data` body yields nothing.
pub fn parse_monthly_csv(body: &str, ticker: &str) -> SyncResult<Vec<ExchangeClose>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(body.trim().as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| SyncError::ResponseFormat(format!("stooq {ticker}: {e}")))?;
        let (Some(date), Some(close)) = (record.get(0), record.get(CLOSE_COLUMN)) else {
            continue;
        };
        let Ok(trade_date) = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d") else {
            continue;
        };
        if let Ok(close) = close.trim().parse::<f64>() {
            if close > 0.0 {
                rows.push(ExchangeClose {
                    ticker: ticker.to_string(),
                    trade_date,
                    close,
                });
            }
        }
    }
    Ok(rows)
}

pub struct GlobalExchanges;

impl GlobalExchanges {
    pub const SOURCE: &'static str = "global_exchanges";
}

impl Updater for GlobalExchanges {
    fn name(&self) -> &str {
        Self::SOURCE
    }

    fn category(&self) -> Category {
        Category::AppendOnly
    }

    fn run(&self, ctx: &SyncContext<'_>) -> SyncResult<UpdateOutcome> {
        let last = ctx.watermarks().get_last_date(Self::SOURCE)?;
        let from = last.unwrap_or(ctx.settings.default_from);
        let to = ctx.clock.today();

        let mut fetched = Vec::new();
        let mut failed = Vec::new();
        for &(symbol, ticker) in EXCHANGES {
            let request = Request::get(stooq_url(symbol, from, to), ctx.settings.exchange_timeout())
                .with_user_agent(ctx.settings.user_agent.clone());
            match ctx
                .http
                .get_text(&request)
                .and_then(|body| parse_monthly_csv(&body, ticker))
            {
                Ok(closes) => {
                    tracing::info!(source = Self::SOURCE, item = ticker, rows = closes.len(), "fetched");
                    fetched.push(closes);
                    ctx.clock.pause(ctx.settings.exchange_delay());
                }
                Err(e) => {
                    tracing::error!(source = Self::SOURCE, item = ticker, error = %e, "item failed");
                    failed.push((ticker.to_string(), e));
                }
            }
        }

        commit_items(ctx, Self::SOURCE, &tables::GLOBAL_EXCHANGES, last, fetched, failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_close_from_fifth_column() {
        let csv = "Date,Open,High,Low,Close,Volume\n\
                   2024-01-31,155.1,160.2,150.3,158.4,1000\n\
                   2024-02-29,158.4,162.0,0,0,900\n\
                   2024-03-28,160.0,165.5\n";
        let rows = parse_monthly_csv(csv, "ICE").unwrap();
        assert_eq!(
            rows,
            vec![ExchangeClose {
                ticker: "ICE".into(),
                trade_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
                close: 158.4,
            }]
        );
    }

    #[test]
    fn no_data_body_is_empty() {
        assert!(parse_monthly_csv("No data\n", "CME").unwrap().is_empty());
    }

    #[test]
    fn url_uses_compact_dates() {
        let from = NaiveDate::from_ymd_opt(2013, 1, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        assert_eq!(
            stooq_url("388.hk", from, to),
            "https://stooq.com/q/d/l/?s=388.hk&i=m&d1=20130101&d2=20240603"
        );
    }
}

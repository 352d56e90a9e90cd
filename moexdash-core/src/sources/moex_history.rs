//! Date-ranged, paginated MOEX ISS history sources.

use crate::context::SyncContext;
use crate::decode::{self, Columns, RowDecoder};
use crate::error::SyncResult;
use crate::paginate::fetch_paginated;
use crate::store::tables;
use crate::updater::{sync_window, Category, Dated, UpdateOutcome, Updater};
use crate::watermark::FetchWindow;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

const ISS: &str = "https://iss.moex.com/iss";
const HISTORY: &str = "history";

fn history_url(path: &str, extra: &str, window: FetchWindow, start: usize) -> String {
    format!(
        "{ISS}/history/engines/stock/markets/{path}.json?from={}&till={}&iss.meta=off{extra}&start={start}",
        window.from, window.to
    )
}

// ── Share history ───────────────────────────────────────────────────

/// Daily OHLCV bar of the MOEX share on board TQBR.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockBar {
    pub trade_date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: i64,
    pub value: f64,
}

impl Dated for StockBar {
    fn watermark_date(&self) -> NaiveDate {
        self.trade_date
    }
}

pub struct StockBarDecoder;

pub struct StockBarLayout {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
    value: usize,
}

impl RowDecoder for StockBarDecoder {
    type Row = StockBar;
    type Layout = StockBarLayout;

    fn layout(&self, columns: &Columns) -> SyncResult<StockBarLayout> {
        Ok(StockBarLayout {
            date: columns.position("TRADEDATE")?,
            open: columns.position("OPEN")?,
            high: columns.position("HIGH")?,
            low: columns.position("LOW")?,
            close: columns.position("CLOSE")?,
            volume: columns.position("VOLUME")?,
            value: columns.position("VALUE")?,
        })
    }

    fn decode(&self, l: &StockBarLayout, record: &[Value]) -> Option<StockBar> {
        let close = decode::positive(record, l.close)?;
        Some(StockBar {
            trade_date: decode::date(record, l.date)?,
            open: decode::number(record, l.open),
            high: decode::number(record, l.high),
            low: decode::number(record, l.low),
            close,
            volume: decode::integer(record, l.volume).unwrap_or(0),
            value: decode::number(record, l.value).unwrap_or(0.0),
        })
    }
}

pub struct StockHistory;

impl StockHistory {
    pub const SOURCE: &'static str = "moex_stock_history";
}

impl Updater for StockHistory {
    fn name(&self) -> &str {
        Self::SOURCE
    }

    fn category(&self) -> Category {
        Category::Incremental
    }

    fn run(&self, ctx: &SyncContext<'_>) -> SyncResult<UpdateOutcome> {
        sync_window(ctx, Self::SOURCE, &tables::MOEX_STOCK_HISTORY, |window| {
            fetch_paginated(
                ctx,
                HISTORY,
                |start| history_url("shares/boards/TQBR/securities/MOEX", "", window, start),
                &StockBarDecoder,
            )
        })
    }
}

// ── Index history ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexClose {
    pub ticker: String,
    pub trade_date: NaiveDate,
    pub close: f64,
}

impl Dated for IndexClose {
    fn watermark_date(&self) -> NaiveDate {
        self.trade_date
    }
}

pub struct IndexCloseDecoder<'a> {
    pub ticker: &'a str,
}

impl RowDecoder for IndexCloseDecoder<'_> {
    type Row = IndexClose;
    type Layout = (usize, usize);

    fn layout(&self, columns: &Columns) -> SyncResult<(usize, usize)> {
        Ok((columns.position("TRADEDATE")?, columns.position("CLOSE")?))
    }

    fn decode(&self, &(date, close): &(usize, usize), record: &[Value]) -> Option<IndexClose> {
        let close = decode::positive(record, close)?;
        Some(IndexClose {
            ticker: self.ticker.to_string(),
            trade_date: decode::date(record, date)?,
            close,
        })
    }
}

/// Close history of one MOEX index; all indices share the `index_history` table.
pub struct IndexHistory {
    ticker: String,
    name: String,
    source: String,
}

impl IndexHistory {
    pub fn new(ticker: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            name: format!("index_history/{ticker}"),
            source: format!("index_history_{ticker}"),
        }
    }
}

impl Updater for IndexHistory {
    fn name(&self) -> &str {
        &self.name
    }

    fn watermark_key(&self) -> &str {
        &self.source
    }

    fn category(&self) -> Category {
        Category::Incremental
    }

    fn run(&self, ctx: &SyncContext<'_>) -> SyncResult<UpdateOutcome> {
        let decoder = IndexCloseDecoder {
            ticker: &self.ticker,
        };
        let path = format!("index/securities/{}", self.ticker);
        sync_window(ctx, &self.source, &tables::INDEX_HISTORY, |window| {
            fetch_paginated(
                ctx,
                HISTORY,
                |start| history_url(&path, "", window, start),
                &decoder,
            )
        })
    }
}

// ── Trading volumes ─────────────────────────────────────────────────

/// Daily traded value across the IMOEX constituents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradingVolume {
    pub trade_date: NaiveDate,
    pub value: f64,
}

impl Dated for TradingVolume {
    fn watermark_date(&self) -> NaiveDate {
        self.trade_date
    }
}

pub struct TradingVolumeDecoder;

impl RowDecoder for TradingVolumeDecoder {
    type Row = TradingVolume;
    type Layout = (usize, usize);

    fn layout(&self, columns: &Columns) -> SyncResult<(usize, usize)> {
        Ok((columns.position("TRADEDATE")?, columns.position("VALUE")?))
    }

    fn decode(&self, &(date, value): &(usize, usize), record: &[Value]) -> Option<TradingVolume> {
        let value = decode::positive(record, value)?;
        Some(TradingVolume {
            trade_date: decode::date(record, date)?,
            value,
        })
    }
}

pub struct TradingVolumes;

impl TradingVolumes {
    pub const SOURCE: &'static str = "trading_volumes";
}

impl Updater for TradingVolumes {
    fn name(&self) -> &str {
        Self::SOURCE
    }

    fn category(&self) -> Category {
        Category::Incremental
    }

    fn run(&self, ctx: &SyncContext<'_>) -> SyncResult<UpdateOutcome> {
        sync_window(ctx, Self::SOURCE, &tables::TRADING_VOLUMES, |window| {
            fetch_paginated(
                ctx,
                HISTORY,
                |start| {
                    history_url(
                        "index/securities/IMOEX",
                        "&iss.only=history&history.columns=TRADEDATE,VALUE",
                        window,
                        start,
                    )
                },
                &TradingVolumeDecoder,
            )
        })
    }
}

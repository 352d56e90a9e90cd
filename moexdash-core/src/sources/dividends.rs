//! Dividend history of the MOEX share.
//!
//! The endpoint returns the full (short) list every time. All of it is
//! re-upserted; the watermark follows the newest registry close date.

use crate::context::SyncContext;
use crate::decode::{self, Section};
use crate::error::SyncResult;
use crate::http::Request;
use crate::store::tables;
use crate::updater::{commit, Category, Dated, UpdateOutcome, Updater};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

const DIVIDENDS_URL: &str = "https://iss.moex.com/iss/securities/MOEX/dividends.json?iss.meta=off";
const DEFAULT_CURRENCY: &str = "SUR";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dividend {
    pub registry_close_date: NaiveDate,
    pub value: f64,
    pub currency: String,
}

impl Dated for Dividend {
    fn watermark_date(&self) -> NaiveDate {
        self.registry_close_date
    }
}

/// Records without a registry date or a non-zero value are dropped.
pub fn parse_dividends(body: &Value) -> SyncResult<Vec<Dividend>> {
    let section = Section::from_body(body, "dividends")?;
    if section.data.is_empty() {
        return Ok(Vec::new());
    }
    let c = section.header("dividends");
    let (date, value, currency) = (
        c.position("registryclosedate")?,
        c.position("value")?,
        c.position("currencyid")?,
    );

    Ok(section
        .data
        .iter()
        .filter_map(|r| {
            let value = decode::number(r, value).filter(|v| *v != 0.0)?;
            Some(Dividend {
                registry_close_date: decode::date(r, date)?,
                value,
                currency: decode::text(r, currency).unwrap_or_else(|| DEFAULT_CURRENCY.into()),
            })
        })
        .collect())
}

pub struct Dividends;

impl Dividends {
    pub const SOURCE: &'static str = "moex_dividends";
}

impl Updater for Dividends {
    fn name(&self) -> &str {
        Self::SOURCE
    }

    fn category(&self) -> Category {
        Category::AppendOnly
    }

    fn run(&self, ctx: &SyncContext<'_>) -> SyncResult<UpdateOutcome> {
        let last = ctx.watermarks().get_last_date(Self::SOURCE)?;
        let body = ctx
            .http
            .get_json(&Request::get(DIVIDENDS_URL, ctx.settings.request_timeout()))?;
        let rows = parse_dividends(&body)?;
        commit(ctx, Self::SOURCE, &tables::MOEX_DIVIDENDS, last, &rows)
    }
}

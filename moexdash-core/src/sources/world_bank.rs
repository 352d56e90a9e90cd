//! Annual macro indicators for Russia from the World Bank v2 API.

use crate::context::SyncContext;
use crate::error::{SyncError, SyncResult};
use crate::http::Request;
use crate::store::tables;
use crate::updater::{commit_items, Category, Dated, UpdateOutcome, Updater};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const COUNTRY: &str = "RU";

/// `(indicator code, label)` pairs fetched each run.
pub const INDICATORS: &[(&str, &str)] = &[("NY.GDP.MKTP.CD", "GDP"), ("FP.CPI.TOTL.ZG", "CPI")];

#[derive(Debug, Deserialize)]
struct Observation {
    country: Ref,
    date: String,
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Ref {
    id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorValue {
    pub country: String,
    pub indicator: String,
    pub year: i32,
    pub value: f64,
}

impl Dated for IndicatorValue {
    /// Annual observations count as of December 31 of their year.
    fn watermark_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, 12, 31).unwrap_or(NaiveDate::MIN)
    }
}

fn indicator_url(indicator: &str, from_year: i32, to_year: i32) -> String {
    format!(
        "https://api.worldbank.org/v2/country/{COUNTRY}/indicator/{indicator}?format=json&date={from_year}:{to_year}&per_page=500"
    )
}

/// The API answers `[paging, observations]`; an error answer has no second
/// element and reads as no data. Null observations are skipped.
pub fn parse_indicator(body: &Value, indicator: &str) -> SyncResult<Vec<IndicatorValue>> {
    let observations = match body.get(1) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(raw) => Vec::<Observation>::deserialize(raw).map_err(|e| {
            SyncError::ResponseFormat(format!("World Bank {indicator}: {e}"))
        })?,
    };

    Ok(observations
        .into_iter()
        .filter_map(|obs| {
            Some(IndicatorValue {
                country: obs.country.id,
                indicator: indicator.to_string(),
                year: obs.date.trim().parse().ok()?,
                value: obs.value?,
            })
        })
        .collect())
}

pub struct WorldBank;

impl WorldBank {
    pub const NAME: &'static str = "world_bank";
    pub const SOURCE: &'static str = "world_bank_indicators";
}

impl Updater for WorldBank {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn watermark_key(&self) -> &str {
        Self::SOURCE
    }

    fn category(&self) -> Category {
        Category::AppendOnly
    }

    fn run(&self, ctx: &SyncContext<'_>) -> SyncResult<UpdateOutcome> {
        let last = ctx.watermarks().get_last_date(Self::SOURCE)?;
        let (from_year, to_year) = (ctx.settings.default_from.year(), ctx.clock.today().year());

        let mut fetched = Vec::new();
        let mut failed = Vec::new();
        for &(indicator, label) in INDICATORS {
            let request = Request::get(
                indicator_url(indicator, from_year, to_year),
                ctx.settings.request_timeout(),
            );
            match ctx
                .http
                .get_json(&request)
                .and_then(|body| parse_indicator(&body, indicator))
            {
                Ok(values) => {
                    tracing::info!(source = Self::SOURCE, item = label, rows = values.len(), "fetched");
                    fetched.push(values);
                    ctx.clock.pause(ctx.settings.item_delay());
                }
                Err(e) => {
                    tracing::error!(source = Self::SOURCE, item = label, error = %e, "item failed");
                    failed.push((label.to_string(), e));
                }
            }
        }

        commit_items(ctx, Self::SOURCE, &tables::WORLD_BANK_INDICATORS, last, fetched, failed)
    }
}

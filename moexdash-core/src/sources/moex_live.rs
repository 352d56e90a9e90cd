//! Current quote of the MOEX share.
//!
//! Always re-fetched and written to the single fixed-key row `id = 1`. The
//! watermark is set to today as a record of the last successful run; it is
//! never used to compute a window.

use crate::context::SyncContext;
use crate::decode::{self, Section};
use crate::error::{SyncError, SyncResult};
use crate::http::Request;
use crate::store::tables;
use crate::updater::{Category, UpdateOutcome, Updater};
use serde::Serialize;
use serde_json::Value;

const QUOTE_URL: &str =
    "https://iss.moex.com/iss/engines/stock/markets/shares/boards/TQBR/securities/MOEX.json?iss.meta=off";
const DESCRIPTION_URL: &str = "https://iss.moex.com/iss/securities/MOEX.json?iss.meta=off";

/// Trading-session figures from the `marketdata` section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSnapshot {
    pub last_price: Option<f64>,
    pub open_price: Option<f64>,
    pub high_price: Option<f64>,
    pub low_price: Option<f64>,
    pub cap: Option<f64>,
    pub cap_trend: Option<f64>,
    pub vol_today: Option<i64>,
    pub val_today: Option<f64>,
    pub num_trades: Option<i64>,
    pub update_time: Option<String>,
}

/// The `moex_live` row. Sections missing upstream are left out of the upsert
/// so the stored values survive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveQuote {
    pub id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_size: Option<i64>,
    #[serde(flatten)]
    pub market: Option<MarketSnapshot>,
}

/// Build the row from the quote endpoint body.
pub fn parse_quote(body: &Value) -> SyncResult<LiveQuote> {
    let mut quote = LiveQuote {
        id: 1,
        issue_size: None,
        market: None,
    };

    let securities = Section::from_body(body, "securities")?;
    if let Some(row) = securities.data.first() {
        let pos = securities.header("securities").position("ISSUESIZE")?;
        quote.issue_size = Some(decode::integer(row, pos).unwrap_or(0));
    }

    let md = Section::from_body(body, "marketdata")?;
    if let Some(row) = md.data.first() {
        let c = md.header("marketdata");
        quote.market = Some(MarketSnapshot {
            last_price: decode::number(row, c.position("LAST")?),
            open_price: decode::number(row, c.position("OPEN")?),
            high_price: decode::number(row, c.position("HIGH")?),
            low_price: decode::number(row, c.position("LOW")?),
            cap: decode::number(row, c.position("ISSUECAPITALIZATION")?),
            cap_trend: decode::number(row, c.position("TRENDISSUECAPITALIZATION")?),
            vol_today: decode::integer(row, c.position("VOLTODAY")?),
            val_today: decode::number(row, c.position("VALTODAY")?),
            num_trades: decode::integer(row, c.position("NUMTRADES")?),
            update_time: decode::text(row, c.position("UPDATETIME")?),
        });
    }

    Ok(quote)
}

/// Issue size from the security description endpoint, if listed.
pub fn parse_issue_size(body: &Value) -> SyncResult<Option<i64>> {
    let desc = Section::from_body(body, "description")?;
    if desc.data.is_empty() {
        return Ok(None);
    }
    let c = desc.header("description");
    let (name, value) = (c.position("name")?, c.position("value")?);

    let Some(row) = desc
        .data
        .iter()
        .find(|r| decode::field(r, name).as_str() == Some("ISSUESIZE"))
    else {
        return Ok(None);
    };
    decode::integer(row, value).map(Some).ok_or_else(|| {
        SyncError::ResponseFormat(format!(
            "ISSUESIZE is not an integer: {}",
            decode::field(row, value)
        ))
    })
}

pub struct LiveQuoteUpdater;

impl LiveQuoteUpdater {
    pub const SOURCE: &'static str = "moex_live";
}

impl Updater for LiveQuoteUpdater {
    fn name(&self) -> &str {
        Self::SOURCE
    }

    fn category(&self) -> Category {
        Category::Snapshot
    }

    fn run(&self, ctx: &SyncContext<'_>) -> SyncResult<UpdateOutcome> {
        let timeout = ctx.settings.request_timeout();
        let mut quote = parse_quote(&ctx.http.get_json(&Request::get(QUOTE_URL, timeout))?)?;

        let description = ctx.http.get_json(&Request::get(DESCRIPTION_URL, timeout))?;
        if let Some(size) = parse_issue_size(&description)? {
            quote.issue_size = Some(size);
        }

        ctx.store.upsert(&tables::MOEX_LIVE, &[to_row(&quote)?])?;

        let wm = ctx.watermarks();
        let last = wm.get_last_date(Self::SOURCE)?;
        let marker = wm.advance(Self::SOURCE, last, ctx.clock.today())?;
        let last_price = quote.market.as_ref().and_then(|m| m.last_price);
        tracing::info!(source = Self::SOURCE, ?last_price, "updated");
        Ok(UpdateOutcome::Updated {
            rows: 1,
            watermark: Some(marker),
        })
    }
}

fn to_row(quote: &LiveQuote) -> SyncResult<crate::store::Row> {
    match serde_json::to_value(quote) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(SyncError::Storage("live quote did not serialize to an object".into())),
        Err(e) => Err(SyncError::Storage(format!("live quote serialization: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn quote_body() -> Value {
        json!({
            "securities": {"columns": ["SECID", "ISSUESIZE"], "data": [["MOEX", 2276401458i64]]},
            "marketdata": {
                "columns": ["SECID", "LAST", "OPEN", "HIGH", "LOW", "ISSUECAPITALIZATION",
                            "TRENDISSUECAPITALIZATION", "VOLTODAY", "VALTODAY", "NUMTRADES", "UPDATETIME"],
                "data": [["MOEX", 201.5, 199.0, 203.0, 198.7, 4.58e11, 1.2e9, 3500000, 7.0e8, 15234, "18:49:52"]]
            }
        })
    }

    #[test]
    fn parses_both_sections() {
        let q = parse_quote(&quote_body()).unwrap();
        assert_eq!(q.id, 1);
        assert_eq!(q.issue_size, Some(2276401458));
        let m = q.market.unwrap();
        assert_eq!(m.last_price, Some(201.5));
        assert_eq!(m.num_trades, Some(15234));
        assert_eq!(m.update_time.as_deref(), Some("18:49:52"));
    }

    #[test]
    fn missing_sections_are_omitted_from_row() {
        let q = parse_quote(&json!({})).unwrap();
        let row = to_row(&q).unwrap();
        assert_eq!(row.len(), 1);
        assert_eq!(row["id"], json!(1));
    }

    #[test]
    fn flattened_market_fields_are_top_level() {
        let row = to_row(&parse_quote(&quote_body()).unwrap()).unwrap();
        assert_eq!(row["last_price"], json!(201.5));
        assert!(!row.contains_key("market"));
    }

    #[test]
    fn marketdata_without_last_column_is_schema_mismatch() {
        let body = json!({"marketdata": {"columns": ["SECID"], "data": [["MOEX"]]}});
        assert!(matches!(
            parse_quote(&body).unwrap_err(),
            SyncError::SchemaMismatch { .. }
        ));
    }

    #[test]
    fn issue_size_from_description() {
        let body = json!({"description": {
            "columns": ["name", "title", "value", "type"],
            "data": [["SECID", "Code", "MOEX", "string"], ["ISSUESIZE", "Issue size", "2278636493", "number"]]
        }});
        assert_eq!(parse_issue_size(&body).unwrap(), Some(2278636493));
        assert_eq!(parse_issue_size(&json!({})).unwrap(), None);
    }

    #[test]
    fn non_numeric_issue_size_is_format_error() {
        let body = json!({"description": {
            "columns": ["name", "title", "value"],
            "data": [["ISSUESIZE", "Issue size", "n/a"]]
        }});
        assert!(matches!(
            parse_issue_size(&body).unwrap_err(),
            SyncError::ResponseFormat(_)
        ));
    }
}

//! USD/RUB official rate from the Central Bank of Russia.
//!
//! `XML_dynamic.asp` returns every record in the requested window in one
//! windows-1251 XML document, so the window is fetched in a single request.

use crate::context::SyncContext;
use crate::error::{SyncError, SyncResult};
use crate::http::Request;
use crate::store::tables;
use crate::updater::{sync_window, Category, Dated, UpdateOutcome, Updater};
use crate::watermark::FetchWindow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const CBR_DYNAMIC_URL: &str = "http://www.cbr.ru/scripts/XML_dynamic.asp";
const USD_CODE: &str = "R01235";
const PAIR: &str = "USD/RUB";

#[derive(Debug, Deserialize)]
struct ValCurs {
    #[serde(rename = "Record", default)]
    records: Vec<CbrRecord>,
}

#[derive(Debug, Deserialize)]
struct CbrRecord {
    #[serde(rename = "@Date")]
    date: String,
    #[serde(rename = "Nominal")]
    nominal: String,
    #[serde(rename = "Value")]
    value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrencyRate {
    pub pair: String,
    pub trade_date: NaiveDate,
    pub close: f64,
}

impl Dated for CurrencyRate {
    fn watermark_date(&self) -> NaiveDate {
        self.trade_date
    }
}

fn dynamic_url(window: FetchWindow) -> String {
    format!(
        "{CBR_DYNAMIC_URL}?date_req1={}&date_req2={}&VAL_NM_RQ={USD_CODE}",
        window.from.format("%d/%m/%Y"),
        window.to.format("%d/%m/%Y")
    )
}

/// Parse the XML body; records with an unreadable date, value or nominal are skipped.
pub fn parse_rates(xml: &str) -> SyncResult<Vec<CurrencyRate>> {
    let doc: ValCurs = quick_xml::de::from_str(xml)
        .map_err(|e| SyncError::ResponseFormat(format!("CBR XML: {e}")))?;

    Ok(doc
        .records
        .iter()
        .filter_map(|rec| {
            let trade_date = NaiveDate::parse_from_str(rec.date.trim(), "%d.%m.%Y").ok()?;
            let value: f64 = rec.value.trim().replace(',', ".").parse().ok()?;
            let nominal: u32 = rec.nominal.trim().parse().ok().filter(|n| *n > 0)?;
            let close = round4(value / f64::from(nominal));
            (close > 0.0).then(|| CurrencyRate {
                pair: PAIR.to_string(),
                trade_date,
                close,
            })
        })
        .collect())
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

pub struct CurrencyHistory;

impl CurrencyHistory {
    pub const SOURCE: &'static str = "currency_history";
}

impl Updater for CurrencyHistory {
    fn name(&self) -> &str {
        Self::SOURCE
    }

    fn category(&self) -> Category {
        Category::Incremental
    }

    fn run(&self, ctx: &SyncContext<'_>) -> SyncResult<UpdateOutcome> {
        sync_window(ctx, Self::SOURCE, &tables::CURRENCY_HISTORY, |window| {
            let request = Request::get(dynamic_url(window), ctx.settings.bulk_timeout())
                .with_charset("windows-1251");
            parse_rates(&ctx.http.get_text(&request)?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="windows-1251"?>
<ValCurs ID="R01235" DateRange1="09.01.2024" DateRange2="11.01.2024" name="Foreign Currency Market Dynamic">
<Record Date="10.01.2024" Id="R01235"><Nominal>1</Nominal><Value>90,7472</Value><VunitRate>90,7472</VunitRate></Record>
<Record Date="11.01.2024" Id="R01235"><Nominal>1</Nominal><Value>89,6981</Value><VunitRate>89,6981</VunitRate></Record>
</ValCurs>"#;

    #[test]
    fn parses_decimal_comma_and_dotted_dates() {
        let rates = parse_rates(SAMPLE).unwrap();
        assert_eq!(rates.len(), 2);
        assert_eq!(rates[0].trade_date, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert_eq!(rates[0].close, 90.7472);
        assert_eq!(rates[1].pair, "USD/RUB");
    }

    #[test]
    fn divides_by_nominal_and_rounds() {
        let xml = r#"<ValCurs><Record Date="01.02.2024" Id="R01235"><Nominal>10</Nominal><Value>123,45678</Value></Record></ValCurs>"#;
        let rates = parse_rates(xml).unwrap();
        assert_eq!(rates[0].close, 12.3457);
    }

    #[test]
    fn window_without_records_is_empty() {
        let xml = r#"<ValCurs ID="R01235" DateRange1="06.01.2024" DateRange2="07.01.2024" name="Foreign Currency Market Dynamic"></ValCurs>"#;
        assert!(parse_rates(xml).unwrap().is_empty());
    }

    #[test]
    fn garbage_value_is_skipped() {
        let xml = r#"<ValCurs><Record Date="01.02.2024" Id="R01235"><Nominal>1</Nominal><Value>n/a</Value></Record></ValCurs>"#;
        assert!(parse_rates(xml).unwrap().is_empty());
    }

    #[test]
    fn url_uses_slashed_dates() {
        let w = FetchWindow {
            from: NaiveDate::from_ymd_opt(2024, 1, 9).unwrap(),
            to: NaiveDate::from_ymd_opt(2024, 1, 11).unwrap(),
        };
        assert_eq!(
            dynamic_url(w),
            "http://www.cbr.ru/scripts/XML_dynamic.asp?date_req1=09/01/2024&date_req2=11/01/2024&VAL_NM_RQ=R01235"
        );
    }
}

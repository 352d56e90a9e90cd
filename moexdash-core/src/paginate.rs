//! Offset-paginated fetch over an ISS history section.
//!
//! Pages are requested at offsets 0, N, 2N, ... until a page comes back empty
//! or shorter than the page size. A page whose records are all rejected still
//! counts as data and pagination continues past it.

use crate::context::SyncContext;
use crate::decode::{RowDecoder, Section};
use crate::error::SyncResult;
use crate::http::Request;

/// Fetch every page of `section` and decode it.
///
/// `url_for` builds the request URL for a given row offset; the caller embeds
/// the date window in it. Rows come back in upstream order.
pub fn fetch_paginated<D, F>(
    ctx: &SyncContext<'_>,
    section: &str,
    url_for: F,
    decoder: &D,
) -> SyncResult<Vec<D::Row>>
where
    D: RowDecoder,
    F: Fn(usize) -> String,
{
    let page_size = ctx.settings.page_size;
    let mut rows = Vec::new();
    let mut offset = 0usize;

    loop {
        let request = Request::get(url_for(offset), ctx.settings.request_timeout());
        let body = ctx.http.get_json(&request)?;
        let page = Section::from_body(&body, section)?;

        if page.data.is_empty() {
            break;
        }

        let layout = decoder.layout(&page.header(section))?;
        let before = rows.len();
        rows.extend(
            page.data
                .iter()
                .filter_map(|record| decoder.decode(&layout, record)),
        );
        tracing::debug!(
            offset,
            records = page.data.len(),
            accepted = rows.len() - before,
            "page decoded"
        );

        if page.data.len() < page_size {
            break;
        }
        offset += page_size;
        ctx.clock.pause(ctx.settings.page_delay());
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::Settings;
    use crate::decode::{self, Columns};
    use crate::error::SyncError;
    use crate::store::MemoryStore;
    use crate::testing::{Reply, ScriptedTransport};
    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use std::time::Duration;

    struct CloseDecoder;

    impl RowDecoder for CloseDecoder {
        type Row = (NaiveDate, f64);
        type Layout = (usize, usize);

        fn layout(&self, columns: &Columns) -> SyncResult<Self::Layout> {
            Ok((columns.position("TRADEDATE")?, columns.position("CLOSE")?))
        }

        fn decode(&self, layout: &Self::Layout, record: &[Value]) -> Option<Self::Row> {
            Some((decode::date(record, layout.0)?, decode::positive(record, layout.1)?))
        }
    }

    fn page(start_day: u32, n: u32, close: f64) -> Value {
        let data: Vec<Value> = (0..n)
            .map(|i| json!([format!("2024-01-{:02}", start_day + i), close]))
            .collect();
        json!({"history": {"columns": ["TRADEDATE", "CLOSE"], "data": data}})
    }

    fn settings(page_size: usize) -> Settings {
        Settings {
            page_size,
            ..Settings::default()
        }
    }

    fn run(
        transport: &ScriptedTransport,
        clock: &ManualClock,
        settings: &Settings,
    ) -> SyncResult<Vec<(NaiveDate, f64)>> {
        let store = MemoryStore::new();
        let ctx = SyncContext::new(&store, transport, clock, settings);
        fetch_paginated(&ctx, "history", |o| format!("http://iss.test/h?start={o}"), &CloseDecoder)
    }

    #[test]
    fn full_pages_then_short_page_are_all_consumed() {
        let transport = ScriptedTransport::new()
            .on("start=0", Reply::Json(page(1, 3, 10.0)))
            .on("start=3", Reply::Json(page(4, 3, 11.0)))
            .on("start=6", Reply::Json(page(7, 2, 12.0)));
        let clock = ManualClock::new(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());

        let rows = run(&transport, &clock, &settings(3)).unwrap();

        assert_eq!(rows.len(), 8);
        assert_eq!(rows[0].0, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(rows[7].0, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
        assert_eq!(transport.requests().len(), 3);
        // one pause after each full page
        assert_eq!(clock.pauses(), vec![Duration::from_millis(350); 2]);
    }

    #[test]
    fn empty_page_after_full_page_stops() {
        let transport = ScriptedTransport::new()
            .on("start=0", Reply::Json(page(1, 2, 10.0)))
            .on("start=2", Reply::Json(json!({"history": {"columns": [], "data": []}})));
        let clock = ManualClock::new(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());

        let rows = run(&transport, &clock, &settings(2)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(transport.requests().len(), 2);
    }

    #[test]
    fn fully_rejected_page_still_continues_pagination() {
        let transport = ScriptedTransport::new()
            .on("start=0", Reply::Json(page(1, 2, 0.0)))
            .on("start=2", Reply::Json(page(3, 1, 5.0)));
        let clock = ManualClock::new(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());

        let rows = run(&transport, &clock, &settings(2)).unwrap();
        assert_eq!(rows, vec![(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(), 5.0)]);
        assert_eq!(transport.requests().len(), 2);
    }

    #[test]
    fn rejected_record_does_not_stop_page() {
        let body = json!({"history": {"columns": ["TRADEDATE", "CLOSE"], "data": [
            ["2024-01-01", 10.0],
            ["2024-01-02", null],
            ["2024-01-03", -1.0],
            ["2024-01-04", 12.0],
        ]}});
        let transport = ScriptedTransport::new().on("start=0", Reply::Json(body));
        let clock = ManualClock::new(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());

        let rows = run(&transport, &clock, &settings(100)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].1, 12.0);
    }

    #[test]
    fn missing_column_fails_hard() {
        let body = json!({"history": {"columns": ["TRADEDATE"], "data": [["2024-01-01"]]}});
        let transport = ScriptedTransport::new().on("start=0", Reply::Json(body));
        let clock = ManualClock::new(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());

        let err = run(&transport, &clock, &settings(100)).unwrap_err();
        assert!(matches!(err, SyncError::SchemaMismatch { .. }));
    }

    #[test]
    fn http_failure_propagates_without_retry() {
        let transport = ScriptedTransport::new().on("start=0", Reply::Status(500));
        let clock = ManualClock::new(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());

        let err = run(&transport, &clock, &settings(100)).unwrap_err();
        assert!(matches!(err, SyncError::HttpStatus { status: 500, .. }));
        assert_eq!(transport.requests().len(), 1);
    }
}

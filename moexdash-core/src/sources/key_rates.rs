//! Bank of Russia key rate history.
//!
//! Rate decisions are rare and entered by hand, so the table is seeded once
//! from the list below and never incremented automatically.

use crate::context::SyncContext;
use crate::error::SyncResult;
use crate::store::tables;
use crate::updater::{commit, Category, Dated, UpdateOutcome, Updater};
use chrono::NaiveDate;
use serde::Serialize;

/// `(year, month, day, rate %)` for every decision up to the seed cut-off.
const SEED: &[(i32, u32, u32, f64)] = &[
    (2013, 9, 13, 5.50),
    (2014, 3, 3, 7.00),
    (2014, 4, 28, 7.50),
    (2014, 10, 31, 9.50),
    (2014, 12, 12, 10.50),
    (2014, 12, 16, 17.00),
    (2015, 2, 2, 15.00),
    (2015, 8, 3, 11.00),
    (2016, 6, 14, 10.50),
    (2017, 3, 27, 9.75),
    (2017, 12, 18, 7.75),
    (2018, 9, 17, 7.50),
    (2019, 6, 17, 7.50),
    (2019, 12, 16, 6.25),
    (2020, 4, 27, 5.50),
    (2020, 7, 27, 4.25),
    (2021, 3, 22, 4.50),
    (2021, 7, 26, 6.50),
    (2021, 12, 20, 8.50),
    (2022, 2, 28, 20.00),
    (2022, 4, 11, 17.00),
    (2022, 9, 19, 7.50),
    (2023, 7, 24, 8.50),
    (2023, 10, 30, 15.00),
    (2023, 12, 18, 16.00),
    (2024, 7, 26, 18.00),
    (2024, 10, 25, 21.00),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyRate {
    pub effective_date: NaiveDate,
    pub rate: f64,
}

impl Dated for KeyRate {
    fn watermark_date(&self) -> NaiveDate {
        self.effective_date
    }
}

pub fn seed_rates() -> Vec<KeyRate> {
    SEED.iter()
        .filter_map(|&(y, m, d, rate)| {
            Some(KeyRate {
                effective_date: NaiveDate::from_ymd_opt(y, m, d)?,
                rate,
            })
        })
        .collect()
}

pub struct KeyRates;

impl KeyRates {
    pub const SOURCE: &'static str = "key_rates";
}

impl Updater for KeyRates {
    fn name(&self) -> &str {
        Self::SOURCE
    }

    fn category(&self) -> Category {
        Category::Seed
    }

    fn run(&self, ctx: &SyncContext<'_>) -> SyncResult<UpdateOutcome> {
        let existing = ctx
            .store
            .select_first(&tables::KEY_RATES, "effective_date", None)?;
        if existing.is_some() {
            tracing::info!(
                source = Self::SOURCE,
                "already seeded, new decisions are entered manually"
            );
            return Ok(UpdateOutcome::UpToDate);
        }

        let last = ctx.watermarks().get_last_date(Self::SOURCE)?;
        let rows = seed_rates();
        tracing::info!(source = Self::SOURCE, rows = rows.len(), "seeding");
        commit(ctx, Self::SOURCE, &tables::KEY_RATES, last, &rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::Settings;
    use crate::store::MemoryStore;
    use crate::testing::ScriptedTransport;

    #[test]
    fn seed_is_complete_and_ordered() {
        let rates = seed_rates();
        assert_eq!(rates.len(), 27);
        assert!(rates.windows(2).all(|w| w[0].effective_date < w[1].effective_date));
        assert_eq!(rates[26].rate, 21.00);
    }

    #[test]
    fn seeds_empty_table_once() {
        let store = MemoryStore::new();
        let http = ScriptedTransport::new();
        let clock = ManualClock::new(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        let settings = Settings::without_delays();
        let ctx = SyncContext::new(&store, &http, &clock, &settings);

        let first = KeyRates.run(&ctx).unwrap();
        assert_eq!(
            first,
            UpdateOutcome::Updated {
                rows: 27,
                watermark: NaiveDate::from_ymd_opt(2024, 10, 25),
            }
        );
        store.clear_writes();

        assert_eq!(KeyRates.run(&ctx).unwrap(), UpdateOutcome::UpToDate);
        assert!(store.writes().is_empty());
        assert_eq!(store.row_count("key_rates"), 27);
        assert!(http.requests().is_empty());
    }
}

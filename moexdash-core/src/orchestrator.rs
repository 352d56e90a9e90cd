//! Runs updaters in sequence with per-source failure isolation.

use crate::context::SyncContext;
use crate::error::SyncError;
use crate::updater::{UpdateOutcome, Updater};
use std::time::Instant;

/// Result of one updater within a run.
#[derive(Debug)]
pub struct SourceResult {
    pub name: String,
    pub outcome: Result<UpdateOutcome, SyncError>,
}

/// Summary of a full run, in execution order.
#[derive(Debug, Default)]
pub struct RunReport {
    pub results: Vec<SourceResult>,
}

impl RunReport {
    /// Names of the sources that failed, in run order.
    pub fn failures(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| r.outcome.is_err())
            .map(|r| r.name.as_str())
            .collect()
    }

    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|r| r.outcome.is_ok())
    }

    /// Process exit status: 0 when every source succeeded, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.all_succeeded() {
            0
        } else {
            1
        }
    }
}

/// Run every updater once. A failing updater is logged and recorded; the
/// remaining updaters still run.
pub fn run_all(ctx: &SyncContext<'_>, updaters: &[Box<dyn Updater>]) -> RunReport {
    let mut report = RunReport::default();

    for updater in updaters {
        let span = tracing::info_span!("source", name = updater.name());
        let _guard = span.enter();
        let started = Instant::now();

        tracing::info!(category = %updater.category(), "starting");
        let outcome = updater.run(ctx);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(o) => tracing::info!(elapsed_ms, outcome = %o, "finished"),
            Err(e) => tracing::error!(elapsed_ms, error = %e, "failed"),
        }

        report.results.push(SourceResult {
            name: updater.name().to_string(),
            outcome,
        });
    }

    let failures = report.failures();
    if failures.is_empty() {
        tracing::info!(sources = report.results.len(), "all sources updated successfully");
    } else {
        tracing::error!(failed = ?failures, "some sources failed");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::Settings;
    use crate::error::SyncResult;
    use crate::store::MemoryStore;
    use crate::testing::ScriptedTransport;
    use crate::updater::Category;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        name: &'static str,
        fail: bool,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(name: &'static str, fail: bool) -> Box<dyn Updater> {
            Box::new(Fixed { name, fail, calls: AtomicUsize::new(0) })
        }
    }

    impl Updater for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn category(&self) -> Category {
            Category::Snapshot
        }

        fn run(&self, _ctx: &SyncContext<'_>) -> SyncResult<UpdateOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(SyncError::HttpStatus { url: "http://x".into(), status: 500 })
            } else {
                Ok(UpdateOutcome::NoNewData)
            }
        }
    }

    fn run(updaters: &[Box<dyn Updater>]) -> RunReport {
        let store = MemoryStore::new();
        let http = ScriptedTransport::new();
        let clock = ManualClock::new(NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
        let settings = Settings::without_delays();
        run_all(&SyncContext::new(&store, &http, &clock, &settings), updaters)
    }

    #[test]
    fn failure_does_not_stop_later_sources() {
        let report = run(&[Fixed::new("a", false), Fixed::new("b", true), Fixed::new("c", false)]);
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.failures(), vec!["b"]);
        assert!(report.results[2].outcome.is_ok());
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn clean_run_exits_zero() {
        let report = run(&[Fixed::new("a", false)]);
        assert!(report.all_succeeded());
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn empty_run_succeeds() {
        assert_eq!(run(&[]).exit_code(), 0);
    }
}

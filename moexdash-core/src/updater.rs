//! Source updater contract and the shared incremental-sync pipeline.
//!
//! Per run an updater goes
//! `window computed -> (skipped | fetch -> decode -> (no rows | upsert -> watermark advanced))`.
//! Any error before the watermark write leaves the watermark where it was.

use crate::context::SyncContext;
use crate::error::{SyncError, SyncResult};
use crate::sink::upsert_batched;
use crate::store::Table;
use crate::watermark::FetchWindow;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// Resume policy of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Date-ranged upstream request starting the day after the watermark.
    Incremental,
    /// Current state only; the watermark records the last successful run.
    Snapshot,
    /// Whole series fetched, then filtered locally against the watermark.
    AppendOnly,
    /// Loaded once into an empty table, never incremented.
    Seed,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Incremental => "incremental",
            Category::Snapshot => "snapshot",
            Category::AppendOnly => "append-only",
            Category::Seed => "seed",
        };
        f.write_str(s)
    }
}

/// How a successful updater run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// Nothing to request: the window was empty or the seed already exists.
    UpToDate,
    /// Upstream returned no acceptable rows; watermark untouched.
    NoNewData,
    /// Rows were written. `watermark` is `None` when it was deliberately held back.
    Updated {
        rows: usize,
        watermark: Option<NaiveDate>,
    },
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateOutcome::UpToDate => f.write_str("up to date"),
            UpdateOutcome::NoNewData => f.write_str("no new data"),
            UpdateOutcome::Updated {
                rows,
                watermark: Some(d),
            } => write!(f, "{rows} rows, watermark {d}"),
            UpdateOutcome::Updated {
                rows,
                watermark: None,
            } => write!(f, "{rows} rows, watermark held"),
        }
    }
}

pub trait Updater: Send + Sync {
    /// Name used in logs, the failure list and `--only`.
    fn name(&self) -> &str;

    /// Key of this source's row in the watermark table.
    fn watermark_key(&self) -> &str {
        self.name()
    }

    fn category(&self) -> Category;

    fn run(&self, ctx: &SyncContext<'_>) -> SyncResult<UpdateOutcome>;
}

/// A normalized row carrying the date that drives its source's watermark.
pub trait Dated {
    fn watermark_date(&self) -> NaiveDate;
}

/// Incremental sync: resume after the watermark, fetch the window, commit.
pub(crate) fn sync_window<R, F>(
    ctx: &SyncContext<'_>,
    source: &str,
    table: &Table,
    fetch: F,
) -> SyncResult<UpdateOutcome>
where
    R: Dated + Serialize,
    F: FnOnce(FetchWindow) -> SyncResult<Vec<R>>,
{
    let last = ctx.watermarks().get_last_date(source)?;
    let window = FetchWindow::resume_after(last, ctx.settings.default_from, ctx.clock.today());
    if window.is_empty() {
        tracing::info!(source, "already up to date");
        return Ok(UpdateOutcome::UpToDate);
    }

    tracing::info!(source, from = %window.from, to = %window.to, "fetching window");
    let rows = fetch(window)?;
    commit(ctx, source, table, last, &rows)
}

/// Upsert `rows` and move the watermark to the newest date among them.
pub(crate) fn commit<R: Dated + Serialize>(
    ctx: &SyncContext<'_>,
    source: &str,
    table: &Table,
    last: Option<NaiveDate>,
    rows: &[R],
) -> SyncResult<UpdateOutcome> {
    let Some(newest) = rows.iter().map(Dated::watermark_date).max() else {
        tracing::info!(source, "no new data");
        return Ok(UpdateOutcome::NoNewData);
    };

    let written = upsert_batched(ctx, table, rows)?;
    let watermark = ctx.watermarks().advance(source, last, newest)?;
    tracing::info!(source, rows = written, watermark = %watermark, "upserted");
    Ok(UpdateOutcome::Updated {
        rows: written,
        watermark: Some(watermark),
    })
}

/// Commit for sources made of several independently fetched series.
///
/// `fetched` holds one entry per item that succeeded, `failed` names the
/// items that errored. The shared watermark only advances to the oldest of
/// the items' newest dates, so a series that lags behind the others still
/// has its later rows picked up on the next run. Rows of successful items are
/// upserted even when some item failed, but then the watermark is held. If
/// every item failed the last error is returned.
pub(crate) fn commit_items<R: Dated + Serialize>(
    ctx: &SyncContext<'_>,
    source: &str,
    table: &Table,
    last: Option<NaiveDate>,
    fetched: Vec<Vec<R>>,
    mut failed: Vec<(String, SyncError)>,
) -> SyncResult<UpdateOutcome> {
    if fetched.is_empty() {
        if let Some((_, err)) = failed.pop() {
            return Err(err);
        }
    }

    let covered = fetched
        .iter()
        .filter_map(|item| item.iter().map(Dated::watermark_date).max())
        .min();
    let mut rows: Vec<R> = fetched.into_iter().flatten().collect();
    retain_newer(&mut rows, last);

    if rows.is_empty() {
        if failed.is_empty() {
            tracing::info!(source, "no new data");
        } else {
            tracing::warn!(source, failed = failed.len(), "no new data from the items that succeeded");
        }
        return Ok(UpdateOutcome::NoNewData);
    }

    let written = upsert_batched(ctx, table, &rows)?;
    let watermark = match covered {
        Some(candidate) if failed.is_empty() => {
            Some(ctx.watermarks().advance(source, last, candidate)?)
        }
        _ => None,
    };
    match watermark {
        Some(w) => tracing::info!(source, rows = written, watermark = %w, "upserted"),
        None => tracing::warn!(
            source,
            rows = written,
            failed = failed.len(),
            "partial update, watermark held"
        ),
    }
    Ok(UpdateOutcome::Updated {
        rows: written,
        watermark,
    })
}

/// Keep rows dated strictly after the watermark (all rows if there is none).
pub(crate) fn retain_newer<R: Dated>(rows: &mut Vec<R>, last: Option<NaiveDate>) {
    if let Some(last) = last {
        rows.retain(|r| r.watermark_date() > last);
    }
}

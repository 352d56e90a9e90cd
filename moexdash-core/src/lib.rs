//! moexdash core: incremental sync of market and macro data into the
//! dashboard's storage.
//!
//! - Source updaters for MOEX ISS, the Bank of Russia, DataHub, the World Bank and stooq
//! - Per-source watermarks in the `meta` table and fetch-window computation
//! - Paginated fetch with courtesy pauses, batched upsert by natural key
//! - Orchestrator with per-source failure isolation
//!
//! Storage, HTTP and the clock are injected through [`SyncContext`], so a full
//! run can execute offline against [`MemoryStore`], [`testing::ScriptedTransport`]
//! and [`ManualClock`].

pub mod clock;
pub mod config;
pub mod context;
pub mod decode;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod paginate;
pub mod sink;
pub mod sources;
pub mod store;
pub mod testing;
pub mod updater;
pub mod watermark;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Settings, StorageCredentials};
pub use context::SyncContext;
pub use error::{SyncError, SyncResult};
pub use http::{HttpTransport, Request, Transport};
pub use orchestrator::{run_all, RunReport, SourceResult};
pub use store::{MemoryStore, PostgrestStore, Store};
pub use updater::{Category, UpdateOutcome, Updater};
pub use watermark::{FetchWindow, Watermarks};

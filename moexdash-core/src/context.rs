//! Dependencies shared by every updater for one run.

use crate::clock::Clock;
use crate::config::Settings;
use crate::http::Transport;
use crate::store::Store;
use crate::watermark::Watermarks;

/// Explicitly constructed run dependencies. Nothing here is global.
#[derive(Clone, Copy)]
pub struct SyncContext<'a> {
    pub store: &'a dyn Store,
    pub http: &'a dyn Transport,
    pub clock: &'a dyn Clock,
    pub settings: &'a Settings,
}

impl<'a> SyncContext<'a> {
    pub fn new(
        store: &'a dyn Store,
        http: &'a dyn Transport,
        clock: &'a dyn Clock,
        settings: &'a Settings,
    ) -> Self {
        Self {
            store,
            http,
            clock,
            settings,
        }
    }

    pub fn watermarks(&self) -> Watermarks<'a> {
        Watermarks::new(self.store)
    }
}

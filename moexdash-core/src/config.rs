//! Run-wide settings.
//!
//! Tunables load from an optional TOML file; every key has a default so an
//! empty file (or no file) is valid. Storage credentials never live in the
//! file, they are read from the environment by [`StorageCredentials::from_env`].

use crate::error::{SyncError, SyncResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const ENV_STORAGE_URL: &str = "SUPABASE_URL";
pub const ENV_STORAGE_KEY: &str = "SUPABASE_SERVICE_ROLE_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Rows per page on paginated ISS endpoints.
    pub page_size: usize,
    /// Maximum rows per upsert request.
    pub batch_size: usize,
    pub page_delay_ms: u64,
    pub batch_delay_ms: u64,
    /// Pause after each World Bank indicator.
    pub item_delay_ms: u64,
    /// Pause after each external exchange download.
    pub exchange_delay_ms: u64,
    pub request_timeout_secs: u64,
    /// Timeout for bulk downloads (CBR XML, Brent CSV).
    pub bulk_timeout_secs: u64,
    pub exchange_timeout_secs: u64,
    /// Window start for sources that have never been synced.
    pub default_from: NaiveDate,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            page_size: 100,
            batch_size: 500,
            page_delay_ms: 350,
            batch_delay_ms: 500,
            item_delay_ms: 500,
            exchange_delay_ms: 1000,
            request_timeout_secs: 15,
            bulk_timeout_secs: 30,
            exchange_timeout_secs: 20,
            default_from: NaiveDate::from_ymd_opt(2013, 1, 1).unwrap_or_default(),
            user_agent: "Mozilla/5.0 (compatible; MOEX-Dashboard/1.0)".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file(path: &Path) -> SyncResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SyncError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Parse and validate settings from a TOML string.
    pub fn from_toml(content: &str) -> SyncResult<Self> {
        let settings: Settings =
            toml::from_str(content).map_err(|e| SyncError::Config(format!("parse TOML: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> SyncResult<()> {
        if self.page_size == 0 {
            return Err(SyncError::Config("page_size must be positive".into()));
        }
        if self.batch_size == 0 {
            return Err(SyncError::Config("batch_size must be positive".into()));
        }
        Ok(())
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn item_delay(&self) -> Duration {
        Duration::from_millis(self.item_delay_ms)
    }

    pub fn exchange_delay(&self) -> Duration {
        Duration::from_millis(self.exchange_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn bulk_timeout(&self) -> Duration {
        Duration::from_secs(self.bulk_timeout_secs)
    }

    pub fn exchange_timeout(&self) -> Duration {
        Duration::from_secs(self.exchange_timeout_secs)
    }

    /// Settings with every pause set to zero. Used by tests.
    pub fn without_delays() -> Self {
        Self {
            page_delay_ms: 0,
            batch_delay_ms: 0,
            item_delay_ms: 0,
            exchange_delay_ms: 0,
            ..Self::default()
        }
    }
}

/// Storage endpoint and service key.
#[derive(Clone)]
pub struct StorageCredentials {
    pub url: String,
    pub key: String,
}

impl StorageCredentials {
    pub fn from_env() -> SyncResult<Self> {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| SyncError::Config(format!("environment variable {name} is not set")))
        };
        Ok(Self {
            url: read(ENV_STORAGE_URL)?,
            key: read(ENV_STORAGE_KEY)?,
        })
    }
}

// Keep the service key out of logs.
impl std::fmt::Debug for StorageCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageCredentials")
            .field("url", &self.url)
            .field("key", &"<redacted>")
            .finish()
    }
}

//! Structured error types for sync operations.
//!
//! Malformed upstream records are not errors: decoders drop them by returning
//! `None`. Everything here aborts the current updater (or, for multi-item
//! sources, the current item).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("network failure for {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("upstream schema changed: column '{column}' missing from '{section}'")]
    SchemaMismatch { section: String, column: String },

    #[error("response format changed: {0}")]
    ResponseFormat(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl SyncError {
    pub(crate) fn schema(section: &str, column: &str) -> Self {
        SyncError::SchemaMismatch {
            section: section.to_string(),
            column: column.to_string(),
        }
    }

    pub(crate) fn network(url: &str, err: impl std::fmt::Display) -> Self {
        SyncError::Network {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_mismatch_names_column_and_section() {
        let err = SyncError::schema("history", "CLOSE");
        assert_eq!(
            err.to_string(),
            "upstream schema changed: column 'CLOSE' missing from 'history'"
        );
    }

    #[test]
    fn http_status_display() {
        let err = SyncError::HttpStatus {
            url: "https://iss.moex.com/x".into(),
            status: 500,
        };
        assert_eq!(err.to_string(), "HTTP 500 from https://iss.moex.com/x");
    }
}

//! Supabase (PostgREST) storage over blocking HTTP.
//!
//! - select: `GET /rest/v1/{table}?select={col}&limit=1[&{col}=eq.{value}]`
//! - upsert: `POST /rest/v1/{table}?on_conflict={key}` with
//!   `Prefer: resolution=merge-duplicates`

use super::{Filter, Row, Store, Table};
use crate::config::StorageCredentials;
use crate::error::{SyncError, SyncResult};
use serde_json::Value;
use std::time::Duration;

pub struct PostgrestStore {
    client: reqwest::blocking::Client,
    base_url: String,
    key: String,
}

impl PostgrestStore {
    pub fn new(credentials: &StorageCredentials, timeout: Duration) -> SyncResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Config(format!("failed to build storage client: {e}")))?;
        Ok(Self {
            client,
            base_url: credentials.url.trim_end_matches('/').to_string(),
            key: credentials.key.clone(),
        })
    }

    fn table_url(&self, table: &Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.name)
    }

    fn authorized(
        &self,
        builder: reqwest::blocking::RequestBuilder,
    ) -> reqwest::blocking::RequestBuilder {
        builder
            .header("apikey", &self.key)
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {}", self.key))
    }

    fn check(resp: reqwest::blocking::Response, what: &str) -> SyncResult<reqwest::blocking::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().unwrap_or_default();
        Err(SyncError::Storage(format!("{what}: HTTP {status}: {body}")))
    }
}

impl Store for PostgrestStore {
    fn select_first(
        &self,
        table: &Table,
        column: &str,
        filter: Option<Filter<'_>>,
    ) -> SyncResult<Option<Value>> {
        let mut query: Vec<(String, String)> = vec![
            ("select".into(), column.into()),
            ("limit".into(), "1".into()),
        ];
        if let Some(f) = filter {
            query.push((f.column.into(), format!("eq.{}", f.equals)));
        }

        let resp = self
            .authorized(self.client.get(self.table_url(table)).query(&query))
            .send()
            .map_err(|e| SyncError::Storage(format!("select from {}: {e}", table.name)))?;
        let resp = Self::check(resp, &format!("select from {}", table.name))?;

        let rows: Vec<Row> = resp.json().map_err(|e| {
            SyncError::Storage(format!("select from {}: bad response body: {e}", table.name))
        })?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| row.get(column).cloned().unwrap_or(Value::Null)))
    }

    fn upsert(&self, table: &Table, rows: &[Row]) -> SyncResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let resp = self
            .authorized(
                self.client
                    .post(self.table_url(table))
                    .query(&[("on_conflict", table.key.join(","))])
                    .header("Prefer", "resolution=merge-duplicates,return=minimal")
                    .json(rows),
            )
            .send()
            .map_err(|e| SyncError::Storage(format!("upsert into {}: {e}", table.name)))?;
        Self::check(resp, &format!("upsert into {}", table.name))?;
        Ok(())
    }
}

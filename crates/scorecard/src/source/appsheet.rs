use super::{RawRecord, SourceTable, SourceTables};
use crate::config::{ConfigError, SourceConfig};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("request for table {table} failed: {source}")]
    Http {
        table: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("table {table} answered with status {status}")]
    Status {
        table: &'static str,
        status: StatusCode,
    },
    #[error("table {table} still rate limited after {attempts} attempts")]
    RateLimited { table: &'static str, attempts: u32 },
    #[error("table {table} returned an unexpected payload")]
    UnexpectedPayload { table: &'static str },
}

/// Client for the AppSheet "Find" action, one request per table.
#[derive(Debug, Clone)]
pub struct AppSheetClient {
    http: reqwest::Client,
    config: SourceConfig,
}

impl AppSheetClient {
    pub fn new(config: SourceConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn table_url(&self, app_id: &str, table: SourceTable) -> String {
        format!(
            "https://{}/api/v2/apps/{}/tables/{}/Action",
            self.config.region,
            app_id,
            table.native_name()
        )
    }

    /// Fetches every row of `table`, backing off on rate-limit responses.
    pub async fn fetch_table(&self, table: SourceTable) -> Result<Vec<RawRecord>, ExtractError> {
        let (app_id, app_key) = self.config.credentials()?;
        let url = self.table_url(app_id, table);
        let name = table.native_name();
        let mut attempt = 0;

        loop {
            let response = self
                .http
                .post(&url)
                .header("ApplicationAccessKey", app_key)
                .json(&json!({ "Action": "Find" }))
                .send()
                .await
                .map_err(|source| ExtractError::Http { table: name, source })?;

            let status = response.status();
            if is_retryable(status) {
                if attempt >= self.config.max_retries {
                    return Err(ExtractError::RateLimited {
                        table: name,
                        attempts: attempt + 1,
                    });
                }
                let delay = backoff_delay(self.config.base_backoff, attempt);
                warn!(table = name, %status, attempt, ?delay, "rate limited, backing off");
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            if !status.is_success() {
                return Err(ExtractError::Status {
                    table: name,
                    status,
                });
            }

            let body: Value = response
                .json()
                .await
                .map_err(|source| ExtractError::Http { table: name, source })?;
            let records =
                records_from_payload(body).ok_or(ExtractError::UnexpectedPayload { table: name })?;
            debug!(table = name, rows = records.len(), "table extracted");
            return Ok(records);
        }
    }

    /// Fetches all tables one after another. Failed tables are left absent.
    pub async fn extract_all(&self) -> SourceTables {
        let mut tables = SourceTables::new();

        for table in SourceTable::ordered() {
            match self.fetch_table(table).await {
                Ok(records) => tables.insert(table, records),
                Err(err) => error!(table = table.native_name(), error = %err, "extraction failed"),
            }
        }

        info!(rows = tables.total_records(), "extraction finished");
        tables
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE
}

pub(crate) fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

pub(crate) fn records_from_payload(body: Value) -> Option<Vec<RawRecord>> {
    let rows = match body {
        Value::Array(rows) => rows,
        Value::Object(mut object) => match object.remove("Rows") {
            Some(Value::Array(rows)) => rows,
            _ => return None,
        },
        _ => return None,
    };

    Some(
        rows.into_iter()
            .filter_map(|row| match row {
                Value::Object(map) => Some(RawRecord::from(map)),
                _ => None,
            })
            .collect(),
    )
}

//! HTTP client for the hosted data store.
//!
//! The store exposes its tables over a PostgREST-style REST API:
//! `GET {url}/rest/v1/{table}?select=*`, authenticated with the project's
//! API key in both the `apikey` and `Authorization` headers.

use crate::store::rows::{RawStockRow, RawTransactionRow};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Errors talking to the hosted store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot connect to data store at {0}")]
    Connect(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("data store returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to decode rows from {table}: {source}")]
    Decode {
        table: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to send request: {0}")]
    Request(#[from] reqwest::Error),
}

/// Connection settings for [`RestStore`].
#[derive(Debug, Clone)]
pub struct RestStoreConfig {
    pub url: String,
    pub api_key: String,
    pub stock_table: String,
    pub ledger_table: String,
    /// Maximum ledger rows to fetch, newest first.
    pub ledger_limit: Option<usize>,
    pub timeout_seconds: u64,
}

/// Client for the stock and ledger tables.
#[derive(Debug, Clone)]
pub struct RestStore {
    config: RestStoreConfig,
    http_client: reqwest::Client,
}

impl RestStore {
    pub fn new(config: RestStoreConfig) -> Result<Self, StoreError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        info!("Using data store at {}", config.url);

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// URL for a table query with the given extra parameters.
    pub fn table_url(&self, table: &str) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.url.trim_end_matches('/'),
            table
        )
    }

    /// Query parameters for the stock snapshot.
    pub fn stock_query(&self) -> Vec<(&'static str, String)> {
        vec![("select", "*".to_string()), ("order", "size".to_string())]
    }

    /// Query parameters for the ledger.
    pub fn ledger_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
        ];
        if let Some(limit) = self.config.ledger_limit {
            query.push(("limit", limit.to_string()));
        }
        query
    }

    /// Fetch the current stock snapshot.
    pub async fn fetch_stock(&self) -> Result<Vec<RawStockRow>, StoreError> {
        let query = self.stock_query();
        self.fetch_table(&self.config.stock_table, &query).await
    }

    /// Fetch the transaction ledger.
    pub async fn fetch_ledger(&self) -> Result<Vec<RawTransactionRow>, StoreError> {
        let query = self.ledger_query();
        self.fetch_table(&self.config.ledger_table, &query).await
    }

    async fn fetch_table<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&'static str, String)],
    ) -> Result<Vec<T>, StoreError> {
        let url = self.table_url(table);
        debug!("GET {} {:?}", url, query);

        let response = self
            .http_client
            .get(&url)
            .query(query)
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    StoreError::Timeout(self.config.timeout_seconds)
                } else if e.is_connect() {
                    StoreError::Connect(self.config.url.clone())
                } else {
                    StoreError::Request(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status { status, body });
        }

        let rows: Vec<T> = response.json().await.map_err(|source| StoreError::Decode {
            table: table.to_string(),
            source,
        })?;

        debug!("Fetched {} rows from {}", rows.len(), table);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config() -> RestStoreConfig {
        RestStoreConfig {
            url: "https://example.supabase.co/".to_string(),
            api_key: "anon-key".to_string(),
            stock_table: "stock".to_string(),
            ledger_table: "transactions".to_string(),
            ledger_limit: None,
            timeout_seconds: 30,
        }
    }

    #[test]
    fn test_table_url() {
        let store = RestStore::new(make_config()).unwrap();
        assert_eq!(
            store.table_url("stock"),
            "https://example.supabase.co/rest/v1/stock"
        );
    }

    #[test]
    fn test_stock_query_orders_by_size() {
        let store = RestStore::new(make_config()).unwrap();
        assert!(store
            .stock_query()
            .contains(&("order", "size".to_string())));
    }

    #[test]
    fn test_ledger_query_limit() {
        let store = RestStore::new(make_config()).unwrap();
        assert!(!store.ledger_query().iter().any(|(k, _)| *k == "limit"));

        let mut config = make_config();
        config.ledger_limit = Some(500);
        let store = RestStore::new(config).unwrap();
        let query = store.ledger_query();
        assert!(query.contains(&("limit", "500".to_string())));
        assert!(query.contains(&("order", "created_at.desc".to_string())));
    }

    #[tokio::test]
    async fn test_connect_failure_is_reported() {
        let mut config = make_config();
        config.url = "http://127.0.0.1:9".to_string();
        config.timeout_seconds = 2;
        let store = RestStore::new(config).unwrap();

        let err = store.fetch_stock().await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Connect(_) | StoreError::Timeout(_) | StoreError::Request(_)
        ));
    }
}

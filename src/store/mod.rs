//! Data-store boundary.
//!
//! Fetches stock and ledger rows from the hosted store or from local JSON
//! files and converts them into typed records.

pub mod cache;
pub mod client;
pub mod local;
pub mod rows;

pub use cache::FetchCache;
pub use client::{RestStore, RestStoreConfig, StoreError};
pub use local::FileStore;

use crate::models::{StockRecord, TransactionRecord};
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::{info, warn};

/// Rows fetched for one report.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub stock: Vec<StockRecord>,
    pub ledger: Vec<TransactionRecord>,
    /// Ledger rows dropped because they had no usable direction.
    pub rejected_rows: usize,
}

/// Where rows come from.
#[derive(Debug, Clone)]
pub enum DataSource {
    Remote(RestStore),
    Local(FileStore),
}

impl DataSource {
    pub fn describe(&self) -> String {
        match self {
            DataSource::Remote(store) => store.url().to_string(),
            DataSource::Local(store) => store.describe(),
        }
    }

    /// Fetch both tables concurrently and convert them.
    pub async fn fetch(&self, show_progress: bool) -> Result<Dataset> {
        let spinner = if show_progress {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.set_message(format!("Fetching rows from {}", self.describe()));
            pb.enable_steady_tick(Duration::from_millis(100));
            Some(pb)
        } else {
            None
        };

        let fetched = match self {
            DataSource::Remote(store) => {
                futures::try_join!(store.fetch_stock(), store.fetch_ledger())
                    .map_err(anyhow::Error::from)
            }
            DataSource::Local(store) => {
                futures::try_join!(store.fetch_stock(), store.fetch_ledger())
            }
        };

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        let (raw_stock, raw_ledger) = fetched?;
        let stock = rows::stock_records(raw_stock);
        let (ledger, rejected_rows) = rows::transaction_records(raw_ledger);

        if rejected_rows > 0 {
            warn!("Rejected {} ledger rows without a usable type", rejected_rows);
        }
        info!(
            "Loaded {} stock rows and {} ledger rows",
            stock.len(),
            ledger.len()
        );

        Ok(Dataset {
            stock,
            ledger,
            rejected_rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("fixtures")
            .join(name)
    }

    #[tokio::test]
    async fn test_fetch_fixtures() {
        let source = DataSource::Local(FileStore::new(
            fixture("stock.json"),
            fixture("transactions.json"),
        ));

        let dataset = source.fetch(false).await.unwrap();

        assert_eq!(dataset.stock.len(), 12);
        assert_eq!(dataset.ledger.len(), 14);
        assert_eq!(dataset.rejected_rows, 1);
    }

    #[test]
    fn test_describe_local() {
        let source = DataSource::Local(FileStore::new(
            PathBuf::from("a.json"),
            PathBuf::from("b.json"),
        ));
        assert_eq!(source.describe(), "a.json + b.json");
    }
}

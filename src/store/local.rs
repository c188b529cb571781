//! JSON file source for stock and ledger rows.
//!
//! Reads the same row shapes the hosted store returns, from exports or
//! test fixtures. Each file holds a JSON array of row objects.

use crate::store::rows::{RawStockRow, RawTransactionRow};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FileStore {
    stock_path: PathBuf,
    ledger_path: PathBuf,
}

impl FileStore {
    pub fn new(stock_path: PathBuf, ledger_path: PathBuf) -> Self {
        Self {
            stock_path,
            ledger_path,
        }
    }

    /// Human-readable description for report metadata.
    pub fn describe(&self) -> String {
        format!(
            "{} + {}",
            self.stock_path.display(),
            self.ledger_path.display()
        )
    }

    pub async fn fetch_stock(&self) -> Result<Vec<RawStockRow>> {
        read_rows(&self.stock_path).await
    }

    pub async fn fetch_ledger(&self) -> Result<Vec<RawTransactionRow>> {
        read_rows(&self.ledger_path).await
    }
}

async fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let rows: Vec<T> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse rows from {}", path.display()))?;

    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reads_row_arrays() {
        let temp_dir = TempDir::new().unwrap();
        let stock = temp_dir.path().join("stock.json");
        let ledger = temp_dir.path().join("ledger.json");
        std::fs::write(
            &stock,
            r#"[{"organization": "TDK", "category": "kids", "size": "28", "quantity": 3}]"#,
        )
        .unwrap();
        std::fs::write(
            &ledger,
            r#"[{"id": 1, "organization": "TDK", "type": "in", "quantity": "3"}]"#,
        )
        .unwrap();

        let store = FileStore::new(stock, ledger);

        assert_eq!(store.fetch_stock().await.unwrap().len(), 1);
        assert_eq!(store.fetch_ledger().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(
            temp_dir.path().join("nope.json"),
            temp_dir.path().join("nope.json"),
        );

        let err = store.fetch_stock().await.unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let stock = temp_dir.path().join("stock.json");
        std::fs::write(&stock, "{not json").unwrap();

        let store = FileStore::new(stock.clone(), stock);

        let err = store.fetch_stock().await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }
}

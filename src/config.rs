//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.stockboard.toml` files.

use crate::analysis::{ConsumedDefinition, DEFAULT_TOP_REASONS};
use crate::cli::OutputFormat;
use crate::models::Roster;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".stockboard.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Data store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Known organizations and categories.
    #[serde(default)]
    pub roster: Roster,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Fetch cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Default report format.
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            format: OutputFormat::default(),
        }
    }
}

fn default_output() -> String {
    "stock_report.md".to_string()
}

/// Hosted data store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the store's REST endpoint.
    #[serde(default)]
    pub url: Option<String>,

    /// Public API key. Prefer the STOCKBOARD_API_KEY env var.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Table holding the stock snapshot.
    #[serde(default = "default_stock_table")]
    pub stock_table: String,

    /// Table holding the transaction ledger.
    #[serde(default = "default_ledger_table")]
    pub ledger_table: String,

    /// Cap on ledger rows fetched (newest first).
    #[serde(default)]
    pub ledger_limit: Option<usize>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            stock_table: default_stock_table(),
            ledger_table: default_ledger_table(),
            ledger_limit: None,
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_stock_table() -> String {
    "stock".to_string()
}

fn default_ledger_table() -> String {
    "transactions".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Number of dispatch reasons to list.
    #[serde(default = "default_top_reasons")]
    pub top_reasons: usize,

    /// Number of rows in the recent transactions table.
    #[serde(default = "default_recent")]
    pub recent_transactions: usize,

    /// How consumed stock is counted.
    #[serde(default)]
    pub consumed: ConsumedDefinition,

    /// Compute headline tiles within the date window instead of all-time.
    #[serde(default)]
    pub windowed_totals: bool,

    /// Largest reconciliation drift still considered balanced.
    #[serde(default)]
    pub drift_tolerance: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_reasons: default_top_reasons(),
            recent_transactions: default_recent(),
            consumed: ConsumedDefinition::default(),
            windowed_totals: false,
            drift_tolerance: 0,
        }
    }
}

fn default_top_reasons() -> usize {
    DEFAULT_TOP_REASONS
}

fn default_recent() -> usize {
    20
}

/// Fetch cache settings for watch mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long fetched rows are reused.
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl(),
        }
    }
}

fn default_ttl() -> u64 {
    60
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only values the user actually passed override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.url {
            self.store.url = Some(url.clone());
        }
        if let Some(ref key) = args.api_key {
            self.store.api_key = Some(key.clone());
        }
        if let Some(limit) = args.ledger_limit {
            self.store.ledger_limit = Some(limit);
        }
        if let Some(timeout) = args.timeout {
            self.store.timeout_seconds = timeout;
        }

        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(format) = args.format {
            self.general.format = format;
        }

        if let Some(top) = args.top_reasons {
            self.report.top_reasons = top;
        }
        if let Some(recent) = args.recent {
            self.report.recent_transactions = recent;
        }
        if let Some(consumed) = args.consumed {
            self.report.consumed = consumed.into();
        }
        if args.windowed_totals {
            self.report.windowed_totals = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

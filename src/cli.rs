//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::analysis::{ConsumedDefinition, DateWindow, TransactionFilter};
use crate::models::TxType;
use chrono::NaiveDate;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Stockboard - stock and ledger reports for a multi-location inventory
///
/// Aggregates the current stock snapshot and the transaction ledger into
/// headline KPIs, pivoted stock tables, daily movement and top dispatch
/// reasons. Markdown/JSON reports.
///
/// Examples:
///   stockboard --url https://project.supabase.co --api-key $KEY
///   stockboard --stock-file stock.json --ledger-file transactions.json --stdout
///   stockboard --from 2024-03-01 --to 2024-03-31 --format json -o march.json
///   stockboard --watch 30 --organization Bosch
///   stockboard --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Base URL of the hosted data store
    #[arg(long, value_name = "URL", env = "STOCKBOARD_URL")]
    pub url: Option<String>,

    /// API key for the hosted data store
    #[arg(long, value_name = "KEY", env = "STOCKBOARD_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Read stock rows from a JSON file instead of the store
    #[arg(long, value_name = "FILE", requires = "ledger_file")]
    pub stock_file: Option<PathBuf>,

    /// Read ledger rows from a JSON file instead of the store
    #[arg(long, value_name = "FILE", requires = "stock_file")]
    pub ledger_file: Option<PathBuf>,

    /// First ledger date to include (YYYY-MM-DD, inclusive)
    #[arg(long, value_name = "DATE")]
    pub from: Option<NaiveDate>,

    /// Last ledger date to include (YYYY-MM-DD, inclusive)
    #[arg(long, value_name = "DATE")]
    pub to: Option<NaiveDate>,

    /// Only list transactions for this organization
    #[arg(long, value_name = "ORG")]
    pub organization: Option<String>,

    /// Only list transactions in this category
    #[arg(long, value_name = "CATEGORY")]
    pub category: Option<String>,

    /// Only list transactions of this type
    #[arg(long = "type", value_name = "TYPE")]
    pub kind: Option<TypeArg>,

    /// Number of rows in the recent transactions table
    #[arg(long, value_name = "COUNT")]
    pub recent: Option<usize>,

    /// Number of dispatch reasons to list
    #[arg(long, value_name = "COUNT")]
    pub top_reasons: Option<usize>,

    /// How consumed stock is counted
    #[arg(long, value_name = "DEFINITION")]
    pub consumed: Option<ConsumedArg>,

    /// Compute headline tiles within the date window
    #[arg(long)]
    pub windowed_totals: bool,

    /// Maximum ledger rows to fetch from the store
    #[arg(long, value_name = "COUNT")]
    pub ledger_limit: Option<usize>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Print the report to stdout instead of writing a file
    #[arg(long)]
    pub stdout: bool,

    /// Re-render the report every SECS seconds until interrupted
    #[arg(long, value_name = "SECS")]
    pub watch: Option<u64>,

    /// Exit with code 2 on anomalies, rejected rows, or unbalanced stock
    #[arg(long)]
    pub strict: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .stockboard.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .stockboard.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Transaction type for --type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TypeArg {
    In,
    Out,
}

impl From<TypeArg> for TxType {
    fn from(arg: TypeArg) -> Self {
        match arg {
            TypeArg::In => TxType::In,
            TypeArg::Out => TxType::Out,
        }
    }
}

/// Definition of consumed stock for --consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ConsumedArg {
    Outflow,
    DistributedInflow,
}

impl From<ConsumedArg> for ConsumedDefinition {
    fn from(arg: ConsumedArg) -> Self {
        match arg {
            ConsumedArg::Outflow => ConsumedDefinition::Outflow,
            ConsumedArg::DistributedInflow => ConsumedDefinition::DistributedInflow,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Validate store URL format
        if let Some(ref url) = self.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Store URL must start with 'http://' or 'https://'".to_string());
            }
        }

        // Validate local files if provided
        for path in [&self.stock_file, &self.ledger_file].into_iter().flatten() {
            if !path.is_file() {
                return Err(format!("File does not exist: {}", path.display()));
            }
        }

        if self.top_reasons == Some(0) {
            return Err("Top reasons must be at least 1".to_string());
        }

        if self.watch == Some(0) {
            return Err("Watch interval must be at least 1 second".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.watch.is_some() && self.stdout && self.format == Some(OutputFormat::Json) {
            return Err("Cannot stream JSON reports to stdout in watch mode".to_string());
        }

        Ok(())
    }

    /// The date window given by --from and --to.
    pub fn window(&self) -> DateWindow {
        DateWindow::new(self.from, self.to)
    }

    /// The transaction list filter given by the CLI.
    pub fn transaction_filter(&self) -> TransactionFilter {
        TransactionFilter {
            organization: self.organization.clone(),
            category: self.category.clone(),
            kind: self.kind.map(TxType::from),
            window: self.window(),
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

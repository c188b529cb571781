//! Data models for the stock tracker.
//!
//! This module contains the typed records produced at the data-store
//! boundary, the organization roster, and the report bundle handed to
//! the report generator.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::analysis::{DashboardKpis, DateWindow, LedgerAnalysis, ReasonTotal, SnapshotAggregate};

/// Direction of a ledger movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxType {
    /// Stock arriving at an organization
    In,
    /// Stock leaving an organization
    Out,
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxType::In => write!(f, "in"),
            TxType::Out => write!(f, "out"),
        }
    }
}

impl FromStr for TxType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "in" => Ok(TxType::In),
            "out" => Ok(TxType::Out),
            other => Err(format!("unknown transaction type: {:?}", other)),
        }
    }
}

impl TxType {
    /// Returns an arrow marking the direction in reports.
    pub fn arrow(&self) -> &'static str {
        match self {
            TxType::In => "⬇️",
            TxType::Out => "⬆️",
        }
    }
}

/// One row of the current stock snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    /// Organization holding the stock.
    pub organization: String,
    /// Product category (e.g. "kids", "adults").
    pub category: String,
    /// Size label, not necessarily numeric.
    pub size: String,
    /// Units on hand.
    pub quantity: u64,
    /// Last time the row was rewritten by the store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<FixedOffset>>,
}

/// One entry of the append-only transaction ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Monotonic ledger id.
    pub id: i64,
    /// Organization the movement applies to.
    pub organization: String,
    /// Product category.
    pub category: String,
    /// Size label.
    pub size: String,
    /// Units moved.
    pub quantity: u64,
    /// Inbound or outbound.
    #[serde(rename = "type")]
    pub kind: TxType,
    /// Free-text reason for the movement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Actor who recorded the movement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    /// Creation timestamp; `None` when the store sent something unparseable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<FixedOffset>>,
}

impl TransactionRecord {
    /// Calendar date of `created_at`, in the timestamp's own offset.
    pub fn date(&self) -> Option<NaiveDate> {
        self.created_at.map(|ts| ts.date_naive())
    }
}

/// The fixed set of organizations and categories the dashboard knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Roster {
    /// Known organizations, in display order.
    pub organizations: Vec<String>,
    /// Known categories, in display order.
    pub categories: Vec<String>,
    /// The organization that buys stock from the supplier.
    pub warehouse: String,
}

impl Default for Roster {
    fn default() -> Self {
        Self {
            organizations: vec!["Warehouse", "Bosch", "TDK", "Mathma Nagar"]
                .into_iter()
                .map(String::from)
                .collect(),
            categories: vec!["kids", "adults"]
                .into_iter()
                .map(String::from)
                .collect(),
            warehouse: "Warehouse".to_string(),
        }
    }
}

impl Roster {
    pub fn knows_organization(&self, org: &str) -> bool {
        self.organizations.iter().any(|o| o == org)
    }

    pub fn knows_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    /// Orders organization names: roster order first, then everything else
    /// lexicographically. Duplicates are removed.
    pub fn order_organizations<'a, I>(&self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut known: Vec<String> = Vec::new();
        let mut unknown: Vec<String> = Vec::new();

        for name in names {
            if self.knows_organization(name) {
                if !known.contains(name) {
                    known.push(name.clone());
                }
            } else if !unknown.contains(name) {
                unknown.push(name.clone());
            }
        }

        known.sort_by_key(|name| {
            self.organizations
                .iter()
                .position(|o| o == name)
                .unwrap_or(usize::MAX)
        });
        unknown.sort();
        known.extend(unknown);
        known
    }
}

/// Metadata about a generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Where the rows came from (URL or file paths).
    pub source: String,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// The date window applied to ledger views.
    pub window: DateWindow,
    /// Number of stock rows aggregated.
    pub stock_rows: usize,
    /// Number of ledger rows analyzed.
    pub ledger_rows: usize,
    /// Rows dropped at the store boundary.
    pub rejected_rows: usize,
    /// Time spent fetching and aggregating, in seconds.
    pub duration_seconds: f64,
}

/// Everything the report generator renders.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub roster: Roster,
    pub kpis: DashboardKpis,
    pub snapshot: SnapshotAggregate,
    pub ledger: LedgerAnalysis,
    /// Ranked outbound reasons, cut to the configured count.
    pub top_reasons: Vec<ReasonTotal>,
    /// Filtered, newest-first slice of the ledger.
    pub recent_transactions: Vec<TransactionRecord>,
}

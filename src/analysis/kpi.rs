//! Headline dashboard tiles and stock reconciliation.
//!
//! Purchased, consumed and remaining stock, plus a check that purchased
//! minus consumed matches what is actually left in the warehouse.

use crate::analysis::{signed, LedgerAnalysis, SnapshotAggregate};
use crate::models::Roster;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How "consumed" stock is counted.
///
/// Earlier dashboards counted every inbound movement to a non-warehouse
/// organization; later ones count outbound movements. Both are computed so
/// the report can show when they disagree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConsumedDefinition {
    /// Inbound quantity at every organization except the warehouse
    DistributedInflow,
    /// Outbound quantity across the whole ledger
    #[default]
    Outflow,
}

impl ConsumedDefinition {
    pub fn other(&self) -> Self {
        match self {
            ConsumedDefinition::DistributedInflow => ConsumedDefinition::Outflow,
            ConsumedDefinition::Outflow => ConsumedDefinition::DistributedInflow,
        }
    }
}

impl fmt::Display for ConsumedDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsumedDefinition::DistributedInflow => write!(f, "distributed inflow"),
            ConsumedDefinition::Outflow => write!(f, "outflow"),
        }
    }
}

/// Options for [`compute_kpis`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KpiOptions {
    pub consumed: ConsumedDefinition,
    /// Use the ledger window instead of all-time sums.
    pub windowed: bool,
}

/// Expected against actual warehouse stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// purchased − consumed
    pub expected_remaining: i64,
    pub actual_remaining: i64,
    /// actual − expected
    pub drift: i64,
}

impl Reconciliation {
    pub fn is_balanced(&self, tolerance: u64) -> bool {
        self.drift.unsigned_abs() <= tolerance
    }
}

/// Headline numbers for the top of the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardKpis {
    pub purchased: u64,
    pub consumed: u64,
    pub remaining: u64,
    pub consumed_definition: ConsumedDefinition,
    /// `consumed` under the other definition.
    pub alternate_consumed: u64,
    pub windowed: bool,
    pub reconciliation: Reconciliation,
}

impl DashboardKpis {
    pub fn definitions_diverge(&self) -> bool {
        self.consumed != self.alternate_consumed
    }
}

/// Compute the headline tiles from already aggregated views.
pub fn compute_kpis(
    snapshot: &SnapshotAggregate,
    ledger: &LedgerAnalysis,
    roster: &Roster,
    options: KpiOptions,
) -> DashboardKpis {
    let warehouse = &roster.warehouse;

    let (purchased, distributed_inflow) = if options.windowed {
        let purchased = ledger.movement_totals(warehouse).in_qty;
        (purchased, ledger.windowed_in().saturating_sub(purchased))
    } else {
        let purchased = ledger.all_time_totals(warehouse).in_qty;
        (purchased, ledger.total_in().saturating_sub(purchased))
    };
    let (_, outflow) = ledger.totals(options.windowed);

    let value_of = |definition: ConsumedDefinition| match definition {
        ConsumedDefinition::DistributedInflow => distributed_inflow,
        ConsumedDefinition::Outflow => outflow,
    };
    let consumed = value_of(options.consumed);
    let alternate_consumed = value_of(options.consumed.other());

    let remaining = snapshot.per_organization_grand_total(warehouse);
    let expected_remaining = signed(purchased).saturating_sub(signed(consumed));

    DashboardKpis {
        purchased,
        consumed,
        remaining,
        consumed_definition: options.consumed,
        alternate_consumed,
        windowed: options.windowed,
        reconciliation: Reconciliation {
            expected_remaining,
            actual_remaining: signed(remaining),
            drift: signed(remaining).saturating_sub(expected_remaining),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{aggregate_snapshot, analyze_ledger, DateWindow};
    use crate::models::{StockRecord, TransactionRecord, TxType};
    use chrono::{DateTime, NaiveDate};

    fn tx(org: &str, kind: TxType, quantity: u64, created_at: &str) -> TransactionRecord {
        TransactionRecord {
            id: 0,
            organization: org.to_string(),
            category: "adults".to_string(),
            size: "38".to_string(),
            quantity,
            kind,
            reason: None,
            user_name: None,
            created_at: Some(DateTime::parse_from_rfc3339(created_at).unwrap()),
        }
    }

    fn warehouse_stock(quantity: u64) -> StockRecord {
        StockRecord {
            organization: "Warehouse".to_string(),
            category: "adults".to_string(),
            size: "38".to_string(),
            quantity,
            updated_at: None,
        }
    }

    fn sample_ledger() -> Vec<TransactionRecord> {
        vec![
            tx("Warehouse", TxType::In, 100, "2024-01-10T08:00:00+00:00"),
            tx("Warehouse", TxType::Out, 30, "2024-02-01T08:00:00+00:00"),
            tx("Bosch", TxType::In, 30, "2024-02-01T09:00:00+00:00"),
            tx("Bosch", TxType::Out, 10, "2024-02-15T09:00:00+00:00"),
        ]
    }

    #[test]
    fn test_outflow_definition_reconciles() {
        let roster = Roster::default();
        let snapshot = aggregate_snapshot(&[warehouse_stock(60)], &roster);
        let ledger = analyze_ledger(&sample_ledger(), DateWindow::default());

        let kpis = compute_kpis(&snapshot, &ledger, &roster, KpiOptions::default());

        assert_eq!(kpis.purchased, 100);
        assert_eq!(kpis.consumed, 40);
        assert_eq!(kpis.remaining, 60);
        assert_eq!(kpis.alternate_consumed, 30);
        assert!(kpis.definitions_diverge());
        assert_eq!(kpis.reconciliation.expected_remaining, 60);
        assert_eq!(kpis.reconciliation.drift, 0);
        assert!(kpis.reconciliation.is_balanced(0));
    }

    #[test]
    fn test_distributed_inflow_definition() {
        let roster = Roster::default();
        let snapshot = aggregate_snapshot(&[warehouse_stock(70)], &roster);
        let ledger = analyze_ledger(&sample_ledger(), DateWindow::default());
        let options = KpiOptions {
            consumed: ConsumedDefinition::DistributedInflow,
            windowed: false,
        };

        let kpis = compute_kpis(&snapshot, &ledger, &roster, options);

        assert_eq!(kpis.consumed, 30);
        assert_eq!(kpis.alternate_consumed, 40);
        assert_eq!(kpis.reconciliation.drift, 0);
    }

    #[test]
    fn test_windowed_kpis() {
        let roster = Roster::default();
        let snapshot = aggregate_snapshot(&[warehouse_stock(60)], &roster);
        let window = DateWindow::new(NaiveDate::from_ymd_opt(2024, 2, 1), None);
        let ledger = analyze_ledger(&sample_ledger(), window);
        let options = KpiOptions {
            consumed: ConsumedDefinition::Outflow,
            windowed: true,
        };

        let kpis = compute_kpis(&snapshot, &ledger, &roster, options);

        assert_eq!(kpis.purchased, 0);
        assert_eq!(kpis.consumed, 40);
        assert_eq!(kpis.alternate_consumed, 30);
        assert_eq!(kpis.reconciliation.drift, 100);
        assert!(!kpis.reconciliation.is_balanced(5));
    }

    #[test]
    fn test_empty_inputs() {
        let roster = Roster::default();
        let snapshot = aggregate_snapshot(&[], &roster);
        let ledger = analyze_ledger(&[], DateWindow::default());

        let kpis = compute_kpis(&snapshot, &ledger, &roster, KpiOptions::default());

        assert_eq!(kpis.purchased, 0);
        assert_eq!(kpis.consumed, 0);
        assert_eq!(kpis.remaining, 0);
        assert!(!kpis.definitions_diverge());
        assert!(kpis.reconciliation.is_balanced(0));
    }

    #[test]
    fn test_huge_quantities_do_not_overflow() {
        let roster = Roster::default();
        let ledger = vec![
            tx("Warehouse", TxType::In, u64::MAX, "2024-01-10T08:00:00+00:00"),
            tx("Warehouse", TxType::Out, 1, "2024-02-01T08:00:00+00:00"),
        ];
        let snapshot = aggregate_snapshot(&[warehouse_stock(u64::MAX)], &roster);
        let analysis = analyze_ledger(&ledger, DateWindow::default());

        let kpis = compute_kpis(&snapshot, &analysis, &roster, KpiOptions::default());
        assert_eq!(kpis.purchased, u64::MAX);
        assert_eq!(kpis.reconciliation.expected_remaining, i64::MAX - 1);
        assert_eq!(kpis.reconciliation.actual_remaining, i64::MAX);
        assert_eq!(kpis.reconciliation.drift, 1);
    }
}

//! Stock snapshot aggregation.
//!
//! Reduces the current-stock table into per-organization category totals
//! and an organization × size pivot. Organizations and categories the
//! roster does not know are kept and reported, never dropped.

use crate::models::{Roster, StockRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Category totals for one organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgTotals {
    pub organization: String,
    /// Every roster category (zero-filled) plus any unknown category seen.
    pub by_category: BTreeMap<String, u64>,
    /// Sum across all categories.
    pub grand_total: u64,
}

impl OrgTotals {
    fn empty(organization: &str, roster: &Roster) -> Self {
        Self {
            organization: organization.to_string(),
            by_category: roster.categories.iter().map(|c| (c.clone(), 0)).collect(),
            grand_total: 0,
        }
    }

    /// Quantity for a category, zero when absent.
    pub fn category(&self, category: &str) -> u64 {
        self.by_category.get(category).copied().unwrap_or(0)
    }
}

/// Organization × size pivot of stock quantities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizePivot {
    /// Organizations present in the input, roster order first.
    pub organizations: Vec<String>,
    /// Sizes present in the input, numeric sizes first.
    pub sizes: Vec<String>,
    /// organization → size → quantity. Missing cells read as zero.
    pub cells: BTreeMap<String, BTreeMap<String, u64>>,
}

impl SizePivot {
    pub fn get(&self, organization: &str, size: &str) -> u64 {
        self.cells
            .get(organization)
            .and_then(|row| row.get(size))
            .copied()
            .unwrap_or(0)
    }

    /// Total for one row of the pivot.
    pub fn row_total(&self, organization: &str) -> u64 {
        self.cells
            .get(organization)
            .map(|row| row.values().fold(0u64, |acc, q| acc.saturating_add(*q)))
            .unwrap_or(0)
    }
}

/// Values in the snapshot the roster does not know about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anomalies {
    pub unknown_organizations: BTreeSet<String>,
    pub unknown_categories: BTreeSet<String>,
}

impl Anomalies {
    pub fn is_empty(&self) -> bool {
        self.unknown_organizations.is_empty() && self.unknown_categories.is_empty()
    }
}

/// Result of [`aggregate_snapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotAggregate {
    pub totals_by_org: Vec<OrgTotals>,
    pub totals_by_org_and_size: SizePivot,
    pub anomalies: Anomalies,
}

impl SnapshotAggregate {
    /// Grand total for an organization, zero if unknown or empty.
    pub fn per_organization_grand_total(&self, organization: &str) -> u64 {
        self.totals_by_org
            .iter()
            .find(|t| t.organization == organization)
            .map(|t| t.grand_total)
            .unwrap_or(0)
    }

    /// Sum of every organization's grand total.
    pub fn total_quantity(&self) -> u64 {
        self.totals_by_org
            .iter()
            .fold(0u64, |acc, t| acc.saturating_add(t.grand_total))
    }

    /// Every category column a table should show: roster categories in
    /// order, then unknown ones.
    pub fn category_columns(&self, roster: &Roster) -> Vec<String> {
        let mut columns = roster.categories.clone();
        columns.extend(self.anomalies.unknown_categories.iter().cloned());
        columns
    }
}

/// Aggregate a stock snapshot against the roster.
pub fn aggregate_snapshot(records: &[StockRecord], roster: &Roster) -> SnapshotAggregate {
    let mut totals: BTreeMap<String, OrgTotals> = roster
        .organizations
        .iter()
        .map(|org| (org.clone(), OrgTotals::empty(org, roster)))
        .collect();
    let mut cells: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();
    let mut sizes: BTreeSet<String> = BTreeSet::new();
    let mut anomalies = Anomalies::default();

    for record in records {
        if !roster.knows_organization(&record.organization) {
            anomalies
                .unknown_organizations
                .insert(record.organization.clone());
        }
        if !roster.knows_category(&record.category) {
            anomalies.unknown_categories.insert(record.category.clone());
        }

        let org_totals = totals
            .entry(record.organization.clone())
            .or_insert_with(|| OrgTotals::empty(&record.organization, roster));
        let by_category = org_totals
            .by_category
            .entry(record.category.clone())
            .or_insert(0);
        *by_category = by_category.saturating_add(record.quantity);
        org_totals.grand_total = org_totals.grand_total.saturating_add(record.quantity);

        let cell = cells
            .entry(record.organization.clone())
            .or_default()
            .entry(record.size.clone())
            .or_insert(0);
        *cell = cell.saturating_add(record.quantity);
        sizes.insert(record.size.clone());
    }

    let order = roster.order_organizations(totals.keys());
    let totals_by_org = order
        .iter()
        .filter_map(|org| totals.remove(org))
        .collect();

    let pivot = SizePivot {
        organizations: roster.order_organizations(cells.keys()),
        sizes: sort_sizes(sizes),
        cells,
    };

    SnapshotAggregate {
        totals_by_org,
        totals_by_org_and_size: pivot,
        anomalies,
    }
}

/// Numeric sizes ascending by value, then the rest lexicographically.
pub fn sort_sizes<I: IntoIterator<Item = String>>(sizes: I) -> Vec<String> {
    let mut numeric: Vec<(i64, String)> = Vec::new();
    let mut other: Vec<String> = Vec::new();

    for size in sizes {
        match size.trim().parse::<i64>() {
            Ok(n) => numeric.push((n, size)),
            Err(_) => other.push(size),
        }
    }

    numeric.sort();
    other.sort();

    numeric
        .into_iter()
        .map(|(_, size)| size)
        .chain(other)
        .collect()
}

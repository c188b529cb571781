//! Filtered, newest-first view of the ledger for the transaction list.

use crate::analysis::DateWindow;
use crate::models::{TransactionRecord, TxType};
use std::cmp::Ordering;

/// Filters offered by the transaction list. `None` means "any".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub organization: Option<String>,
    pub category: Option<String>,
    pub kind: Option<TxType>,
    pub window: DateWindow,
}

impl TransactionFilter {
    pub fn matches(&self, record: &TransactionRecord) -> bool {
        if let Some(ref org) = self.organization {
            if &record.organization != org {
                return false;
            }
        }
        if let Some(ref category) = self.category {
            if &record.category != category {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if record.kind != kind {
                return false;
            }
        }
        if self.window.is_unbounded() {
            return true;
        }
        record
            .date()
            .map_or(false, |date| self.window.contains(date))
    }
}

/// Newest rows first; rows with unreadable timestamps go last.
fn newest_first(a: &TransactionRecord, b: &TransactionRecord) -> Ordering {
    match (a.created_at, b.created_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| b.id.cmp(&a.id))
}

/// Up to `limit` rows matching `filter`, newest first.
pub fn recent_transactions<'a>(
    records: &'a [TransactionRecord],
    filter: &TransactionFilter,
    limit: usize,
) -> Vec<&'a TransactionRecord> {
    let mut matching: Vec<&TransactionRecord> =
        records.iter().filter(|r| filter.matches(r)).collect();
    matching.sort_by(|a, b| newest_first(a, b));
    matching.truncate(limit);
    matching
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate};

    fn tx(id: i64, org: &str, kind: TxType, created_at: Option<&str>) -> TransactionRecord {
        TransactionRecord {
            id,
            organization: org.to_string(),
            category: if id % 2 == 0 { "kids" } else { "adults" }.to_string(),
            size: "30".to_string(),
            quantity: 1,
            kind,
            reason: None,
            user_name: Some("ops".to_string()),
            created_at: created_at.map(|s| DateTime::parse_from_rfc3339(s).unwrap()),
        }
    }

    fn ledger() -> Vec<TransactionRecord> {
        vec![
            tx(1, "Bosch", TxType::In, Some("2024-03-01T10:00:00+00:00")),
            tx(2, "TDK", TxType::Out, Some("2024-03-03T10:00:00+00:00")),
            tx(3, "Bosch", TxType::Out, None),
            tx(4, "Bosch", TxType::Out, Some("2024-03-03T10:00:00+00:00")),
            tx(5, "Warehouse", TxType::In, Some("2024-02-20T10:00:00+00:00")),
        ]
    }

    fn ids(rows: &[&TransactionRecord]) -> Vec<i64> {
        rows.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_newest_first_with_undated_last() {
        let records = ledger();
        let rows = recent_transactions(&records, &TransactionFilter::default(), 10);

        assert_eq!(ids(&rows), vec![4, 2, 1, 5, 3]);
    }

    #[test]
    fn test_limit() {
        let records = ledger();
        let rows = recent_transactions(&records, &TransactionFilter::default(), 2);

        assert_eq!(ids(&rows), vec![4, 2]);
    }

    #[test]
    fn test_filter_by_organization_and_type() {
        let records = ledger();
        let filter = TransactionFilter {
            organization: Some("Bosch".to_string()),
            kind: Some(TxType::Out),
            ..TransactionFilter::default()
        };

        let rows = recent_transactions(&records, &filter, 10);

        assert_eq!(ids(&rows), vec![4, 3]);
    }

    #[test]
    fn test_filter_by_category() {
        let records = ledger();
        let filter = TransactionFilter {
            category: Some("kids".to_string()),
            ..TransactionFilter::default()
        };

        let rows = recent_transactions(&records, &filter, 10);

        assert_eq!(ids(&rows), vec![4, 2]);
    }

    #[test]
    fn test_window_drops_undated_rows() {
        let records = ledger();
        let filter = TransactionFilter {
            window: DateWindow::new(NaiveDate::from_ymd_opt(2024, 3, 1), None),
            ..TransactionFilter::default()
        };

        let rows = recent_transactions(&records, &filter, 10);

        assert_eq!(ids(&rows), vec![4, 2, 1]);
    }
}

//! Raw row shapes as the data store sends them, and their coercion into
//! typed records.
//!
//! The hosted store returns loosely typed JSON: quantities may arrive as
//! strings or nulls, timestamps in several textual forms. Everything is
//! normalised here once so the analysis code only sees typed values.

use crate::models::{StockRecord, TransactionRecord, TxType};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// A stock row before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStockRow {
    #[serde(default)]
    pub organization: Value,
    #[serde(default)]
    pub category: Value,
    #[serde(default)]
    pub size: Value,
    #[serde(default)]
    pub quantity: Value,
    #[serde(default)]
    pub updated_at: Value,
}

/// A ledger row before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTransactionRow {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub organization: Value,
    #[serde(default)]
    pub category: Value,
    #[serde(default)]
    pub size: Value,
    #[serde(default)]
    pub quantity: Value,
    #[serde(rename = "type", default)]
    pub kind: Value,
    #[serde(default)]
    pub reason: Value,
    #[serde(default)]
    pub user_name: Value,
    #[serde(default)]
    pub created_at: Value,
}

/// Largest quantity accepted from the store. Larger values are malformed.
pub const MAX_QUANTITY: u64 = i64::MAX as u64;

/// Coerce a quantity to a non-negative integer. Anything unusable, including
/// values above [`MAX_QUANTITY`], is zero.
pub fn coerce_quantity(value: &Value) -> u64 {
    let quantity = match value {
        Value::Number(n) => match n.as_u64() {
            Some(u) => Some(u),
            None => n.as_f64().and_then(whole_units),
        },
        Value::String(s) => {
            let s = s.trim();
            match s.parse::<u64>() {
                Ok(u) => Some(u),
                Err(_) => s.parse::<f64>().ok().and_then(whole_units),
            }
        }
        _ => None,
    };

    match quantity {
        Some(q) if q <= MAX_QUANTITY => q,
        Some(q) => {
            warn!("Quantity {} is out of range, counting it as 0", q);
            0
        }
        None => 0,
    }
}

fn whole_units(f: f64) -> Option<u64> {
    if f.is_finite() && f > 0.0 && f < MAX_QUANTITY as f64 {
        Some(f.trunc() as u64)
    } else if f.is_finite() && f > 0.0 {
        warn!("Quantity {} is out of range, counting it as 0", f);
        Some(0)
    } else {
        None
    }
}

/// Parse a timestamp in any of the forms the store produces.
///
/// Naive date-times and bare dates are read as UTC.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<FixedOffset>> {
    let text = value.as_str()?.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts);
    }

    // Postgres text output: "2024-03-01 10:00:00.123456+00" or "+05:30"
    for format in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"] {
        if let Ok(ts) = DateTime::parse_from_str(text, format) {
            return Some(ts);
        }
    }

    let utc = FixedOffset::east_opt(0)?;
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return utc.from_local_datetime(&naive).single();
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive).fixed_offset())
}

/// Text columns keep their textual form; numbers and booleans are
/// stringified, anything else is treated as missing.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn label(value: &Value) -> String {
    text(value).unwrap_or_default()
}

fn non_empty(value: &Value) -> Option<String> {
    text(value).filter(|s| !s.is_empty())
}

impl From<RawStockRow> for StockRecord {
    fn from(raw: RawStockRow) -> Self {
        Self {
            organization: label(&raw.organization),
            category: label(&raw.category),
            size: label(&raw.size),
            quantity: coerce_quantity(&raw.quantity),
            updated_at: parse_timestamp(&raw.updated_at),
        }
    }
}

impl RawTransactionRow {
    /// Convert into a typed record. Returns `None` when the row has no
    /// recognizable direction and so cannot contribute to any view.
    pub fn into_record(self) -> Option<TransactionRecord> {
        let kind = match &self.kind {
            Value::String(s) => match s.parse::<TxType>() {
                Ok(kind) => kind,
                Err(e) => {
                    warn!("Dropping ledger row {}: {}", self.id, e);
                    return None;
                }
            },
            Value::Null => {
                warn!("Dropping ledger row {}: missing type", self.id);
                return None;
            }
            other => {
                warn!("Dropping ledger row {}: unknown transaction type {}", self.id, other);
                return None;
            }
        };

        let id = match &self.id {
            Value::Number(n) => n.as_i64().unwrap_or(0),
            Value::String(s) => s.trim().parse().unwrap_or(0),
            _ => 0,
        };

        Some(TransactionRecord {
            id,
            organization: label(&self.organization),
            category: label(&self.category),
            size: label(&self.size),
            quantity: coerce_quantity(&self.quantity),
            kind,
            reason: non_empty(&self.reason),
            user_name: non_empty(&self.user_name),
            created_at: parse_timestamp(&self.created_at),
        })
    }
}

/// Convert raw stock rows. Never fails.
pub fn stock_records(rows: Vec<RawStockRow>) -> Vec<StockRecord> {
    rows.into_iter().map(StockRecord::from).collect()
}

/// Convert raw ledger rows, returning the records and how many were
/// rejected.
pub fn transaction_records(rows: Vec<RawTransactionRow>) -> (Vec<TransactionRecord>, usize) {
    let total = rows.len();
    let records: Vec<TransactionRecord> = rows
        .into_iter()
        .filter_map(RawTransactionRow::into_record)
        .collect();
    let rejected = total - records.len();
    (records, rejected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_quantity() {
        assert_eq!(coerce_quantity(&json!(12)), 12);
        assert_eq!(coerce_quantity(&json!(" 7 ")), 7);
        assert_eq!(coerce_quantity(&json!(3.9)), 3);
        assert_eq!(coerce_quantity(&json!("4.0")), 4);
        assert_eq!(coerce_quantity(&json!(-5)), 0);
        assert_eq!(coerce_quantity(&json!("-5")), 0);
        assert_eq!(coerce_quantity(&json!("ten")), 0);
        assert_eq!(coerce_quantity(&json!("NaN")), 0);
        assert_eq!(coerce_quantity(&json!(null)), 0);
        assert_eq!(coerce_quantity(&json!(true)), 0);
        assert_eq!(coerce_quantity(&Value::Null), 0);
    }

    #[test]
    fn test_parse_timestamp_forms() {
        let date = |v: Value| parse_timestamp(&v).map(|ts| ts.date_naive().to_string());

        assert_eq!(
            date(json!("2024-03-01T10:00:00+05:30")),
            Some("2024-03-01".to_string())
        );
        assert_eq!(
            date(json!("2024-03-01 10:00:00.123456+00")),
            Some("2024-03-01".to_string())
        );
        assert_eq!(
            date(json!("2024-03-01T10:00:00.5")),
            Some("2024-03-01".to_string())
        );
        assert_eq!(date(json!("2024-03-01")), Some("2024-03-01".to_string()));
        assert_eq!(date(json!("yesterday")), None);
        assert_eq!(date(json!("")), None);
        assert_eq!(date(json!(1709287200)), None);
        assert_eq!(date(Value::Null), None);
    }

    #[test]
    fn test_stock_row_conversion() {
        let raw: RawStockRow = serde_json::from_value(json!({
            "organization": "Bosch",
            "category": "adults",
            "size": 36,
            "quantity": "5",
            "updated_at": "2024-03-01T10:00:00Z"
        }))
        .unwrap();

        let record = StockRecord::from(raw);
        assert_eq!(record.organization, "Bosch");
        assert_eq!(record.size, "36");
        assert_eq!(record.quantity, 5);
        assert!(record.updated_at.is_some());
    }

    #[test]
    fn test_stock_row_missing_fields() {
        let raw: RawStockRow = serde_json::from_value(json!({})).unwrap();
        let record = StockRecord::from(raw);

        assert_eq!(record.organization, "");
        assert_eq!(record.quantity, 0);
        assert!(record.updated_at.is_none());
    }

    #[test]
    fn test_transaction_row_conversion() {
        let raw: RawTransactionRow = serde_json::from_value(json!({
            "id": 42,
            "organization": "TDK",
            "category": "kids",
            "size": "28",
            "quantity": null,
            "type": "OUT",
            "reason": "   ",
            "user_name": "asha",
            "created_at": "not a date"
        }))
        .unwrap();

        let record = raw.into_record().unwrap();
        assert_eq!(record.id, 42);
        assert_eq!(record.kind, TxType::Out);
        assert_eq!(record.quantity, 0);
        assert_eq!(record.reason, None);
        assert_eq!(record.user_name.as_deref(), Some("asha"));
        assert_eq!(record.created_at, None);
    }

    #[test]
    fn test_rows_without_direction_are_rejected() {
        let rows: Vec<RawTransactionRow> = serde_json::from_value(json!([
            {"id": 1, "organization": "TDK", "type": "in", "quantity": 2},
            {"id": 2, "organization": "TDK", "type": "transfer", "quantity": 2},
            {"id": 3, "organization": "TDK", "quantity": 2}
        ]))
        .unwrap();

        let (records, rejected) = transaction_records(rows);
        assert_eq!(records.len(), 1);
        assert_eq!(rejected, 2);
    }

    #[test]
    fn test_out_of_range_quantities_count_as_zero() {
        assert_eq!(coerce_quantity(&json!("1e30")), 0);
        assert_eq!(coerce_quantity(&json!(1e30)), 0);
        assert_eq!(coerce_quantity(&json!(u64::MAX)), 0);
        assert_eq!(coerce_quantity(&json!("18446744073709551615")), 0);
        assert_eq!(coerce_quantity(&json!(MAX_QUANTITY)), MAX_QUANTITY);
        assert_eq!(coerce_quantity(&json!("1e3")), 1000);
    }

    #[test]
    fn test_wrong_typed_text_columns_keep_the_table() {
        let rows: Vec<RawTransactionRow> = serde_json::from_value(json!([
            {"id": 1, "organization": "TDK", "type": "out", "quantity": 3, "reason": 404},
            {"id": 2, "organization": 7, "category": ["kids"], "type": "in", "quantity": 2,
             "user_name": {"name": "asha"}},
            {"id": 3, "organization": "TDK", "type": 1, "quantity": 2}
        ]))
        .unwrap();

        let (records, rejected) = transaction_records(rows);
        assert_eq!(records.len(), 2);
        assert_eq!(rejected, 1);

        assert_eq!(records[0].reason.as_deref(), Some("404"));
        assert_eq!(records[1].organization, "7");
        assert_eq!(records[1].category, "");
        assert_eq!(records[1].user_name, None);
    }

    #[test]
    fn test_stock_row_with_numeric_labels() {
        let rows: Vec<RawStockRow> = serde_json::from_value(json!([
            {"organization": 12, "category": null, "size": 30, "quantity": 4},
            {"organization": "Bosch", "category": "kids", "size": "26", "quantity": 1}
        ]))
        .unwrap();

        let records = stock_records(rows);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].organization, "12");
        assert_eq!(records[0].category, "");
        assert_eq!(records[0].size, "30");
    }

    #[test]
    fn test_oversized_quantity_does_not_disturb_totals() {
        use crate::analysis::{analyze_ledger, DateWindow};

        let rows: Vec<RawTransactionRow> = serde_json::from_value(json!([
            {"id": 1, "organization": "Bosch", "type": "in", "quantity": "1e30",
             "created_at": "2024-03-01T10:00:00Z"},
            {"id": 2, "organization": "Bosch", "type": "in", "quantity": 5,
             "created_at": "2024-03-01T11:00:00Z"}
        ]))
        .unwrap();

        let (records, rejected) = transaction_records(rows);
        assert_eq!(rejected, 0);

        let analysis = analyze_ledger(&records, DateWindow::default());
        assert_eq!(analysis.total_in(), 5);
        assert_eq!(analysis.movement_totals("Bosch").net, 5);
    }
}

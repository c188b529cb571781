//! Transaction ledger analysis.
//!
//! Reduces the append-only ledger into per-organization movement totals,
//! a daily in/out series, and a ranking of dispatch reasons, all within an
//! optional inclusive date window. All-time totals ignore the window.

use crate::models::{Roster, TransactionRecord, TxType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Label used for outbound rows that carry no reason.
pub const NO_REASON_LABEL: &str = "No reason";

/// Number of reasons shown when the caller does not ask for a count.
pub const DEFAULT_TOP_REASONS: usize = 12;

/// Inclusive date window. A missing bound leaves that side open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// Returns true if the date falls within both bounds.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }

    /// True when `end` is before `start`; such a window matches nothing.
    pub fn is_inverted(&self) -> bool {
        matches!((self.start, self.end), (Some(start), Some(end)) if end < start)
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.end) {
            (None, None) => write!(f, "all time"),
            (Some(start), None) => write!(f, "from {}", start),
            (None, Some(end)) => write!(f, "until {}", end),
            (Some(start), Some(end)) => write!(f, "{} to {}", start, end),
        }
    }
}

/// Inbound and outbound quantity for one organization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub in_qty: u64,
    pub out_qty: u64,
    pub net: i64,
}

impl Movement {
    fn add(&mut self, kind: TxType, quantity: u64) {
        match kind {
            TxType::In => self.in_qty = self.in_qty.saturating_add(quantity),
            TxType::Out => self.out_qty = self.out_qty.saturating_add(quantity),
        }
        self.net = signed(self.in_qty).saturating_sub(signed(self.out_qty));
    }
}

/// A quantity as a signed value, clamped at `i64::MAX`.
pub fn signed(quantity: u64) -> i64 {
    i64::try_from(quantity).unwrap_or(i64::MAX)
}

/// One day of the in/out series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub in_qty: u64,
    pub out_qty: u64,
}

/// Summed outbound quantity for one reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonTotal {
    pub reason: String,
    pub quantity: u64,
}

/// Result of [`analyze_ledger`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerAnalysis {
    pub window: DateWindow,
    movements: BTreeMap<String, Movement>,
    all_time: BTreeMap<String, Movement>,
    daily: Vec<DailyPoint>,
    /// Every reason in the window, already ranked. Reports carry their own
    /// cut of this list.
    #[serde(skip)]
    reasons: Vec<ReasonTotal>,
    total_in: u64,
    total_out: u64,
    windowed_in: u64,
    windowed_out: u64,
    /// Rows whose timestamp could not be read.
    pub undated_rows: usize,
}

impl LedgerAnalysis {
    /// Movement totals for one organization within the window.
    pub fn movement_totals(&self, organization: &str) -> Movement {
        self.movements
            .get(organization)
            .copied()
            .unwrap_or_default()
    }

    /// Movement totals for one organization over the whole ledger,
    /// including rows with unreadable timestamps.
    pub fn all_time_totals(&self, organization: &str) -> Movement {
        self.all_time.get(organization).copied().unwrap_or_default()
    }

    /// Roster organizations (zero-filled) followed by any other
    /// organization with activity in the window.
    pub fn movements(&self, roster: &Roster) -> Vec<(String, Movement)> {
        let names = roster
            .organizations
            .iter()
            .chain(self.movements.keys());

        roster
            .order_organizations(names)
            .into_iter()
            .map(|org| {
                let movement = self.movement_totals(&org);
                (org, movement)
            })
            .collect()
    }

    pub fn daily_series(&self) -> &[DailyPoint] {
        &self.daily
    }

    /// At most `n` outbound reasons ranked by quantity.
    pub fn top_reasons(&self, n: usize) -> Vec<ReasonTotal> {
        self.reasons.iter().take(n).cloned().collect()
    }

    /// All-time inbound quantity, ignoring the window.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// All-time outbound quantity, ignoring the window.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    pub fn windowed_in(&self) -> u64 {
        self.windowed_in
    }

    pub fn windowed_out(&self) -> u64 {
        self.windowed_out
    }

    /// `(in, out)` either within the window or all-time.
    pub fn totals(&self, windowed: bool) -> (u64, u64) {
        if windowed {
            (self.windowed_in, self.windowed_out)
        } else {
            (self.total_in, self.total_out)
        }
    }
}

/// Analyze the ledger within `window`.
pub fn analyze_ledger(records: &[TransactionRecord], window: DateWindow) -> LedgerAnalysis {
    let mut analysis = LedgerAnalysis {
        window,
        ..LedgerAnalysis::default()
    };
    let mut daily: BTreeMap<NaiveDate, (u64, u64)> = BTreeMap::new();
    let mut reasons: BTreeMap<String, u64> = BTreeMap::new();

    for record in records {
        match record.kind {
            TxType::In => analysis.total_in = analysis.total_in.saturating_add(record.quantity),
            TxType::Out => {
                analysis.total_out = analysis.total_out.saturating_add(record.quantity)
            }
        }
        analysis
            .all_time
            .entry(record.organization.clone())
            .or_default()
            .add(record.kind, record.quantity);

        let date = match record.date() {
            Some(date) => date,
            None => {
                analysis.undated_rows += 1;
                continue;
            }
        };

        if !window.contains(date) {
            continue;
        }

        analysis
            .movements
            .entry(record.organization.clone())
            .or_default()
            .add(record.kind, record.quantity);

        let day = daily.entry(date).or_insert((0, 0));
        match record.kind {
            TxType::In => {
                day.0 = day.0.saturating_add(record.quantity);
                analysis.windowed_in = analysis.windowed_in.saturating_add(record.quantity);
            }
            TxType::Out => {
                day.1 = day.1.saturating_add(record.quantity);
                analysis.windowed_out = analysis.windowed_out.saturating_add(record.quantity);

                let label = match record.reason.as_deref().map(str::trim) {
                    Some(reason) if !reason.is_empty() => reason.to_string(),
                    _ => NO_REASON_LABEL.to_string(),
                };
                let total = reasons.entry(label).or_insert(0);
                *total = total.saturating_add(record.quantity);
            }
        }
    }

    analysis.daily = daily
        .into_iter()
        .map(|(date, (in_qty, out_qty))| DailyPoint {
            date,
            in_qty,
            out_qty,
        })
        .collect();

    // BTreeMap iteration is lexicographic, so the stable sort leaves ties in
    // label order.
    let mut ranked: Vec<ReasonTotal> = reasons
        .into_iter()
        .map(|(reason, quantity)| ReasonTotal { reason, quantity })
        .collect();
    ranked.sort_by_key(|r| std::cmp::Reverse(r.quantity));
    analysis.reasons = ranked;

    analysis
}

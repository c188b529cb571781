//! Markdown and JSON report generation.
//!
//! This module renders the derived views of a [`Report`] as a Markdown
//! dashboard or as pretty-printed JSON.

use crate::analysis::{DashboardKpis, LedgerAnalysis, ReasonTotal, SnapshotAggregate};
use crate::cli::OutputFormat;
use crate::models::{Report, ReportMetadata, Roster, TransactionRecord};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("# Stock Distribution Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_kpi_section(&report.kpis));
    output.push_str(&generate_stock_section(&report.snapshot, &report.roster));
    output.push_str(&generate_size_pivot_section(&report.snapshot));
    output.push_str(&generate_movement_section(&report.ledger, &report.roster));
    output.push_str(&generate_daily_section(&report.ledger));
    output.push_str(&generate_reasons_section(&report.top_reasons));
    output.push_str(&generate_transactions_section(&report.recent_transactions));
    output.push_str(&generate_anomalies_section(report));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Ledger Window:** {}\n", metadata.window));
    section.push_str(&format!("- **Stock Rows:** {}\n", metadata.stock_rows));
    section.push_str(&format!("- **Ledger Rows:** {}\n", metadata.ledger_rows));
    if metadata.rejected_rows > 0 {
        section.push_str(&format!(
            "- **Rejected Rows:** {}\n",
            metadata.rejected_rows
        ));
    }
    section.push_str(&format!(
        "- **Duration:** {:.2}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the headline tiles.
fn generate_kpi_section(kpis: &DashboardKpis) -> String {
    let mut section = String::new();

    section.push_str("## Overview\n\n");
    section.push_str("| 📦 Purchased | 🚚 Consumed | 🏬 Remaining |\n");
    section.push_str("|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| **{}** | **{}** | **{}** |\n",
        kpis.purchased, kpis.consumed, kpis.remaining
    ));
    section.push_str("| Supplier → Warehouse | Distributed out | Available in Warehouse |\n\n");

    let scope = if kpis.windowed {
        "within the ledger window"
    } else {
        "all-time"
    };
    section.push_str(&format!(
        "*Consumed counted as {} ({}).*\n\n",
        kpis.consumed_definition, scope
    ));

    if kpis.definitions_diverge() {
        section.push_str(&format!(
            "> ⚠️ Counting consumed stock as {} gives **{}** instead of {}.\n\n",
            kpis.consumed_definition.other(),
            kpis.alternate_consumed,
            kpis.consumed
        ));
    }

    let rec = &kpis.reconciliation;
    if rec.drift == 0 {
        section.push_str("✅ Purchased − consumed matches warehouse stock.\n\n");
    } else {
        section.push_str(&format!(
            "> ⚠️ Purchased − consumed is {} but the warehouse holds {} (drift {:+}).\n\n",
            rec.expected_remaining, rec.actual_remaining, rec.drift
        ));
    }

    section
}

/// Generate the stock-by-organization table.
fn generate_stock_section(snapshot: &SnapshotAggregate, roster: &Roster) -> String {
    let mut section = String::new();
    let columns = snapshot.category_columns(roster);

    section.push_str("## Stock by Organization\n\n");

    section.push_str("| Organization |");
    for column in &columns {
        section.push_str(&format!(" {} |", cell(column)));
    }
    section.push_str(" **Total** |\n");

    section.push_str("|:---|");
    for _ in &columns {
        section.push_str(":---:|");
    }
    section.push_str(":---:|\n");

    for totals in &snapshot.totals_by_org {
        section.push_str(&format!("| {} |", cell(&totals.organization)));
        for column in &columns {
            section.push_str(&format!(" {} |", totals.category(column)));
        }
        section.push_str(&format!(" **{}** |\n", totals.grand_total));
    }
    section.push('\n');

    section
}

/// Generate the organization × size pivot.
fn generate_size_pivot_section(snapshot: &SnapshotAggregate) -> String {
    let pivot = &snapshot.totals_by_org_and_size;
    let mut section = String::new();

    section.push_str("## Stock by Size\n\n");

    if pivot.organizations.is_empty() {
        section.push_str("No stock data available.\n\n");
        return section;
    }

    section.push_str("| Organization |");
    for size in &pivot.sizes {
        section.push_str(&format!(" {} |", cell(size)));
    }
    section.push('\n');

    section.push_str("|:---|");
    for _ in &pivot.sizes {
        section.push_str(":---:|");
    }
    section.push('\n');

    for org in &pivot.organizations {
        section.push_str(&format!("| {} |", cell(org)));
        for size in &pivot.sizes {
            section.push_str(&format!(" {} |", pivot.get(org, size)));
        }
        section.push('\n');
    }
    section.push('\n');

    section
}

/// Generate the per-organization movement table for the window.
fn generate_movement_section(ledger: &LedgerAnalysis, roster: &Roster) -> String {
    let mut section = String::new();

    section.push_str(&format!("## Movement ({})\n\n", ledger.window));
    section.push_str("| Organization | In | Out | Net |\n");
    section.push_str("|:---|:---:|:---:|:---:|\n");

    for (org, movement) in ledger.movements(roster) {
        section.push_str(&format!(
            "| {} | {} | {} | {:+} |\n",
            cell(&org),
            movement.in_qty,
            movement.out_qty,
            movement.net
        ));
    }
    section.push_str(&format!(
        "| **All organizations** | **{}** | **{}** | |\n\n",
        ledger.windowed_in(),
        ledger.windowed_out()
    ));

    section.push_str(&format!(
        "*All-time ledger totals: {} in, {} out.*\n\n",
        ledger.total_in(),
        ledger.total_out()
    ));

    section
}

/// Generate the daily in/out table.
fn generate_daily_section(ledger: &LedgerAnalysis) -> String {
    let mut section = String::new();

    section.push_str("## Daily Movement\n\n");

    let series = ledger.daily_series();
    if series.is_empty() {
        section.push_str("No dated transactions in this window.\n\n");
        return section;
    }

    section.push_str("| Date | In | Out |\n");
    section.push_str("|:---|:---:|:---:|\n");
    for point in series {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            point.date, point.in_qty, point.out_qty
        ));
    }
    section.push('\n');

    section
}

/// Generate the top dispatch reasons table.
fn generate_reasons_section(reasons: &[ReasonTotal]) -> String {
    let mut section = String::new();

    section.push_str("## Top Dispatch Reasons\n\n");

    if reasons.is_empty() {
        section.push_str("No outbound transactions in this window.\n\n");
        return section;
    }

    section.push_str("| # | Reason | Quantity |\n");
    section.push_str("|:---:|:---|:---:|\n");
    for (i, reason) in reasons.iter().enumerate() {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            i + 1,
            cell(&reason.reason),
            reason.quantity
        ));
    }
    section.push('\n');

    section
}

/// Generate the recent transactions table.
fn generate_transactions_section(transactions: &[TransactionRecord]) -> String {
    let mut section = String::new();

    section.push_str("## Recent Transactions\n\n");

    if transactions.is_empty() {
        section.push_str("No transactions match the current filters.\n\n");
        return section;
    }

    section.push_str("| ID | Date | Organization | Category | Size | Type | Qty | Reason | User |\n");
    section.push_str("|:---:|:---|:---|:---|:---:|:---:|:---:|:---|:---|\n");
    for tx in transactions {
        let date = tx
            .created_at
            .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "?".to_string());
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} {} | {} | {} | {} |\n",
            tx.id,
            date,
            cell(&tx.organization),
            cell(&tx.category),
            cell(&tx.size),
            tx.kind.arrow(),
            tx.kind,
            tx.quantity,
            cell(tx.reason.as_deref().unwrap_or("-")),
            cell(tx.user_name.as_deref().unwrap_or("-")),
        ));
    }
    section.push('\n');

    section
}

/// Generate the anomalies section. Empty when there is nothing to flag.
fn generate_anomalies_section(report: &Report) -> String {
    let anomalies = &report.snapshot.anomalies;
    let rejected = report.metadata.rejected_rows;
    let undated = report.ledger.undated_rows;

    if anomalies.is_empty() && rejected == 0 && undated == 0 {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Data Anomalies\n\n");

    if !anomalies.unknown_organizations.is_empty() {
        let names: Vec<_> = anomalies
            .unknown_organizations
            .iter()
            .map(|s| format!("`{}`", s))
            .collect();
        section.push_str(&format!(
            "- Unknown organizations in stock: {}\n",
            names.join(", ")
        ));
    }
    if !anomalies.unknown_categories.is_empty() {
        let names: Vec<_> = anomalies
            .unknown_categories
            .iter()
            .map(|s| format!("`{}`", s))
            .collect();
        section.push_str(&format!(
            "- Unknown categories in stock: {}\n",
            names.join(", ")
        ));
    }
    if rejected > 0 {
        section.push_str(&format!(
            "- {} ledger rows rejected (no usable type)\n",
            rejected
        ));
    }
    if undated > 0 {
        section.push_str(&format!(
            "- {} ledger rows with unreadable timestamps (counted in all-time totals only)\n",
            undated
        ));
    }
    section.push('\n');

    section
}

/// Escape free text for a Markdown table cell.
fn cell(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by stockboard*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Render the report in the requested format.
pub fn render(report: &Report, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => generate_json_report(report),
        OutputFormat::Markdown => Ok(generate_markdown_report(report)),
    }
}

/// Write the report to a file.
pub fn write_report(report: &Report, format: OutputFormat, path: &Path) -> Result<()> {
    let content = render(report, format)?;

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    Ok(())
}

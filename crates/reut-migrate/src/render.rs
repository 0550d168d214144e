//! ASCII rendering of reports.
//!
//! Purely presentational: everything here turns report values into text and
//! never touches the database.

use comfy_table::{presets, Cell, ContentArrangement, Table};

use crate::report::{MigrationReport, StatusReport};

/// Longest cell value rendered in full.
pub const MAX_CELL_WIDTH: usize = 26;

const EMPTY_MESSAGE: &str = "No data to display.";

/// Shortens values longer than [`MAX_CELL_WIDTH`] characters, ending them
/// with `...`.
#[must_use]
pub fn truncate(value: &str) -> String {
    if value.chars().count() <= MAX_CELL_WIDTH {
        return value.to_string();
    }
    let kept: String = value.chars().take(MAX_CELL_WIDTH - 3).collect();
    format!("{kept}...")
}

/// Renders a heading followed by an ASCII table, or by
/// `No data to display.` when there are no rows.
#[must_use]
pub fn render_table(heading: &str, headers: &[&str], rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return format!("{heading}\n{EMPTY_MESSAGE}");
    }

    let mut table = Table::new();
    table
        .load_preset(presets::ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Disabled)
        .set_header(headers.iter().map(|h| Cell::new(*h)));
    for row in rows {
        table.add_row(row.iter().map(|value| Cell::new(truncate(value))));
    }

    format!("{heading}\n{table}")
}

/// Renders the outcome of a migration run.
#[must_use]
pub fn render_run(report: &MigrationReport) -> String {
    let mut sections = Vec::new();

    if report.is_noop() && !report.has_failures() {
        sections.push(format!("Batch {}: nothing to migrate.", report.batch));
    } else {
        let mut rows = Vec::new();
        for table in &report.tables {
            if let Some(error) = &table.error {
                rows.push(vec![
                    table.table.clone(),
                    "-".to_string(),
                    "error".to_string(),
                    error.message.clone(),
                ]);
            }
            for op in &table.operations {
                rows.push(vec![
                    table.table.clone(),
                    op.operation.name(),
                    op.status.as_str().to_string(),
                    op.error
                        .as_ref()
                        .map(|e| e.message.clone())
                        .unwrap_or_default(),
                ]);
            }
        }
        sections.push(render_table(
            &format!("Batch {}", report.batch),
            &["Table", "Operation", "Status", "Error"],
            &rows,
        ));
    }

    if !report.orphans.is_empty() {
        let heading = if report.orphans_dropped {
            "Orphan tables (dropped)"
        } else {
            "Orphan tables (use --drop-orphans to remove)"
        };
        sections.push(render_orphans(heading, &report.orphans));
    }

    sections.join("\n\n")
}

/// Renders a status report: ledger contents, pending operations and
/// orphans.
#[must_use]
pub fn render_status(status: &StatusReport) -> String {
    let mut sections = Vec::new();

    if status.ledger_exists {
        let rows: Vec<Vec<String>> = status
            .records
            .iter()
            .map(|record| {
                vec![
                    record.batch.to_string(),
                    record.name.clone(),
                    record
                        .applied_at
                        .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_default(),
                ]
            })
            .collect();
        sections.push(render_table(
            "Applied migrations",
            &["Batch", "Name", "Applied at"],
            &rows,
        ));
    } else {
        sections.push("Applied migrations\nLedger table not created yet.".to_string());
    }

    let mut rows = Vec::new();
    for plan in &status.pending {
        if let Some(error) = &plan.error {
            rows.push(vec![plan.table.clone(), "error".to_string(), error.message.clone()]);
        }
        for op in &plan.operations {
            rows.push(vec![plan.table.clone(), op.name(), op.sql().to_string()]);
        }
    }
    sections.push(render_table(
        "Pending operations",
        &["Table", "Operation", "SQL"],
        &rows,
    ));

    sections.push(render_orphans("Orphan tables", &status.orphans));
    sections.join("\n\n")
}

fn render_orphans(heading: &str, orphans: &[String]) -> String {
    let rows: Vec<Vec<String>> = orphans.iter().map(|t| vec![t.clone()]).collect();
    render_table(heading, &["Table"], &rows)
}

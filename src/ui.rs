//! Terminal rendering for sync results

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::ProgressBar;
use std::time::Duration;

use crate::core::task::{TaskRunRecord, TaskStatus};
use crate::store::memory::AssetRecord;

/// Creates a new `comfy_table::Table` with standard styling.
fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Spinner shown while a manual sync runs.
pub fn sync_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_message("Syncing NAVs from external sources...");
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

fn styled_status(status: TaskStatus) -> String {
    match status {
        TaskStatus::Success => style("success").green().bold().to_string(),
        TaskStatus::Failed => style("failed").red().bold().to_string(),
        TaskStatus::Running => style("running").yellow().to_string(),
        TaskStatus::Pending => style("pending").dim().to_string(),
    }
}

pub fn render_run_record(record: &TaskRunRecord) -> String {
    let mut lines = vec![format!(
        "Task {}: {} ({} updated, {} retries)",
        record.task_name,
        styled_status(record.status),
        record.items_processed,
        record.retries_attempted,
    )];

    if let Some(message) = &record.error_message {
        lines.push(format!("  {}", style(message).red()));
    }

    lines.join("\n")
}

pub fn render_assets(rows: &[AssetRecord]) -> String {
    let mut table = new_styled_table();
    table.set_header(vec![
        header_cell("Code"),
        header_cell("Name"),
        header_cell("NAV"),
        header_cell("Last synced"),
    ]);

    for row in rows {
        let nav = row.nav.map_or(
            Cell::new("N/A")
                .fg(Color::DarkGrey)
                .set_alignment(CellAlignment::Right),
            |v| Cell::new(v.to_string()).set_alignment(CellAlignment::Right),
        );
        let last_synced = row.last_synced.map_or(
            Cell::new("never").fg(Color::DarkGrey),
            |at| Cell::new(at.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        );

        table.add_row(vec![
            Cell::new(&row.code),
            Cell::new(row.name.as_deref().unwrap_or("-")),
            nav,
            last_synced,
        ]);
    }

    table.to_string()
}

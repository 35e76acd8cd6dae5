pub mod combine;
pub mod config;
pub mod http;
pub mod mine;
pub mod process;
pub mod workflow;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use synmine_core::fmt_num;
use synmine_pmc::WalkSummary;

pub(crate) fn print_summary(title: &str, rows: &[(&str, String)]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new(title).fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    eprintln!("\n{table}");
}

/// Rows shared by the `http` and `workflow` summaries
pub(crate) fn walk_rows(summary: &WalkSummary) -> Vec<(&'static str, String)> {
    let mut rows = vec![
        (
            "Files",
            format!(
                "{}/{} ({} failed)",
                summary.completed_files, summary.total_files, summary.failed_files
            ),
        ),
        ("Articles", fmt_num(summary.total_articles)),
        ("Mentions", fmt_num(summary.total_findings)),
        ("Time", format!("{:.1}s", summary.elapsed.as_secs_f64())),
    ];
    if summary.interrupted {
        rows.push(("Status", "interrupted".to_string()));
    }
    rows
}

//! Config subcommand - show effective settings

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use synmine_core::HttpConfig;

use crate::config::Config;

pub fn show(config: &Config, http: &HttpConfig) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Setting").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    table.add_row(vec![
        "Results CSV",
        &config.output.results.display().to_string(),
    ]);
    table.add_row(vec![
        "Local context size",
        &config.output.context_size.to_string(),
    ]);
    table.add_row(vec!["Workers", &config.scan.workers.to_string()]);
    table.add_row(vec!["Batch size", &config.scan.batch_size.to_string()]);
    table.add_row(vec!["Chunk size", &format!("{} MiB", config.scan.chunk_size_mb)]);
    table.add_row(vec!["Listing URL", &config.http.base_url]);
    table.add_row(vec![
        "Read timeout",
        &format!("{}s", http.read_timeout.as_secs()),
    ]);
    table.add_row(vec!["Max attempts", &http.max_attempts.to_string()]);
    table.add_row(vec![
        "Retry delay",
        &format!("{}s", http.retry_delay.as_secs()),
    ]);
    table.add_row(vec![
        "Tracking file",
        &config.tracking.file.display().to_string(),
    ]);
    table.add_row(vec![
        "Upload store",
        config.upload.dir.as_deref().unwrap_or("not set"),
    ]);

    eprintln!("\n{table}");
}

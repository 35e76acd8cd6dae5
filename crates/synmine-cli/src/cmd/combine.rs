//! Combine subcommand - merge batch CSVs

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use synmine_core::combine_batches;
use synmine_core::fmt_num;

use super::print_summary;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct CombineArgs {
    /// Directory holding the batch files (default: directory of [output] results)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Glob for batch files (default: <results name>.*.csv)
    #[arg(short, long)]
    pub pattern: Option<String>,

    /// Combined output CSV
    #[arg(short, long, default_value = "combined_results.csv")]
    pub output: PathBuf,
}

pub fn run(args: CombineArgs, config: &Config) -> Result<()> {
    let results = &config.output.results;
    let dir = args.dir.unwrap_or_else(|| {
        results
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), PathBuf::from)
    });
    let pattern = args.pattern.unwrap_or_else(|| {
        let name = results.file_name().unwrap_or_default().to_string_lossy();
        format!("{name}.*.csv")
    });

    let stats = combine_batches(&dir, &pattern, &args.output)
        .with_context(|| format!("Failed to combine batches in {}", dir.display()))?;
    let Some(stats) = stats else {
        log::warn!("Nothing to combine");
        return Ok(());
    };

    print_summary(
        "Combine",
        &[
            ("Batch files", stats.batch_files.to_string()),
            (
                "Rows",
                format!(
                    "{} ({} before dedup)",
                    fmt_num(stats.final_rows),
                    fmt_num(stats.total_rows)
                ),
            ),
            ("Unique IDs", fmt_num(stats.unique_identifiers)),
            ("Output", args.output.display().to_string()),
        ],
    );
    Ok(())
}

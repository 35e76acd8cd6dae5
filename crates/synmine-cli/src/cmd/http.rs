//! Http subcommand - walk the open-access listing

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use synmine_core::{HttpConfig, SharedProgress};
use synmine_pmc::{WalkConfig, Walker};

use super::{print_summary, walk_rows};
use crate::config::Config;

/// Corpus walk options shared with the `workflow` subcommand
#[derive(Args, Debug)]
pub struct WalkArgs {
    /// Base URL of the bulk file listing
    #[arg(short, long)]
    pub url: Option<String>,

    /// Cumulative output CSV
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Start at this file or PMC range (e.g. PMC1000000 or a filename)
    #[arg(short, long)]
    pub start_from: Option<String>,

    /// Maximum number of files to process
    #[arg(short, long)]
    pub max_files: Option<usize>,

    /// Number of parallel workers per file
    #[arg(short, long)]
    pub workers: Option<usize>,
}

impl WalkArgs {
    pub fn to_walk_config(&self, config: &Config, http: HttpConfig) -> WalkConfig {
        WalkConfig {
            base_url: self.url.clone().unwrap_or_else(|| config.http.base_url.clone()),
            output: self.output.clone().unwrap_or_else(|| config.output.results.clone()),
            start_from: self.start_from.clone(),
            resume_after: None,
            max_files: self.max_files,
            scan: config.scan.to_scan_config(self.workers),
            http,
        }
    }
}

#[derive(Args, Debug)]
pub struct HttpArgs {
    #[command(flatten)]
    pub walk: WalkArgs,
}

pub fn run(args: HttpArgs, config: &Config, http: HttpConfig, progress: &SharedProgress) -> Result<()> {
    let walk_config = args.walk.to_walk_config(config, http);
    log::info!("Processing files from {}", walk_config.base_url);
    log::info!("  Output: {}", walk_config.output.display());

    let summary = Walker::new(walk_config, progress.clone())?.run()?;
    print_summary("HTTP walk", &walk_rows(&summary));

    if summary.failed_files > 0 {
        anyhow::bail!("{} files failed", summary.failed_files);
    }
    Ok(())
}

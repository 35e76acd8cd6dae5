//! Process subcommand - scan one local bulk XML file

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;

use synmine_core::{SharedProgress, fmt_num, write_findings_csv};
use synmine_pmc::CorpusScanner;

use super::print_summary;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Bulk XML file (.xml or .xml.gz)
    pub file: PathBuf,

    /// Output CSV (default: [output] results from config)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of parallel workers
    #[arg(short, long)]
    pub workers: Option<usize>,
}

pub fn run(args: ProcessArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    if !args.file.is_file() {
        bail!("File does not exist: {}", args.file.display());
    }
    let output = args.output.unwrap_or_else(|| config.output.results.clone());
    let scanner = CorpusScanner::new(config.scan.to_scan_config(args.workers))?;

    let name = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let pb = progress.article_bar(&name, None);
    let result = scanner.scan(&args.file, &pb)?;
    pb.finish_and_clear();

    if result.findings.is_empty() {
        log::warn!("No findings to save");
    } else {
        write_findings_csv(&output, &result.findings)?;
        log::info!(
            "Saved {} findings to {}",
            result.findings.len(),
            output.display()
        );
    }

    let stats = &result.stats;
    print_summary(
        "Process",
        &[
            (
                "Articles",
                format!(
                    "{} of ~{} ({} failed, {} identified)",
                    fmt_num(stats.processed),
                    fmt_num(stats.estimated),
                    stats.failed,
                    fmt_num(stats.identified)
                ),
            ),
            ("Mentions", fmt_num(stats.findings)),
            ("Output", output.display().to_string()),
        ],
    );

    if stats.interrupted {
        bail!("Interrupted before the end of {name}");
    }
    Ok(())
}

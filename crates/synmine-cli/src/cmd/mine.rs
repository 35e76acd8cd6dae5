//! Mine subcommand - scan local documents

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Args, ValueEnum};
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use synmine_core::{MatchConfig, SharedProgress, fmt_num};
use synmine_local::{
    FileSummary, LocalMiner, ResultSet, Summary, save_csv, save_json, summarize,
};

use super::print_summary;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct MineArgs {
    /// File or directory to mine
    pub input: PathBuf,

    /// Output file path
    #[arg(short, long, default_value = "synapse_mining_results.csv")]
    pub output: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "csv")]
    pub format: OutputFormat,

    /// Characters of context around each identifier
    #[arg(long)]
    pub context: Option<usize>,

    /// Report every occurrence instead of the first per document
    #[arg(long)]
    pub no_dedup: bool,

    /// File extensions to process in a directory (comma separated)
    #[arg(short, long, value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Process files one at a time instead of in parallel
    #[arg(long)]
    pub sequential: bool,
}

#[derive(Clone, Copy, ValueEnum, Debug)]
pub enum OutputFormat {
    Csv,
    Json,
}

pub fn run(args: MineArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let miner = LocalMiner::new(MatchConfig {
        context_size: args.context.unwrap_or(config.output.context_size),
        dedup: !args.no_dedup,
    });

    let results = if args.input.is_file() {
        log::info!("Processing file: {}", args.input.display());
        let findings = miner.process_file(&args.input)?;
        let name = args
            .input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = FileSummary::of(&findings);
        print_summary(
            "File",
            &[
                ("Name", name.clone()),
                ("Mentions", fmt_num(file.total_mentions)),
                ("Unique IDs", fmt_num(file.unique_ids)),
            ],
        );
        let mut results = ResultSet::new();
        if !findings.is_empty() {
            results.insert(name, findings);
        }
        results
    } else if args.input.is_dir() {
        log::info!("Processing directory: {}", args.input.display());
        let results = miner
            .with_progress(progress.article_bar("documents", None))
            .process_directory(&args.input, &args.extensions, !args.sequential)?;
        print_mining_summary(&summarize(&results));
        results
    } else {
        bail!("Input path does not exist: {}", args.input.display());
    };

    match args.format {
        OutputFormat::Csv => {
            save_csv(&results, &args.output)?;
        }
        OutputFormat::Json => save_json(&results, &args.output)?,
    }
    Ok(())
}

fn print_mining_summary(summary: &Summary) {
    print_summary(
        "Mining",
        &[
            ("Documents", fmt_num(summary.total_documents_processed)),
            ("Mentions", fmt_num(summary.total_synapse_id_mentions)),
            ("Unique IDs", fmt_num(summary.unique_synapse_ids)),
        ],
    );
    if summary.top_mentioned_ids.is_empty() {
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Top IDs").fg(Color::Cyan),
            Cell::new("Documents").fg(Color::Cyan),
        ]);
    for id in &summary.top_mentioned_ids {
        table.add_row(vec![Cell::new(&id.synapse_id), Cell::new(id.documents)]);
    }
    eprintln!("{table}");
}

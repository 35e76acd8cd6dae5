//! synmine - find Synapse identifiers in scientific articles
//!
//! Mines local documents, single PMC bulk files, or the whole Europe PMC
//! open-access corpus over HTTP, with resumable progress and optional upload
//! of each finished batch.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "synmine")]
#[command(about = "Find Synapse identifiers in scientific articles")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "debug")]
    quiet: bool,

    /// Config file path (default: ./synmine.toml or ~/.config/synmine/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Also append log records to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Read timeout in seconds for stall detection
    #[arg(long, global = true)]
    read_timeout: Option<u64>,

    /// Maximum attempts for transient HTTP failures
    #[arg(long, global = true)]
    max_retries: Option<u32>,
}

#[derive(Subcommand)]
enum Command {
    /// Mine a local document or directory of documents
    Mine(cmd::mine::MineArgs),
    /// Scan one local PMC bulk XML file (.xml or .xml.gz)
    Process(cmd::process::ProcessArgs),
    /// Download and scan bulk files from the open-access listing
    Http(cmd::http::HttpArgs),
    /// Resumable corpus walk with checkpointing and optional upload
    Workflow(cmd::workflow::WorkflowArgs),
    /// Combine per-file batch CSVs into one deduplicated CSV
    Combine(cmd::combine::CombineArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let progress = Arc::new(synmine_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug: progress bars show activity
    //   non-TTY: info unless --debug/--quiet: logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = is_tty.then(|| progress.multi());
    let log_opts = synmine_core::LogOptions {
        quiet: cli.quiet || (is_tty && !cli.debug),
        debug: cli.debug,
        file: cli.log_file.clone(),
    };
    synmine_core::init_logging(&log_opts, multi).context("Failed to initialize logging")?;

    synmine_core::install_signal_handlers().context("Failed to install signal handlers")?;

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    let http = config.http.to_http_config(cli.read_timeout, cli.max_retries);

    match cli.command {
        Command::Mine(args) => cmd::mine::run(args, &config, &progress),
        Command::Process(args) => cmd::process::run(args, &config, &progress),
        Command::Http(args) => cmd::http::run(args, &config, http, &progress),
        Command::Workflow(args) => cmd::workflow::run(args, &config, http, &progress),
        Command::Combine(args) => cmd::combine::run(args, &config),
        Command::Config => {
            cmd::config::show(&config, &http);
            Ok(())
        }
    }
}

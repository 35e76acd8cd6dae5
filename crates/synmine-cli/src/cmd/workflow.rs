//! Workflow subcommand - resumable walk with checkpoint and upload

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use synmine_core::{HttpConfig, SharedProgress};
use synmine_pmc::{DirectoryStore, ProcessingTracker, UploadDestinations, Workflow};

use super::http::WalkArgs;
use super::{print_summary, walk_rows};
use crate::config::Config;

const DEFAULT_FOLDER: &str = "batches";
const DEFAULT_TABLE: &str = "synapse_mentions";

#[derive(Args, Debug)]
pub struct WorkflowArgs {
    #[command(flatten)]
    pub walk: WalkArgs,

    /// Resume-state file (default: [tracking] file from config)
    #[arg(long)]
    pub tracking_file: Option<PathBuf>,

    /// Upload each finished batch into this store directory
    #[arg(long)]
    pub upload_dir: Option<PathBuf>,

    /// Store folder receiving batch files
    #[arg(long)]
    pub folder: Option<String>,

    /// Store table receiving de-duplicated rows
    #[arg(long)]
    pub table: Option<String>,
}

pub fn run(
    args: WorkflowArgs,
    config: &Config,
    http: HttpConfig,
    progress: &SharedProgress,
) -> Result<()> {
    let tracking_file = args
        .tracking_file
        .unwrap_or_else(|| config.tracking.file.clone());
    let tracker = ProcessingTracker::new(tracking_file);
    let mut workflow = Workflow::new(args.walk.to_walk_config(config, http), tracker);

    let upload_dir = args
        .upload_dir
        .or_else(|| config.upload.dir.as_ref().map(PathBuf::from));
    if let Some(dir) = &upload_dir {
        let destinations = UploadDestinations {
            folder: args
                .folder
                .or_else(|| config.upload.folder.clone())
                .unwrap_or_else(|| DEFAULT_FOLDER.to_string()),
            table: args
                .table
                .or_else(|| config.upload.table.clone())
                .unwrap_or_else(|| DEFAULT_TABLE.to_string()),
        };
        log::info!(
            "Uploading batches to {} (folder {}, table {})",
            dir.display(),
            destinations.folder,
            destinations.table
        );
        workflow = workflow.with_uploader(Box::new(DirectoryStore::new(dir)), destinations);
    }

    let summary = workflow.run(progress.clone())?;

    let mut rows = walk_rows(&summary.walk);
    rows.push((
        "Resumed from",
        summary.resumed_from.clone().unwrap_or_else(|| "start".to_string()),
    ));
    rows.push((
        "Checkpoint",
        summary.last_marker.clone().unwrap_or_else(|| "unchanged".to_string()),
    ));
    if upload_dir.is_some() {
        rows.push((
            "Uploads",
            format!(
                "{} ok, {} failed",
                summary.uploaded_batches, summary.failed_uploads
            ),
        ));
    }
    print_summary("Workflow", &rows);

    if summary.walk.failed_files > 0 || summary.failed_uploads > 0 {
        anyhow::bail!(
            "{} files failed, {} uploads failed",
            summary.walk.failed_files,
            summary.failed_uploads
        );
    }
    Ok(())
}

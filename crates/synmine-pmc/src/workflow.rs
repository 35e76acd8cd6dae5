//! Resumable walk with optional upload of each finished batch
//!
//! The tracker is read once at start. After each completed file the marker
//! advances to that file's range start: once the batch is uploaded when an
//! uploader is configured, or once the batch is written otherwise. After a
//! failed file or upload the marker stays put for the rest of the run, so
//! the next run retries from the first unconfirmed file.

use anyhow::Result;

use synmine_core::SharedProgress;

use crate::config::WalkConfig;
use crate::manifest::marker_number;
use crate::tracking::{ProcessingTracker, extract_marker_from_filename};
use crate::upload::{UploadDestinations, UploaderCapability, upload_batch};
use crate::walker::{FileEvent, FileOutcome, WalkSummary, Walker};

/// Workflow execution summary
#[derive(Debug, Clone, Default)]
pub struct WorkflowSummary {
    pub walk: WalkSummary,
    /// Marker read at start
    pub resumed_from: Option<String>,
    /// Marker stored at the end of the run
    pub last_marker: Option<String>,
    pub uploaded_batches: usize,
    pub failed_uploads: usize,
}

pub struct Workflow {
    walk: WalkConfig,
    tracker: ProcessingTracker,
    uploader: Option<(Box<dyn UploaderCapability>, UploadDestinations)>,
}

impl Workflow {
    pub fn new(walk: WalkConfig, tracker: ProcessingTracker) -> Self {
        Self {
            walk,
            tracker,
            uploader: None,
        }
    }

    /// Upload every finished batch to `destinations` before checkpointing it.
    pub fn with_uploader(
        mut self,
        uploader: Box<dyn UploaderCapability>,
        destinations: UploadDestinations,
    ) -> Self {
        self.uploader = Some((uploader, destinations));
        self
    }

    pub fn tracker(&self) -> &ProcessingTracker {
        &self.tracker
    }

    pub fn run(&self, progress: SharedProgress) -> Result<WorkflowSummary> {
        let mut config = self.walk.clone();
        let resumed_from = self.tracker.get_last();

        match (&config.start_from, &resumed_from) {
            (Some(start), _) => log::info!("Explicit start point {start}, ignoring tracking file"),
            (None, Some(marker)) => match marker_number(marker) {
                Some(n) => {
                    log::info!("Resuming after last processed batch {marker}");
                    config.resume_after = Some(n);
                }
                None => log::warn!("Ignoring unrecognized tracking marker {marker:?}"),
            },
            (None, None) => log::info!("No tracking state, starting from the first file"),
        }

        let mut summary = WorkflowSummary {
            resumed_from,
            ..Default::default()
        };
        let mut hold_marker = false;

        let walker = Walker::new(config, progress)?;
        let walk = walker.run_with(|event| {
            let outcome = match event {
                FileEvent::Completed(outcome) => outcome,
                FileEvent::Failed(entry) => {
                    log::warn!("Holding tracking marker: {} failed", entry.filename);
                    hold_marker = true;
                    return;
                }
            };
            if !self.confirm(outcome, &mut summary) {
                hold_marker = true;
            }
            if hold_marker {
                return;
            }
            let Some(marker) = extract_marker_from_filename(&outcome.entry.filename) else {
                return;
            };
            if self.tracker.update(&marker) {
                summary.last_marker = Some(marker);
            }
        })?;
        summary.walk = walk;

        if hold_marker {
            log::warn!("Some files were not confirmed; the next run resumes from the first of them");
        }
        log::info!(
            "Completed batch upload: {} uploaded, {} failed",
            summary.uploaded_batches,
            summary.failed_uploads
        );
        Ok(summary)
    }

    /// Upload the file's batch if an uploader is configured. Returns whether
    /// the file may be checkpointed.
    fn confirm(&self, outcome: &FileOutcome, summary: &mut WorkflowSummary) -> bool {
        let (Some((uploader, destinations)), Some(batch)) = (&self.uploader, &outcome.batch_path)
        else {
            return true;
        };
        if upload_batch(uploader.as_ref(), batch, destinations) {
            summary.uploaded_batches += 1;
            log::info!("Successfully processed batch file: {}", batch.display());
            true
        } else {
            summary.failed_uploads += 1;
            false
        }
    }
}

//! Concurrent fan-out over a work set.

use std::sync::Arc;

use arcgis_export_arcgis::ArcGisClient;
use arcgis_export_arcgis_models::LayerDescriptor;

use crate::options::ExportOptions;
use crate::process::{ProcessingOutcome, process_layer};
use crate::progress::ProgressCallback;
use crate::selection::WorkSet;

/// Aggregate result of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Layers written.
    pub succeeded: usize,
    /// Layers skipped (existing file or no features).
    pub skipped: usize,
    /// Layers that failed.
    pub failed: usize,
    /// Every layer with its outcome, in work-set order.
    pub outcomes: Vec<(LayerDescriptor, ProcessingOutcome)>,
}

impl RunSummary {
    /// Records one outcome.
    pub fn record(&mut self, descriptor: LayerDescriptor, outcome: ProcessingOutcome) {
        match &outcome {
            ProcessingOutcome::Success => self.succeeded += 1,
            ProcessingOutcome::SkippedExisting | ProcessingOutcome::SkippedEmpty => {
                self.skipped += 1;
            }
            ProcessingOutcome::Failed(_) => self.failed += 1,
        }
        self.outcomes.push((descriptor, outcome));
    }

    /// Process exit code: `1` when any layer failed, else `0`.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        if self.failed > 0 { 1 } else { 0 }
    }

    /// One-line summary of the counts.
    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "Processing Complete. {} layers succeeded, {} skipped, {} failed.",
            self.succeeded, self.skipped, self.failed
        )
    }
}

/// Processes every layer of `work` on its own task and waits for all of
/// them.
///
/// A layer failing never affects its siblings. The work set is keyed by
/// [`LayerKey`](arcgis_export_arcgis_models::LayerKey), so each layer is
/// processed at most once.
pub async fn run(
    client: &ArcGisClient,
    work: WorkSet,
    options: &ExportOptions,
    progress: Arc<dyn ProgressCallback>,
) -> RunSummary {
    let total = work.len();
    log::info!("Processing {total} selected layers...");
    progress.set_total(total as u64);

    let handles: Vec<_> = work
        .into_values()
        .map(|descriptor| {
            let client = client.clone();
            let options = options.clone();
            let progress = Arc::clone(&progress);

            tokio::spawn(async move {
                progress.layer_started(&descriptor.name);
                let outcome = process_layer(&client, &descriptor, &options).await;
                progress.layer_finished(&descriptor.name, &outcome);
                (descriptor, outcome)
            })
        })
        .collect();

    let mut summary = RunSummary::default();
    for result in futures::future::join_all(handles).await {
        match result {
            Ok((descriptor, outcome)) => summary.record(descriptor, outcome),
            Err(e) => {
                log::error!("Layer task panicked: {e}");
                summary.failed += 1;
            }
        }
    }

    progress.finish(summary.message());
    summary
}

//! Per-layer processing: fetch, symbolize, encode, write.

use std::fmt;
use std::path::Path;

use arcgis_export_arcgis::{ArcGisClient, ArcGisError};
use arcgis_export_arcgis_models::{LayerDescriptor, synthesized_layer_name};
use arcgis_export_convert::{FeatureSet, Renderer, attach_symbols};

use crate::filename::output_file_name;
use crate::options::{ExistingFilePolicy, ExportOptions};
use crate::symbols::save_renderer_symbols;
use crate::PipelineError;

/// How one layer ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    /// The output file was written.
    Success,
    /// The output file already existed and the policy said skip.
    SkippedExisting,
    /// The layer returned no features.
    SkippedEmpty,
    /// The layer failed.
    Failed(String),
}

impl ProcessingOutcome {
    /// Whether the layer was skipped rather than processed.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::SkippedExisting | Self::SkippedEmpty)
    }
}

impl fmt::Display for ProcessingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::SkippedExisting => f.write_str("skipped existing file"),
            Self::SkippedEmpty => f.write_str("no features found"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Layer name from metadata, then discovery, then `Layer_{id}`.
fn resolve_layer_name(metadata_name: &str, descriptor: &LayerDescriptor) -> String {
    [metadata_name, descriptor.name.as_str()]
        .into_iter()
        .find(|name| !name.is_empty())
        .map_or_else(|| synthesized_layer_name(&descriptor.layer_id), str::to_string)
}

fn io_error(path: &Path, source: std::io::Error) -> PipelineError {
    PipelineError::Io {
        path: path.display().to_string(),
        source,
    }
}

async fn try_process(
    client: &ArcGisClient,
    descriptor: &LayerDescriptor,
    options: &ExportOptions,
) -> Result<ProcessingOutcome, PipelineError> {
    let metadata = client
        .fetch_layer_metadata(&descriptor.service_url, &descriptor.layer_id)
        .await?;
    let layer_name = resolve_layer_name(&metadata.name, descriptor);
    log::info!("Processing layer: {layer_name} (ID: {})", descriptor.layer_id);

    let raw = match client
        .fetch_features(&descriptor.service_url, &descriptor.layer_id)
        .await
    {
        Ok(raw) => raw,
        Err(ArcGisError::NoFeatures { .. }) => return Ok(ProcessingOutcome::SkippedEmpty),
        Err(e) => return Err(e.into()),
    };
    log::info!("Fetched {} features for {layer_name}", raw.len());

    let mut set = FeatureSet::from_raw(layer_name.as_str(), raw);

    if options.include_symbols
        && let Some(definition) = metadata.renderer()
    {
        let mut renderer = Renderer::from_definition(definition);
        if options.save_symbols {
            save_renderer_symbols(
                &mut renderer,
                &options.output_dir,
                &layer_name,
                &descriptor.layer_id,
            )
            .await?;
        }
        attach_symbols(&renderer, &mut set.features);
    }

    let payload = arcgis_export_export::encode(options.format, &set)?;

    let file_name = output_file_name(
        &options.prefix,
        &layer_name,
        &descriptor.layer_id,
        options.format,
    );
    let path = options.output_dir.join(file_name);

    if tokio::fs::try_exists(&path)
        .await
        .map_err(|e| io_error(&path, e))?
    {
        match options.existing {
            ExistingFilePolicy::Skip => {
                log::info!("Skipping existing file: {}", path.display());
                return Ok(ProcessingOutcome::SkippedExisting);
            }
            ExistingFilePolicy::Error => {
                return Err(PipelineError::ExistingFile {
                    path: path.display().to_string(),
                });
            }
            ExistingFilePolicy::Overwrite => {
                log::warn!("Overwriting existing file: {}", path.display());
            }
        }
    }

    tokio::fs::create_dir_all(&options.output_dir)
        .await
        .map_err(|e| io_error(&options.output_dir, e))?;
    tokio::fs::write(&path, payload)
        .await
        .map_err(|e| io_error(&path, e))?;
    log::info!("Wrote {}", path.display());

    Ok(ProcessingOutcome::Success)
}

/// Processes one layer end to end and classifies the result. Errors are
/// folded into [`ProcessingOutcome::Failed`]; they never escape.
pub async fn process_layer(
    client: &ArcGisClient,
    descriptor: &LayerDescriptor,
    options: &ExportOptions,
) -> ProcessingOutcome {
    match try_process(client, descriptor, options).await {
        Ok(outcome) => outcome,
        Err(e) => {
            log::error!("Layer {} failed: {e}", descriptor.key());
            ProcessingOutcome::Failed(e.to_string())
        }
    }
}

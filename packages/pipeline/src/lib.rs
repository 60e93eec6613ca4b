#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Layer selection and the concurrent export pipeline.
//!
//! Discovery produces candidate [`LayerDescriptor`]s. The [`selection`]
//! module turns them into a [`WorkSet`] keyed by [`LayerKey`], and
//! [`run::run`] processes every entry on its own task, classifying each
//! result as a [`ProcessingOutcome`] and aggregating a [`RunSummary`].
//!
//! [`LayerDescriptor`]: arcgis_export_arcgis_models::LayerDescriptor
//! [`LayerKey`]: arcgis_export_arcgis_models::LayerKey

pub mod filename;
pub mod options;
pub mod process;
pub mod progress;
pub mod run;
pub mod selection;
pub mod symbols;

use arcgis_export_arcgis::ArcGisError;
use arcgis_export_export::ExportError;

pub use options::{ExistingFilePolicy, ExportOptions};
pub use process::{ProcessingOutcome, process_layer};
pub use progress::{NullProgress, ProgressCallback, null_progress};
pub use run::{RunSummary, run};
pub use selection::{WorkSet, parse_selection, select_all};

/// Errors that can fail a single layer.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Fetching metadata or features failed.
    #[error(transparent)]
    ArcGis(#[from] ArcGisError),

    /// Encoding the layer failed.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// The output file exists and the policy forbids replacing it.
    #[error("Output file {path} already exists. Use --overwrite or --skip-existing")]
    ExistingFile {
        /// Path of the existing file.
        path: String,
    },

    /// A filesystem operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

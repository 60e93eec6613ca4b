//! Per-run export settings.

use std::path::PathBuf;

use arcgis_export_export::OutputFormat;

/// What to do when an output file already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExistingFilePolicy {
    /// Fail the layer.
    #[default]
    Error,
    /// Leave the file alone and report the layer as skipped.
    Skip,
    /// Replace the file, with a warning.
    Overwrite,
}

impl ExistingFilePolicy {
    /// Maps the `--overwrite` / `--skip-existing` flags. Skip wins when
    /// both are set.
    #[must_use]
    pub const fn from_flags(overwrite: bool, skip_existing: bool) -> Self {
        if skip_existing {
            Self::Skip
        } else if overwrite {
            Self::Overwrite
        } else {
            Self::Error
        }
    }
}

/// Settings shared by every layer of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Output format.
    pub format: OutputFormat,
    /// Directory receiving output files (created on demand).
    pub output_dir: PathBuf,
    /// Prepended to every sanitized file name.
    pub prefix: String,
    /// Existing-file handling.
    pub existing: ExistingFilePolicy,
    /// Attach renderer symbols to features.
    pub include_symbols: bool,
    /// Also write symbol images and metadata under `symbols/`.
    pub save_symbols: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            output_dir: PathBuf::from("."),
            prefix: String::new(),
            existing: ExistingFilePolicy::default(),
            include_symbols: true,
            save_symbols: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_wins_over_overwrite() {
        assert_eq!(ExistingFilePolicy::from_flags(false, false), ExistingFilePolicy::Error);
        assert_eq!(ExistingFilePolicy::from_flags(true, false), ExistingFilePolicy::Overwrite);
        assert_eq!(ExistingFilePolicy::from_flags(false, true), ExistingFilePolicy::Skip);
        assert_eq!(ExistingFilePolicy::from_flags(true, true), ExistingFilePolicy::Skip);
    }
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the `arcgis_export` binary.
//!
//! [`init_logger`] routes `log` output through `indicatif-log-bridge` so log
//! lines print above the progress bar instead of through it.
//! [`LayerProgress`] renders a run's per-layer updates as one bar.

use std::sync::Arc;
use std::time::Duration;

use arcgis_export_pipeline::{ProcessingOutcome, ProgressCallback};
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;

pub use indicatif::MultiProgress;

const LAYER_TEMPLATE: &str = "{spinner:.green} {prefix} {wide_bar:.green/dim} {pos}/{len} [{elapsed_precise}] {msg}";

/// One bar counting exported layers, labelled with the layer in flight.
pub struct LayerProgress {
    bar: ProgressBar,
}

impl LayerProgress {
    /// Adds a layer bar to `multi`. The run sets its length once the work
    /// set is known.
    #[must_use]
    pub fn attach(multi: &MultiProgress, label: &str) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new(0));
        bar.set_style(
            ProgressStyle::with_template(LAYER_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_prefix(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));

        Arc::new(Self { bar })
    }
}

impl ProgressCallback for LayerProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn layer_finished(&self, name: &str, outcome: &ProcessingOutcome) {
        if !matches!(outcome, ProcessingOutcome::Success) {
            self.bar.set_message(format!("{name}: {outcome}"));
        }
        self.bar.inc(1);
    }

    fn finish(&self, msg: String) {
        self.bar.disable_steady_tick();
        self.bar.finish_with_message(msg);
    }
}

/// Installs `pretty_env_logger` behind `indicatif-log-bridge`.
///
/// `RUST_LOG` overrides `default_level` when set. Returns the
/// [`MultiProgress`] every bar must be added to.
#[must_use]
pub fn init_logger(default_level: LevelFilter) -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .filter_level(default_level)
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_err()
    {
        log::debug!("Logger already installed");
    }
    log::set_max_level(level);

    multi
}

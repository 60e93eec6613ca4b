//! Progress reporting for a run.
//!
//! The pipeline reports one unit per finished layer through a
//! [`ProgressCallback`]; the rendering backend (an `indicatif` bar, or
//! nothing at all) is chosen by the caller.

use std::sync::Arc;

use crate::process::ProcessingOutcome;

/// Receives progress updates from a run.
///
/// Implementations must be `Send + Sync` because updates arrive from
/// spawned tokio tasks.
pub trait ProgressCallback: Send + Sync {
    /// Number of layers in the run.
    fn set_total(&self, total: u64);

    /// Advance by `delta` finished layers.
    fn inc(&self, delta: u64);

    /// Update the message shown next to the indicator.
    fn set_message(&self, msg: String);

    /// A layer started processing.
    fn layer_started(&self, name: &str) {
        self.set_message(name.to_string());
    }

    /// A layer reached its final outcome.
    fn layer_finished(&self, name: &str, outcome: &ProcessingOutcome) {
        log::debug!("{name}: {outcome}");
        self.inc(1);
    }

    /// Mark the run complete with a final message.
    fn finish(&self, msg: String);
}

/// A [`ProgressCallback`] that ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn layer_finished(&self, _name: &str, _outcome: &ProcessingOutcome) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}

//! Progress-callback trait for per-stage conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to observe a
//! conversion as it moves through the pipeline stages.
//!
//! # Example
//!
//! ```rust
//! use cheatmark::{ConversionConfig, ConversionProgressCallback, Stage};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct StageCounter {
//!     finished: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for StageCounter {
//!     fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
//!         self.finished.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{stage} done in {elapsed_ms}ms");
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(StageCounter { finished: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::pipeline::Stage;
use std::sync::Arc;

/// Called by the pipeline as it enters and leaves each stage.
///
/// All methods default to no-ops so callers only override what they need.
/// The trait is `Send + Sync` because one config may serve conversions on
/// several threads at once.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once the WorkItem has been allocated.
    fn on_conversion_start(&self, work_id: &str) {
        let _ = work_id;
    }

    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// Called for every non-fatal diagnostic as it is recorded.
    fn on_diagnostic(&self, stage: Stage, message: &str) {
        let _ = (stage, message);
    }

    /// Called once at the end, whether the conversion succeeded or faulted.
    fn on_conversion_complete(&self, succeeded: bool) {
        let _ = succeeded;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ConversionProgressCallback for Recorder {
        fn on_stage_start(&self, stage: Stage) {
            self.events.lock().unwrap().push(format!("start {stage}"));
        }

        fn on_diagnostic(&self, stage: Stage, message: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("diag {stage}: {message}"));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start("abc");
        cb.on_stage_start(Stage::Compile);
        cb.on_stage_complete(Stage::Compile, 12);
        cb.on_diagnostic(Stage::Convert, "warn");
        cb.on_conversion_complete(true);
    }

    #[test]
    fn overridden_methods_receive_events() {
        let rec = Recorder::default();
        rec.on_stage_start(Stage::Assemble);
        rec.on_diagnostic(Stage::Compile, "exit 1");
        rec.on_stage_complete(Stage::Assemble, 3);
        let events = rec.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], "start assemble");
        assert_eq!(events[1], "diag compile: exit 1");
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_stage_start(Stage::Materialize);
    }
}

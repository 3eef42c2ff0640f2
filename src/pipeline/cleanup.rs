//! Workspace reconciliation after a successful compile.
//!
//! Deletes every intermediate file of the WorkItem and leaves only
//! `<base>.pdf` (and `<base>_errors.log`, written afterwards). Files that
//! were never created are skipped silently. A file that exists but cannot be
//! removed is recorded in the [`CleanupReport`]; it never turns a produced
//! PDF into a failed conversion.

use crate::output::CleanupReport;
use crate::pipeline::workspace::WorkItem;
use std::io::ErrorKind;
use tracing::{debug, warn};

/// Remove the WorkItem's intermediates and compiler byproducts.
pub async fn reconcile(work: &WorkItem) -> CleanupReport {
    let mut report = CleanupReport::default();

    for path in work.intermediate_paths() {
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed {}", path.display());
                report.removed.push(path);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!("Could not remove {}: {}", path.display(), e);
                report.failed.push(format!("{}: {}", path.display(), e));
            }
        }
    }

    report
}

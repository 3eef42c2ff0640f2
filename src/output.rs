//! Result types returned by a successful conversion.

use crate::diagnostics::Diagnostics;
use crate::error::CheatmarkError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything a caller needs after a conversion succeeded.
///
/// A conversion succeeds exactly when the PDF exists on disk; `diagnostics`
/// and `cleanup` are advisory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Random identifier of the WorkItem that produced this output.
    pub work_id: String,
    /// Suggested download name, `<base>.pdf`.
    pub file_name: String,
    /// Location of the compiled PDF.
    pub pdf_path: PathBuf,
    /// Non-fatal diagnostics, in the order they were recorded.
    pub diagnostics: Diagnostics,
    /// `<base>_errors.log`, present when `diagnostics` was non-empty and the
    /// log could be written.
    pub error_log: Option<PathBuf>,
    pub cleanup: CleanupReport,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// Read the compiled PDF into memory.
    pub async fn read_pdf(&self) -> Result<Vec<u8>, CheatmarkError> {
        tokio::fs::read(&self.pdf_path)
            .await
            .map_err(|e| CheatmarkError::Io {
                path: self.pdf_path.clone(),
                source: e,
            })
    }

    /// The cleanup failure as a fault, when the reconciler left files behind.
    ///
    /// The PDF is still the authoritative result; this only lets callers that
    /// care surface the leftover files.
    pub fn cleanup_fault(&self) -> Option<CheatmarkError> {
        if self.cleanup.failed.is_empty() {
            None
        } else {
            Some(CheatmarkError::Cleanup {
                failures: self.cleanup.failed.clone(),
            })
        }
    }
}

/// What the Workspace Reconciler removed and what it could not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    /// `"<path>: <reason>"` per file that could not be deleted.
    pub failed: Vec<String>,
    /// True when cleanup was skipped (`keep_intermediates`).
    pub skipped: bool,
}

/// Wall-clock timings of one conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    pub materialize_ms: u64,
    pub convert_ms: u64,
    pub assemble_ms: u64,
    pub compile_ms: u64,
    pub reconcile_ms: u64,
    pub total_ms: u64,
    /// Size of the compiled PDF in bytes.
    pub pdf_bytes: u64,
}

/// Liveness record returned by [`crate::convert::health`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

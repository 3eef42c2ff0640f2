//! Error types for the cheatmark library.
//!
//! Two failure classes exist:
//!
//! * [`CheatmarkError`] — **Fatal**: the pipeline cannot continue (empty
//!   input, missing template, tool timeout, no PDF on disk). Returned as
//!   `Err(CheatmarkError)` from the `convert*` functions. Every fault raised
//!   after the first external tool ran carries the diagnostics gathered so
//!   far, and prints them as part of its message.
//!
//! * [`crate::diagnostics::Diagnostics`] — **Non-fatal**: a tool exited
//!   non-zero but still produced its output, or cleanup was partial. These are
//!   recorded as text and end up in `<base>_errors.log`.
//!
//! [`CheatmarkError::status_code`] maps a fault onto the status an HTTP
//! boundary should report.

use crate::diagnostics::Diagnostics;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the cheatmark library.
#[derive(Debug, Error)]
pub enum CheatmarkError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The Markdown content was empty; nothing was written.
    #[error("Markdown content cannot be empty")]
    EmptyContent,

    /// The workspace could not be created or written (IOFault).
    #[error("Workspace I/O failed for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Tool errors ───────────────────────────────────────────────────────
    /// The external program could not be started at all.
    #[error("Failed to launch {tool} ('{program}'): {source}\nIs it installed and on PATH?")]
    ToolLaunch {
        tool: String,
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The external program exceeded its wall-clock bound and was killed.
    #[error("{tool} timed out after {secs}s{}", .diagnostics.as_suffix())]
    ToolTimeout {
        tool: String,
        secs: u64,
        diagnostics: Diagnostics,
    },

    /// Pandoc finished but left no LaTeX fragment behind.
    #[error("Pandoc did not produce '{path}'{}", .diagnostics.as_suffix())]
    ConverterOutputMissing {
        path: PathBuf,
        diagnostics: Diagnostics,
    },

    // ── Assembly errors ───────────────────────────────────────────────────
    /// Header or footer template file is missing.
    #[error("Template file not found: '{path}'{}", .diagnostics.as_suffix())]
    TemplateNotFound {
        path: PathBuf,
        diagnostics: Diagnostics,
    },

    /// The LaTeX fragment vanished between conversion and assembly.
    #[error("Content file not found: '{path}'{}", .diagnostics.as_suffix())]
    ContentNotFound {
        path: PathBuf,
        diagnostics: Diagnostics,
    },

    /// Any other file-system failure while assembling the document.
    #[error("File operation error: {message}{}", .diagnostics.as_suffix())]
    FileOperation {
        message: String,
        diagnostics: Diagnostics,
    },

    // ── Compile errors ────────────────────────────────────────────────────
    /// The compiler ran but `<base>.pdf` is absent from disk.
    #[error("pdflatex failed to create '{path}'{}", .diagnostics.as_suffix())]
    PdfNotProduced {
        path: PathBuf,
        diagnostics: Diagnostics,
    },

    // ── Reconcile errors ──────────────────────────────────────────────────
    /// Some intermediate files could not be removed. Reported alongside a
    /// successful conversion, never instead of it.
    #[error("Cleanup left {} file(s) behind:\n{}", .failures.len(), .failures.join("\n"))]
    Cleanup { failures: Vec<String> },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not move the finished PDF to its requested destination.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CheatmarkError {
    /// HTTP-style status for the upstream boundary: caller mistakes are 400,
    /// tool and compile failures are 500.
    pub fn status_code(&self) -> u16 {
        match self {
            CheatmarkError::EmptyContent | CheatmarkError::InvalidConfig(_) => 400,
            _ => 500,
        }
    }

    /// Diagnostics attached to the fault, if any were gathered before it.
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            CheatmarkError::ToolTimeout { diagnostics, .. }
            | CheatmarkError::ConverterOutputMissing { diagnostics, .. }
            | CheatmarkError::TemplateNotFound { diagnostics, .. }
            | CheatmarkError::ContentNotFound { diagnostics, .. }
            | CheatmarkError::FileOperation { diagnostics, .. }
            | CheatmarkError::PdfNotProduced { diagnostics, .. } => Some(diagnostics),
            _ => None,
        }
    }
}

//! Non-fatal diagnostics collected across pipeline stages.
//!
//! Tools routinely exit non-zero while still producing a usable file
//! (pdflatex does this for every undefined reference). Such failures are
//! recorded here as plain text instead of aborting the conversion. The list
//! is append-only and keeps insertion order; it never drives control flow.
//!
//! At the end of a conversion a non-empty list is persisted to
//! `<base>_errors.log` next to the PDF (see [`Diagnostics::write_log`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Ordered, append-only sequence of human-readable stage diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<String>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one diagnostic. Entries are never removed or reordered.
    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn entries(&self) -> &[String] {
        &self.0
    }

    /// Text appended to fatal error messages: empty when there is nothing to
    /// report, otherwise a newline-led block listing every entry.
    pub fn as_suffix(&self) -> String {
        if self.0.is_empty() {
            String::new()
        } else {
            format!("\nDiagnostics:\n{}", self)
        }
    }

    /// Write every entry, one per line, to `path`.
    ///
    /// Callers in the pipeline treat a failure here as a secondary warning
    /// only; the conversion outcome never depends on it.
    pub async fn write_log(&self, path: &Path) -> std::io::Result<()> {
        let mut body = String::new();
        for entry in &self.0 {
            body.push_str(entry);
            body.push('\n');
        }
        tokio::fs::write(path, body).await
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{entry}")?;
        }
        Ok(())
    }
}

impl From<Vec<String>> for Diagnostics {
    fn from(entries: Vec<String>) -> Self {
        Self(entries)
    }
}

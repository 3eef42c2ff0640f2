//! WorkItem allocation and input materialisation.
//!
//! Every conversion gets a base name derived from a random UUID, never from
//! request content, so concurrent conversions sharing one workspace root can
//! never touch each other's files. All artifact paths are derived from that
//! base name.

use crate::error::CheatmarkError;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Extensions of auxiliary files pdflatex leaves next to its output.
pub const BYPRODUCT_EXTENSIONS: [&str; 4] = ["aux", "log", "out", "synctex.gz"];

/// The isolated unit of filesystem state for one conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    id: String,
    workspace_dir: PathBuf,
    base_name: String,
}

impl WorkItem {
    /// Allocate a fresh WorkItem under `workspace_dir`. Nothing is written.
    pub fn allocate(workspace_dir: &Path) -> Self {
        let id = Uuid::new_v4().simple().to_string();
        Self {
            base_name: format!("cheatsheet-{id}"),
            id,
            workspace_dir: workspace_dir.to_path_buf(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn workspace_dir(&self) -> &Path {
        &self.workspace_dir
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// `<base><suffix>` as a bare file name, for tool arguments.
    pub fn file_name(&self, suffix: &str) -> String {
        format!("{}{}", self.base_name, suffix)
    }

    /// `<workspace>/<base><suffix>`.
    pub fn path(&self, suffix: &str) -> PathBuf {
        self.workspace_dir.join(self.file_name(suffix))
    }

    pub fn markdown_path(&self) -> PathBuf {
        self.path(".md")
    }

    pub fn fragment_path(&self) -> PathBuf {
        self.path("_temp.tex")
    }

    pub fn document_path(&self) -> PathBuf {
        self.path(".tex")
    }

    pub fn pdf_path(&self) -> PathBuf {
        self.path(".pdf")
    }

    pub fn error_log_path(&self) -> PathBuf {
        self.path("_errors.log")
    }

    /// Every file the reconciler should delete: the input, the fragment,
    /// the assembled document and the compiler byproducts of both the
    /// document and the fragment.
    pub fn intermediate_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![
            self.markdown_path(),
            self.fragment_path(),
            self.document_path(),
        ];
        for stem in ["", "_temp"] {
            for ext in BYPRODUCT_EXTENSIONS {
                paths.push(self.path(&format!("{stem}.{ext}")));
            }
        }
        paths.push(self.path("_temp.pdf"));
        paths
    }
}

/// Write `content` verbatim to `<workspace>/<base>.md`, creating the
/// workspace directory if needed.
pub async fn materialize(work: &WorkItem, content: &str) -> Result<PathBuf, CheatmarkError> {
    tokio::fs::create_dir_all(work.workspace_dir())
        .await
        .map_err(|e| CheatmarkError::Io {
            path: work.workspace_dir().to_path_buf(),
            source: e,
        })?;

    let path = work.markdown_path();
    tokio::fs::write(&path, content.as_bytes())
        .await
        .map_err(|e| CheatmarkError::Io {
            path: path.clone(),
            source: e,
        })?;

    debug!("Materialised {} bytes to {}", content.len(), path.display());
    Ok(path)
}

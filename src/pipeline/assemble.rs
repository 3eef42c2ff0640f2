//! Document assembly: header + fragment + footer → `<base>.tex`.
//!
//! Both templates and the fragment are fully read before any output is
//! written, so every "file not found" case aborts with nothing on disk. The
//! document itself is written to an anonymous temp file in the workspace and
//! only persisted under `<base>.tex` once complete; on any failure the temp
//! file is removed when dropped and the compiler never sees a partial
//! document.

use crate::config::{ConversionConfig, LayoutOptions};
use crate::diagnostics::Diagnostics;
use crate::error::CheatmarkError;
use crate::pipeline::workspace::WorkItem;
use crate::templates::{render_header, unresolved_placeholders, TemplateReadError, TemplateSet};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Assemble `<base>.tex` and return its path.
///
/// # Errors
/// - [`CheatmarkError::TemplateNotFound`] — header or footer file missing
/// - [`CheatmarkError::ContentNotFound`] — fragment missing
/// - [`CheatmarkError::FileOperation`] — any other I/O failure
pub async fn assemble_document(
    work: &WorkItem,
    layout: &LayoutOptions,
    config: &ConversionConfig,
    diagnostics: &mut Diagnostics,
) -> Result<PathBuf, CheatmarkError> {
    let templates = match TemplateSet::load(config.template_dir.as_deref()).await {
        Ok(t) => t,
        Err(TemplateReadError { path, source }) if source.kind() == ErrorKind::NotFound => {
            diagnostics.push(format!("Template file not found: {}", path.display()));
            return Err(CheatmarkError::TemplateNotFound {
                path,
                diagnostics: diagnostics.clone(),
            });
        }
        Err(TemplateReadError { path, source }) => {
            return Err(file_operation_error(
                format!("{}: {}", path.display(), source),
                diagnostics,
            ));
        }
    };

    let header = render_header(&templates.header, layout);
    for token in unresolved_placeholders(&header) {
        let message = format!("Unresolved template placeholder: {token}");
        warn!("{}", message);
        diagnostics.push(message);
    }

    let fragment_path = work.fragment_path();
    let fragment = match tokio::fs::read(&fragment_path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            diagnostics.push(format!(
                "Content file not found: {}",
                work.file_name("_temp.tex")
            ));
            return Err(CheatmarkError::ContentNotFound {
                path: fragment_path,
                diagnostics: diagnostics.clone(),
            });
        }
        Err(e) => {
            return Err(file_operation_error(
                format!("{}: {}", fragment_path.display(), e),
                diagnostics,
            ));
        }
    };

    let workspace = work.workspace_dir().to_path_buf();
    let target = work.document_path();
    let footer = templates.footer;
    let write_target = target.clone();
    let written = tokio::task::spawn_blocking(move || {
        write_atomically(
            &workspace,
            &write_target,
            &[header.as_bytes(), fragment.as_slice(), footer.as_bytes()],
        )
    })
    .await
    .map_err(|e| CheatmarkError::Internal(format!("Assembly task panicked: {e}")))?;

    match written {
        Ok(bytes) => {
            debug!("Assembled {} ({} bytes)", target.display(), bytes);
            Ok(target)
        }
        Err(e) => Err(file_operation_error(
            format!("{}: {}", target.display(), e),
            diagnostics,
        )),
    }
}

/// Write `parts` in order to a temp file in `dir`, then rename it to `target`.
fn write_atomically(dir: &Path, target: &Path, parts: &[&[u8]]) -> std::io::Result<usize> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    let mut total = 0;
    for part in parts {
        tmp.write_all(part)?;
        total += part.len();
    }
    tmp.flush()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(total)
}

fn file_operation_error(message: String, diagnostics: &mut Diagnostics) -> CheatmarkError {
    diagnostics.push(format!("File operation error: {message}"));
    CheatmarkError::FileOperation {
        message,
        diagnostics: diagnostics.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::{FOOTER_FILE, HEADER_FILE};

    async fn work_with_fragment(dir: &Path, fragment: &str) -> WorkItem {
        let w = WorkItem::allocate(dir);
        tokio::fs::write(w.fragment_path(), fragment).await.unwrap();
        w
    }

    fn config_with_templates(dir: &Path) -> ConversionConfig {
        ConversionConfig::builder()
            .workspace_dir(dir)
            .template_dir(dir.join("tpl"))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn concatenates_header_fragment_footer_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let tpl = dir.path().join("tpl");
        std::fs::create_dir_all(&tpl).unwrap();
        std::fs::write(tpl.join(HEADER_FILE), "H[${fontSize}|${columnCount}]\n").unwrap();
        std::fs::write(tpl.join(FOOTER_FILE), "\nF").unwrap();

        let w = work_with_fragment(dir.path(), "BODY").await;
        let mut diags = Diagnostics::new();
        let path = assemble_document(
            &w,
            &LayoutOptions::default(),
            &config_with_templates(dir.path()),
            &mut diags,
        )
        .await
        .unwrap();

        assert_eq!(std::fs::read_to_string(path).unwrap(), "H[5pt|3]\nBODY\nF");
        assert!(diags.is_empty());
    }

    #[tokio::test]
    async fn missing_header_aborts_without_document() {
        let dir = tempfile::tempdir().unwrap();
        let w = work_with_fragment(dir.path(), "BODY").await;
        let mut diags = Diagnostics::new();
        let err = assemble_document(
            &w,
            &LayoutOptions::default(),
            &config_with_templates(dir.path()),
            &mut diags,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CheatmarkError::TemplateNotFound { .. }), "got: {err}");
        assert!(diags.entries()[0].starts_with("Template file not found:"));
        assert!(diags.entries()[0].contains(HEADER_FILE));
        assert!(!w.document_path().exists());
    }

    #[tokio::test]
    async fn missing_footer_aborts_without_document() {
        let dir = tempfile::tempdir().unwrap();
        let tpl = dir.path().join("tpl");
        std::fs::create_dir_all(&tpl).unwrap();
        std::fs::write(tpl.join(HEADER_FILE), "H").unwrap();

        let w = work_with_fragment(dir.path(), "BODY").await;
        let mut diags = Diagnostics::new();
        let err = assemble_document(
            &w,
            &LayoutOptions::default(),
            &config_with_templates(dir.path()),
            &mut diags,
        )
        .await
        .unwrap_err();

        match err {
            CheatmarkError::TemplateNotFound { path, .. } => assert!(path.ends_with(FOOTER_FILE)),
            other => panic!("unexpected: {other}"),
        }
        assert!(!w.document_path().exists());
    }

    #[tokio::test]
    async fn missing_fragment_is_content_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let w = WorkItem::allocate(dir.path());
        let config = ConversionConfig::builder()
            .workspace_dir(dir.path())
            .build()
            .unwrap();
        let mut diags = Diagnostics::new();
        let err = assemble_document(&w, &LayoutOptions::default(), &config, &mut diags)
            .await
            .unwrap_err();

        assert!(matches!(err, CheatmarkError::ContentNotFound { .. }), "got: {err}");
        assert!(diags.entries()[0].starts_with("Content file not found:"));
        assert!(!w.document_path().exists());
    }

    #[tokio::test]
    async fn unknown_placeholder_is_a_diagnostic_only() {
        let dir = tempfile::tempdir().unwrap();
        let tpl = dir.path().join("tpl");
        std::fs::create_dir_all(&tpl).unwrap();
        std::fs::write(tpl.join(HEADER_FILE), "${paperSize}").unwrap();
        std::fs::write(tpl.join(FOOTER_FILE), "").unwrap();

        let w = work_with_fragment(dir.path(), "x").await;
        let mut diags = Diagnostics::new();
        assemble_document(
            &w,
            &LayoutOptions::default(),
            &config_with_templates(dir.path()),
            &mut diags,
        )
        .await
        .unwrap();

        assert_eq!(diags.len(), 1);
        assert!(diags.entries()[0].contains("${paperSize}"));
    }

    #[tokio::test]
    async fn no_temp_files_left_after_success() {
        let dir = tempfile::tempdir().unwrap();
        let w = work_with_fragment(dir.path(), "x").await;
        let config = ConversionConfig::builder()
            .workspace_dir(dir.path())
            .build()
            .unwrap();
        assemble_document(&w, &LayoutOptions::default(), &config, &mut Diagnostics::new())
            .await
            .unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2, "{names:?}");
    }
}

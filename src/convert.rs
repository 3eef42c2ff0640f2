//! Conversion entry points.
//!
//! [`convert`] runs the whole pipeline for one request: materialise the
//! Markdown, run pandoc, assemble the LaTeX document, run pdflatex, clean the
//! workspace and file any diagnostics. Stages run strictly one after another;
//! concurrency only exists between independent calls, each isolated in its
//! own WorkItem.

use crate::config::{ConversionConfig, ConversionRequest, LayoutOptions};
use crate::diagnostics::Diagnostics;
use crate::error::CheatmarkError;
use crate::output::{CleanupReport, ConversionOutput, ConversionStats, HealthStatus};
use crate::pipeline::{assemble, cleanup, compile, markdown, workspace, Stage};
use crate::pipeline::workspace::WorkItem;
use crate::progress::ProgressCallback;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert Markdown to a PDF cheat sheet.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(ConversionOutput)` whenever `<base>.pdf` exists after compiling, even
/// if tools reported errors along the way (see `output.diagnostics`).
///
/// # Errors
/// Returns `Err(CheatmarkError)` only for fatal faults:
/// - empty content (nothing is written)
/// - unwritable workspace
/// - a tool that cannot be launched or exceeds its timeout
/// - missing fragment, template or PDF
pub async fn convert(
    request: &ConversionRequest,
    config: &ConversionConfig,
) -> Result<ConversionOutput, CheatmarkError> {
    let total_start = Instant::now();

    if request.content.trim().is_empty() {
        return Err(CheatmarkError::EmptyContent);
    }

    let layout = request.layout();
    let work = WorkItem::allocate(&config.workspace_dir);
    info!(
        "Starting conversion {} ({} bytes of Markdown)",
        work.id(),
        request.content.len()
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(work.id());
    }

    let mut diagnostics = Diagnostics::new();
    let mut tracker = StageTracker::new(config.progress_callback.as_ref());
    let mut stats = ConversionStats::default();

    let result = run_stages(
        &work,
        &request.content,
        &layout,
        config,
        &mut diagnostics,
        &mut tracker,
        &mut stats,
    )
    .await;

    // ── Diagnostics sink: runs on success and on fatal faults ────────────
    let error_log = write_error_log(&work, &diagnostics).await;

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(result.is_ok());
    }

    let (pdf_path, cleanup) = match result {
        Ok(done) => done,
        Err(e) => {
            warn!("Conversion {} failed: {}", work.id(), e);
            return Err(e);
        }
    };

    stats.pdf_bytes = tokio::fs::metadata(&pdf_path)
        .await
        .map(|m| m.len())
        .unwrap_or(0);
    stats.total_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Conversion {} complete: {} bytes, {} diagnostic(s), {}ms total",
        work.id(),
        stats.pdf_bytes,
        diagnostics.len(),
        stats.total_ms
    );

    Ok(ConversionOutput {
        work_id: work.id().to_string(),
        file_name: work.file_name(".pdf"),
        pdf_path,
        diagnostics,
        error_log,
        cleanup,
        stats,
    })
}

/// Convert a Markdown file and place the PDF at `output_path`.
///
/// The PDF is copied next to its destination under a temporary name and then
/// renamed, so no partial file is ever visible at `output_path`. A non-empty
/// error log is moved alongside as `<output stem>_errors.log`.
pub async fn convert_to_file(
    markdown_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    layout: Option<LayoutOptions>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, CheatmarkError> {
    let markdown_path = markdown_path.as_ref();
    let path = output_path.as_ref();

    let content = tokio::fs::read_to_string(markdown_path)
        .await
        .map_err(|e| CheatmarkError::Io {
            path: markdown_path.to_path_buf(),
            source: e,
        })?;

    let request = ConversionRequest { content, layout };
    let mut output = convert(&request, config).await?;

    let write_err = |e: std::io::Error| CheatmarkError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    tokio::fs::create_dir_all(parent).await.map_err(write_err)?;

    // Atomic write: copy to a uniquely named temp file beside the
    // destination, then rename. The temp file is removed if anything fails.
    let tmp = tempfile::Builder::new()
        .prefix(".cheatmark-")
        .suffix(".pdf.tmp")
        .tempfile_in(parent)
        .map_err(write_err)?;
    tokio::fs::copy(&output.pdf_path, tmp.path())
        .await
        .map_err(write_err)?;
    let destination = path.to_path_buf();
    tokio::task::spawn_blocking(move || tmp.persist(&destination).map_err(|e| e.error))
        .await
        .map_err(|e| CheatmarkError::Internal(format!("Output task panicked: {e}")))?
        .map_err(write_err)?;
    remove_quietly(&output.pdf_path).await;

    if let Some(log) = output.error_log.take() {
        let target = sibling_log_path(path);
        match tokio::fs::copy(&log, &target).await {
            Ok(_) => {
                remove_quietly(&log).await;
                output.error_log = Some(target);
            }
            Err(e) => {
                warn!("Could not move error log to {}: {}", target.display(), e);
                output.error_log = Some(log);
            }
        }
    }

    output.pdf_path = path.to_path_buf();
    output.file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| output.file_name.clone());

    Ok(output)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    request: &ConversionRequest,
    config: &ConversionConfig,
) -> Result<ConversionOutput, CheatmarkError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CheatmarkError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(request, config))
}

/// Static liveness record for the upstream boundary.
pub fn health() -> HealthStatus {
    HealthStatus::default()
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Stages 1–5. Returns the PDF path and cleanup report on success.
async fn run_stages(
    work: &WorkItem,
    content: &str,
    layout: &LayoutOptions,
    config: &ConversionConfig,
    diagnostics: &mut Diagnostics,
    tracker: &mut StageTracker<'_>,
    stats: &mut ConversionStats,
) -> Result<(PathBuf, CleanupReport), CheatmarkError> {
    // ── Step 1: Materialise input ────────────────────────────────────────
    let t = tracker.start(Stage::Materialize);
    let materialized = workspace::materialize(work, content).await;
    stats.materialize_ms = tracker.finish(Stage::Materialize, t, diagnostics);
    materialized?;

    // ── Step 2: Markdown → LaTeX fragment ────────────────────────────────
    let t = tracker.start(Stage::Convert);
    let converted = markdown::convert_markdown(work, config, diagnostics).await;
    stats.convert_ms = tracker.finish(Stage::Convert, t, diagnostics);
    converted?;

    // ── Step 3: Assemble document ────────────────────────────────────────
    let t = tracker.start(Stage::Assemble);
    let assembled = assemble::assemble_document(work, layout, config, diagnostics).await;
    stats.assemble_ms = tracker.finish(Stage::Assemble, t, diagnostics);
    assembled?;

    // ── Step 4: Compile PDF ──────────────────────────────────────────────
    let t = tracker.start(Stage::Compile);
    let compiled = compile::compile_pdf(work, config, diagnostics).await;
    stats.compile_ms = tracker.finish(Stage::Compile, t, diagnostics);
    let pdf_path = compiled?;

    // ── Step 5: Reconcile workspace ──────────────────────────────────────
    if config.keep_intermediates {
        debug!("Keeping intermediates for {}", work.id());
        return Ok((
            pdf_path,
            CleanupReport {
                skipped: true,
                ..CleanupReport::default()
            },
        ));
    }

    let t = tracker.start(Stage::Reconcile);
    let report = cleanup::reconcile(work).await;
    for failure in &report.failed {
        diagnostics.push(format!("Cleanup error: {failure}"));
    }
    stats.reconcile_ms = tracker.finish(Stage::Reconcile, t, diagnostics);

    Ok((pdf_path, report))
}

/// Write `<base>_errors.log` when there is anything to report.
///
/// Failures are logged and swallowed; they never change the outcome.
async fn write_error_log(work: &WorkItem, diagnostics: &Diagnostics) -> Option<PathBuf> {
    if diagnostics.is_empty() {
        return None;
    }
    let path = work.error_log_path();
    match diagnostics.write_log(&path).await {
        Ok(()) => {
            debug!("Wrote {} diagnostic(s) to {}", diagnostics.len(), path.display());
            Some(path)
        }
        Err(e) => {
            warn!("Could not write error log {}: {}", path.display(), e);
            None
        }
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!("Could not remove {}: {}", path.display(), e);
    }
}

/// `report.pdf` → `report_errors.log` in the same directory.
fn sibling_log_path(pdf: &Path) -> PathBuf {
    let stem = pdf
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cheatsheet".to_string());
    pdf.with_file_name(format!("{stem}_errors.log"))
}

/// Times stages and forwards events, including each newly recorded
/// diagnostic, to the progress callback.
struct StageTracker<'a> {
    callback: Option<&'a ProgressCallback>,
    reported: usize,
}

impl<'a> StageTracker<'a> {
    fn new(callback: Option<&'a ProgressCallback>) -> Self {
        Self {
            callback,
            reported: 0,
        }
    }

    fn start(&self, stage: Stage) -> Instant {
        debug!("Stage {} started", stage);
        if let Some(cb) = self.callback {
            cb.on_stage_start(stage);
        }
        Instant::now()
    }

    fn finish(&mut self, stage: Stage, started: Instant, diagnostics: &Diagnostics) -> u64 {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        debug!("Stage {} finished in {}ms", stage, elapsed_ms);
        if let Some(cb) = self.callback {
            for message in diagnostics.iter().skip(self.reported) {
                cb.on_diagnostic(stage, message);
            }
            cb.on_stage_complete(stage, elapsed_ms);
        }
        self.reported = diagnostics.len();
        elapsed_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_log_path_uses_output_stem() {
        assert_eq!(
            sibling_log_path(Path::new("/out/sheet.pdf")),
            PathBuf::from("/out/sheet_errors.log")
        );
    }

    #[test]
    fn health_is_static() {
        assert_eq!(health().status, "healthy");
    }

    #[tokio::test]
    async fn empty_content_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ws = dir.path().join("ws");
        let config = ConversionConfig::builder()
            .workspace_dir(&ws)
            .build()
            .unwrap();

        for content in ["", "  \n\t"] {
            let err = convert(&ConversionRequest::new(content), &config)
                .await
                .unwrap_err();
            assert!(matches!(err, CheatmarkError::EmptyContent));
            assert_eq!(err.status_code(), 400);
        }
        assert!(!ws.exists());
    }

    #[test]
    fn convert_sync_propagates_empty_content() {
        let config = ConversionConfig::default();
        let err = convert_sync(&ConversionRequest::new(""), &config).unwrap_err();
        assert!(matches!(err, CheatmarkError::EmptyContent));
    }
}

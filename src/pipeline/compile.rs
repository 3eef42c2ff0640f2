//! LaTeX document → PDF via pdflatex.
//!
//! pdflatex runs non-interactively with file:line error messages, inside the
//! workspace and under a hard wall-clock bound. Its exit code is unreliable
//! in both directions: it exits non-zero for recoverable warnings-as-errors
//! and may report success-like output without writing a PDF. Only the PDF
//! existing on disk counts as success.

use crate::config::ConversionConfig;
use crate::diagnostics::Diagnostics;
use crate::error::CheatmarkError;
use crate::pipeline::tool::{run_tool, ToolInvocation, ToolOutput};
use crate::pipeline::workspace::WorkItem;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

pub const TOOL_NAME: &str = "pdflatex";

/// Arguments after the configured `extra_args`.
pub fn pdflatex_args(work: &WorkItem) -> Vec<String> {
    vec![
        "-synctex=1".to_string(),
        "-interaction=nonstopmode".to_string(),
        "-file-line-error".to_string(),
        "-output-directory=.".to_string(),
        work.file_name(".tex"),
    ]
}

/// Compile `<base>.tex` into `<base>.pdf` and return the PDF path.
///
/// # Errors
/// - [`CheatmarkError::ToolLaunch`] if pdflatex cannot be started
/// - [`CheatmarkError::ToolTimeout`] if it exceeds the compiler timeout
/// - [`CheatmarkError::PdfNotProduced`] if no PDF exists afterwards
pub async fn compile_pdf(
    work: &WorkItem,
    config: &ConversionConfig,
    diagnostics: &mut Diagnostics,
) -> Result<PathBuf, CheatmarkError> {
    let inv = ToolInvocation::new(
        TOOL_NAME,
        &config.latex,
        pdflatex_args(work),
        work.workspace_dir(),
        Duration::from_secs(config.compiler_timeout_secs),
    );
    let output = run_tool(&inv).await?;

    if output.timed_out {
        if let Some(partial) = output.combined_output() {
            diagnostics.push(format!(
                "PDFLatex timed out after {}s. Output before the timeout:\n{}",
                config.compiler_timeout_secs, partial
            ));
        }
        return Err(CheatmarkError::ToolTimeout {
            tool: TOOL_NAME.to_string(),
            secs: config.compiler_timeout_secs,
            diagnostics: diagnostics.clone(),
        });
    }

    if !output.success() {
        let message = failure_report(&output, work.workspace_dir(), &work.file_name(".tex"));
        warn!(
            "pdflatex exited with {} for {}",
            output.exit_label(),
            work.base_name()
        );
        diagnostics.push(message);
    }

    let pdf = work.pdf_path();
    if !tokio::fs::try_exists(&pdf).await.unwrap_or(false) {
        return Err(CheatmarkError::PdfNotProduced {
            path: pdf,
            diagnostics: diagnostics.clone(),
        });
    }

    debug!("PDF ready: {}", pdf.display());
    Ok(pdf)
}

/// Diagnostic text for a non-zero pdflatex exit: stderr and stdout combined,
/// plus where and on what the compiler ran.
fn failure_report(output: &ToolOutput, cwd: &Path, input: &str) -> String {
    let combined = format!("{}\n{}", output.stderr, output.stdout);
    let details = match combined.trim() {
        "" => "pdflatex failed without error output",
        text => text,
    };
    format!(
        "PDFLatex error (exit code {}):\nWorking directory: {}\nInput file: {}\nError details:\n{}",
        output.exit_label(),
        cwd.display(),
        input,
        details
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_are_non_interactive_with_file_line_errors() {
        let w = WorkItem::allocate(Path::new("/ws"));
        let args = pdflatex_args(&w);
        assert!(args.contains(&"-interaction=nonstopmode".to_string()));
        assert!(args.contains(&"-file-line-error".to_string()));
        assert_eq!(args.last().unwrap(), &format!("{}.tex", w.base_name()));
    }

    #[test]
    fn report_combines_streams_and_context() {
        let out = ToolOutput {
            exit_code: Some(1),
            stdout: "./doc.tex:12: Undefined control sequence.".into(),
            stderr: "warning on stderr".into(),
            ..ToolOutput::default()
        };
        let report = failure_report(&out, Path::new("/ws"), "doc.tex");
        assert!(report.starts_with("PDFLatex error (exit code 1):"));
        assert!(report.contains("Working directory: /ws"));
        assert!(report.contains("Input file: doc.tex"));
        assert!(report.contains("warning on stderr\n./doc.tex:12: Undefined control sequence."));
    }

    #[test]
    fn report_without_output_says_so() {
        let out = ToolOutput {
            exit_code: Some(2),
            ..ToolOutput::default()
        };
        let report = failure_report(&out, Path::new("/ws"), "doc.tex");
        assert!(report.ends_with("pdflatex failed without error output"));
    }
}

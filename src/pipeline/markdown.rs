//! Markdown → LaTeX fragment via pandoc.
//!
//! pandoc runs inside the workspace with the input format pinned to Markdown
//! and an explicit output path. A non-zero exit is only a diagnostic; the
//! fragment file existing afterwards is what decides whether the pipeline
//! can go on. One attempt is made, no retries.

use crate::config::ConversionConfig;
use crate::diagnostics::Diagnostics;
use crate::error::CheatmarkError;
use crate::pipeline::tool::{run_tool, ToolInvocation};
use crate::pipeline::workspace::WorkItem;
use std::time::Duration;
use tracing::{debug, warn};

pub const TOOL_NAME: &str = "pandoc";

/// Arguments after the configured `extra_args`.
pub fn pandoc_args(work: &WorkItem) -> Vec<String> {
    vec![
        "--from=markdown".to_string(),
        format!("--output={}", work.file_name("_temp.tex")),
        work.file_name(".md"),
    ]
}

/// Produce `<base>_temp.tex` from `<base>.md`.
///
/// # Errors
/// - [`CheatmarkError::ToolLaunch`] if pandoc cannot be started
/// - [`CheatmarkError::ToolTimeout`] if it exceeds the converter timeout
/// - [`CheatmarkError::ConverterOutputMissing`] if no fragment was written
pub async fn convert_markdown(
    work: &WorkItem,
    config: &ConversionConfig,
    diagnostics: &mut Diagnostics,
) -> Result<(), CheatmarkError> {
    let inv = ToolInvocation::new(
        TOOL_NAME,
        &config.pandoc,
        pandoc_args(work),
        work.workspace_dir(),
        Duration::from_secs(config.converter_timeout_secs),
    );
    let output = run_tool(&inv).await?;

    if output.timed_out {
        if let Some(partial) = output.combined_output() {
            diagnostics.push(format!(
                "Pandoc timed out after {}s. Output before the timeout:\n{}",
                config.converter_timeout_secs, partial
            ));
        }
        return Err(CheatmarkError::ToolTimeout {
            tool: TOOL_NAME.to_string(),
            secs: config.converter_timeout_secs,
            diagnostics: diagnostics.clone(),
        });
    }

    if !output.success() {
        let message = format!("Pandoc error: {}", output.stderr.trim_end());
        warn!("{}", message);
        diagnostics.push(message);
    }

    let fragment = work.fragment_path();
    if !tokio::fs::try_exists(&fragment).await.unwrap_or(false) {
        diagnostics.push(format!(
            "Pandoc failed to create file {}",
            work.file_name("_temp.tex")
        ));
        return Err(CheatmarkError::ConverterOutputMissing {
            path: fragment,
            diagnostics: diagnostics.clone(),
        });
    }

    debug!("Fragment ready: {}", fragment.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn args_pin_format_and_output() {
        let w = WorkItem::allocate(Path::new("/ws"));
        let args = pandoc_args(&w);
        assert_eq!(args[0], "--from=markdown");
        assert_eq!(args[1], format!("--output={}_temp.tex", w.base_name()));
        assert_eq!(args[2], format!("{}.md", w.base_name()));
    }
}

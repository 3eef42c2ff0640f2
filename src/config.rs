//! Configuration types for Markdown-to-cheat-sheet conversion.
//!
//! Two kinds of settings exist and are kept apart on purpose:
//!
//! * [`LayoutOptions`] — per-request presentation knobs substituted into the
//!   LaTeX header (font size, columns, margins …). They arrive with every
//!   [`ConversionRequest`].
//! * [`ConversionConfig`] — process-wide wiring: where the workspace lives,
//!   which templates and tool binaries to use, and how long each tool may
//!   run. Built once via [`ConversionConfigBuilder`] and shared.
//!
//! The workspace root is injected here rather than fixed in code so tests
//! can point every run at its own temporary directory.

use crate::error::CheatmarkError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ── Layout options ───────────────────────────────────────────────────────

/// Page orientation handed to the LaTeX `geometry` package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Orientation {
    type Err = CheatmarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "landscape" => Ok(Orientation::Landscape),
            "portrait" => Ok(Orientation::Portrait),
            other => Err(CheatmarkError::InvalidConfig(format!(
                "orientation must be 'landscape' or 'portrait', got '{other}'"
            ))),
        }
    }
}

pub const DEFAULT_FONT_SIZE: &str = "5pt";
pub const DEFAULT_LINE_SPACING: &str = "5pt";
pub const DEFAULT_COLUMN_COUNT: &str = "3";
pub const DEFAULT_COLUMN_GAP: &str = "1mm";
pub const DEFAULT_VERTICAL_MARGIN: &str = "1mm";
pub const DEFAULT_HORIZONTAL_MARGIN: &str = "1mm";

/// Presentation knobs substituted verbatim into the header template.
///
/// Values are free-form LaTeX dimension strings; units and ranges are not
/// validated. Absent fields deserialize to their defaults. The legacy names
/// `columnNum`, `columnSep`, `upDown` and `leftRight` are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutOptions {
    pub font_size: String,
    pub line_spacing: String,
    #[serde(alias = "columnNum")]
    pub column_count: String,
    pub orientation: Orientation,
    #[serde(alias = "columnSep")]
    pub column_gap: String,
    #[serde(alias = "upDown")]
    pub vertical_margin: String,
    #[serde(alias = "leftRight")]
    pub horizontal_margin: String,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE.to_string(),
            line_spacing: DEFAULT_LINE_SPACING.to_string(),
            column_count: DEFAULT_COLUMN_COUNT.to_string(),
            orientation: Orientation::default(),
            column_gap: DEFAULT_COLUMN_GAP.to_string(),
            vertical_margin: DEFAULT_VERTICAL_MARGIN.to_string(),
            horizontal_margin: DEFAULT_HORIZONTAL_MARGIN.to_string(),
        }
    }
}

impl LayoutOptions {
    /// Copy with every blank field replaced by its default, so a placeholder
    /// is never substituted with an empty string.
    pub fn resolved(&self) -> Self {
        fn or_default(value: &str, default: &str) -> String {
            if value.trim().is_empty() {
                default.to_string()
            } else {
                value.to_string()
            }
        }

        Self {
            font_size: or_default(&self.font_size, DEFAULT_FONT_SIZE),
            line_spacing: or_default(&self.line_spacing, DEFAULT_LINE_SPACING),
            column_count: or_default(&self.column_count, DEFAULT_COLUMN_COUNT),
            orientation: self.orientation,
            column_gap: or_default(&self.column_gap, DEFAULT_COLUMN_GAP),
            vertical_margin: or_default(&self.vertical_margin, DEFAULT_VERTICAL_MARGIN),
            horizontal_margin: or_default(&self.horizontal_margin, DEFAULT_HORIZONTAL_MARGIN),
        }
    }

    /// `(placeholder name, value)` pairs in header-template terms.
    pub fn placeholders(&self) -> [(&'static str, String); 7] {
        [
            ("fontSize", self.font_size.clone()),
            ("lineSpacing", self.line_spacing.clone()),
            ("columnCount", self.column_count.clone()),
            ("orientation", self.orientation.to_string()),
            ("columnGap", self.column_gap.clone()),
            ("verticalMargin", self.vertical_margin.clone()),
            ("horizontalMargin", self.horizontal_margin.clone()),
        ]
    }
}

/// One conversion request as delivered by the upstream boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionRequest {
    /// Full Markdown source (UTF-8), written to disk byte-for-byte.
    pub content: String,
    #[serde(default, alias = "template_config")]
    pub layout: Option<LayoutOptions>,
}

impl ConversionRequest {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            layout: None,
        }
    }

    pub fn with_layout(mut self, layout: LayoutOptions) -> Self {
        self.layout = Some(layout);
        self
    }

    /// The effective layout: the supplied one with blanks filled in, or the
    /// defaults when none was supplied.
    pub fn layout(&self) -> LayoutOptions {
        self.layout
            .as_ref()
            .map(LayoutOptions::resolved)
            .unwrap_or_default()
    }
}

// ── Pipeline configuration ───────────────────────────────────────────────

/// An external program plus arguments placed before the pipeline's own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalTool {
    pub program: PathBuf,
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl ExternalTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// Process-wide configuration of the conversion pipeline.
///
/// Built via [`ConversionConfig::builder()`] or [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use cheatmark::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .workspace_dir("/tmp/cheatmark-work")
///     .compiler_timeout_secs(60)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Root directory for every WorkItem's files. Default: `<tmp>/cheatmark`.
    pub workspace_dir: PathBuf,

    /// Directory containing `HEADER.txt` and `FOOTER.txt`.
    /// `None` uses the templates built into the crate.
    pub template_dir: Option<PathBuf>,

    /// Markdown → LaTeX converter. Default: `pandoc`.
    pub pandoc: ExternalTool,

    /// LaTeX → PDF compiler. Default: `pdflatex`.
    pub latex: ExternalTool,

    /// Wall-clock bound for the converter in seconds. Default: 30.
    pub converter_timeout_secs: u64,

    /// Wall-clock bound for the compiler in seconds. Default: 30.
    ///
    /// pdflatex in nonstop mode can still loop forever on some malformed
    /// input (runaway arguments, recursive macros).
    pub compiler_timeout_secs: u64,

    /// Leave intermediate files in the workspace. Default: false.
    pub keep_intermediates: bool,

    /// Receives per-stage events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            workspace_dir: std::env::temp_dir().join("cheatmark"),
            template_dir: None,
            pandoc: ExternalTool::new("pandoc"),
            latex: ExternalTool::new("pdflatex"),
            converter_timeout_secs: 30,
            compiler_timeout_secs: 30,
            keep_intermediates: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("workspace_dir", &self.workspace_dir)
            .field("template_dir", &self.template_dir)
            .field("pandoc", &self.pandoc)
            .field("latex", &self.latex)
            .field("converter_timeout_secs", &self.converter_timeout_secs)
            .field("compiler_timeout_secs", &self.compiler_timeout_secs)
            .field("keep_intermediates", &self.keep_intermediates)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn workspace_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.workspace_dir = dir.into();
        self
    }

    pub fn template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.template_dir = Some(dir.into());
        self
    }

    pub fn pandoc(mut self, tool: ExternalTool) -> Self {
        self.config.pandoc = tool;
        self
    }

    pub fn latex(mut self, tool: ExternalTool) -> Self {
        self.config.latex = tool;
        self
    }

    pub fn converter_timeout_secs(mut self, secs: u64) -> Self {
        self.config.converter_timeout_secs = secs;
        self
    }

    pub fn compiler_timeout_secs(mut self, secs: u64) -> Self {
        self.config.compiler_timeout_secs = secs;
        self
    }

    pub fn keep_intermediates(mut self, v: bool) -> Self {
        self.config.keep_intermediates = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, CheatmarkError> {
        let c = &self.config;
        if c.converter_timeout_secs == 0 || c.compiler_timeout_secs == 0 {
            return Err(CheatmarkError::InvalidConfig(
                "Tool timeouts must be ≥ 1 second".into(),
            ));
        }
        if c.workspace_dir.as_os_str().is_empty() {
            return Err(CheatmarkError::InvalidConfig(
                "Workspace directory must not be empty".into(),
            ));
        }
        if c.pandoc.program.as_os_str().is_empty() || c.latex.program.as_os_str().is_empty() {
            return Err(CheatmarkError::InvalidConfig(
                "Tool program paths must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

//! CLI binary for cheatmark.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` / `LayoutOptions` and prints results.

use anyhow::{Context, Result};
use cheatmark::templates::write_default_templates;
use cheatmark::{
    convert_to_file, ConversionConfig, ConversionProgressCallback, ExternalTool, LayoutOptions,
    Orientation, ProgressCallback, Stage,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner naming the current stage, plus one
/// log line per finished stage and per diagnostic.
struct CliProgressCallback {
    bar: ProgressBar,
    diagnostics: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            diagnostics: AtomicUsize::new(0),
        })
    }
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Materialize => "Writing Markdown",
        Stage::Convert => "Running pandoc",
        Stage::Assemble => "Assembling LaTeX",
        Stage::Compile => "Running pdflatex",
        Stage::Reconcile => "Cleaning workspace",
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, work_id: &str) {
        self.bar.set_prefix("Converting");
        self.bar.set_message(dim(work_id));
    }

    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_message(format!("{}…", stage_label(stage)));
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<20} {}",
            green("✓"),
            stage_label(stage),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_diagnostic(&self, stage: Stage, message: &str) {
        self.diagnostics.fetch_add(1, Ordering::SeqCst);
        let first_line = message.lines().next().unwrap_or_default();
        let msg = if first_line.chars().count() > 80 {
            format!("{}\u{2026}", first_line.chars().take(79).collect::<String>())
        } else {
            first_line.to_string()
        };
        self.bar.println(format!(
            "  {} [{}] {}",
            yellow("⚠"),
            stage,
            yellow(&msg)
        ));
    }

    fn on_conversion_complete(&self, succeeded: bool) {
        self.bar.finish_and_clear();
        let warnings = self.diagnostics.load(Ordering::SeqCst);
        match (succeeded, warnings) {
            (true, 0) => eprintln!("{} PDF compiled", green("✔")),
            (true, n) => eprintln!("{} PDF compiled with {} diagnostic(s)", yellow("⚠"), n),
            (false, _) => eprintln!("{} Conversion failed", red("✘")),
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic conversion (writes notes.pdf next to notes.md)
  cheatmark notes.md

  # Four portrait columns in 7pt
  cheatmark notes.md -o sheet.pdf --columns 4 --orientation portrait --font-size 7pt

  # Customise the LaTeX preamble
  cheatmark --export-templates ./templates
  $EDITOR ./templates/HEADER.txt
  cheatmark notes.md --templates ./templates

  # JSON output with diagnostics and timings
  cheatmark --json notes.md > result.json

TEMPLATE PLACEHOLDERS (HEADER.txt):
  ${fontSize} ${lineSpacing} ${columnCount} ${orientation}
  ${columnGap} ${verticalMargin} ${horizontalMargin}

ENVIRONMENT VARIABLES:
  RUST_LOG                 Override the tracing filter
  CHEATMARK_WORKSPACE      Working directory for intermediate files
  CHEATMARK_TEMPLATES      Directory holding HEADER.txt and FOOTER.txt
  CHEATMARK_PANDOC         pandoc executable
  CHEATMARK_PDFLATEX       pdflatex executable
"#;

/// Convert Markdown to a dense multi-column PDF cheat sheet.
#[derive(Parser, Debug)]
#[command(
    name = "cheatmark",
    version,
    about = "Convert Markdown to a dense multi-column PDF cheat sheet",
    long_about = "Convert a Markdown file into a compact multi-column PDF using pandoc and \
pdflatex. Layout (font size, columns, orientation, margins) is substituted into a LaTeX \
header template; every run is isolated in its own set of workspace files.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Markdown file to convert.
    #[arg(required_unless_present = "export_templates")]
    input: Option<PathBuf>,

    /// Write the PDF here. Default: the input path with a `.pdf` extension.
    #[arg(short, long, env = "CHEATMARK_OUTPUT")]
    output: Option<PathBuf>,

    /// Font size (LaTeX dimension).
    #[arg(long, env = "CHEATMARK_FONT_SIZE", default_value = "5pt")]
    font_size: String,

    /// Baseline skip (LaTeX dimension).
    #[arg(long, env = "CHEATMARK_LINE_SPACING", default_value = "5pt")]
    line_spacing: String,

    /// Number of text columns.
    #[arg(long, env = "CHEATMARK_COLUMNS", default_value = "3")]
    columns: String,

    /// Page orientation: landscape or portrait.
    #[arg(long, env = "CHEATMARK_ORIENTATION", value_enum, default_value = "landscape")]
    orientation: OrientationArg,

    /// Gap between columns (LaTeX dimension).
    #[arg(long, env = "CHEATMARK_COLUMN_GAP", default_value = "1mm")]
    column_gap: String,

    /// Top and bottom page margin (LaTeX dimension).
    #[arg(long, env = "CHEATMARK_VERTICAL_MARGIN", default_value = "1mm")]
    vertical_margin: String,

    /// Left and right page margin (LaTeX dimension).
    #[arg(long, env = "CHEATMARK_HORIZONTAL_MARGIN", default_value = "1mm")]
    horizontal_margin: String,

    /// Working directory for intermediate files.
    #[arg(long, env = "CHEATMARK_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Directory containing HEADER.txt and FOOTER.txt. Default: built-in templates.
    #[arg(long, env = "CHEATMARK_TEMPLATES")]
    templates: Option<PathBuf>,

    /// pandoc executable.
    #[arg(long, env = "CHEATMARK_PANDOC", default_value = "pandoc")]
    pandoc: PathBuf,

    /// pdflatex executable.
    #[arg(long, env = "CHEATMARK_PDFLATEX", default_value = "pdflatex")]
    pdflatex: PathBuf,

    /// pandoc timeout in seconds.
    #[arg(long, env = "CHEATMARK_CONVERTER_TIMEOUT", default_value_t = 30)]
    converter_timeout: u64,

    /// pdflatex timeout in seconds.
    #[arg(long, env = "CHEATMARK_COMPILER_TIMEOUT", default_value_t = 30)]
    compiler_timeout: u64,

    /// Leave .md/.tex/.aux/.log files in the workspace.
    #[arg(long, env = "CHEATMARK_KEEP_INTERMEDIATES")]
    keep_intermediates: bool,

    /// Print the ConversionOutput as JSON on stdout.
    #[arg(long, env = "CHEATMARK_JSON")]
    json: bool,

    /// Write the built-in HEADER.txt and FOOTER.txt into this directory and exit.
    #[arg(long, value_name = "DIR")]
    export_templates: Option<PathBuf>,

    /// Disable the progress spinner.
    #[arg(long, env = "CHEATMARK_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CHEATMARK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CHEATMARK_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OrientationArg {
    Landscape,
    Portrait,
}

impl From<OrientationArg> for Orientation {
    fn from(v: OrientationArg) -> Self {
        match v {
            OrientationArg::Landscape => Orientation::Landscape,
            OrientationArg::Portrait => Orientation::Portrait,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner already reports stage progress, so library INFO logs are
    // suppressed while it is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Template export mode ─────────────────────────────────────────────
    if let Some(ref dir) = cli.export_templates {
        write_default_templates(dir)
            .await
            .with_context(|| format!("Failed to write templates to {}", dir.display()))?;
        if !cli.quiet {
            eprintln!(
                "{} Templates written to {}",
                green("✔"),
                bold(&dir.display().to_string())
            );
        }
        if cli.input.is_none() {
            return Ok(());
        }
    }

    let input = cli
        .input
        .clone()
        .context("An input Markdown file is required")?;
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&input));

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run conversion ───────────────────────────────────────────────────
    let output = convert_to_file(&input, &output_path, Some(build_layout(&cli)), &config)
        .await
        .with_context(|| format!("Conversion of {} failed", input.display()))?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    if !cli.quiet {
        if !show_progress {
            for d in output.diagnostics.iter() {
                eprintln!("{} {}", yellow("warning:"), d);
            }
        }
        eprintln!(
            "{}  {} bytes  {}ms  →  {}",
            if output.diagnostics.is_empty() {
                green("✔")
            } else {
                yellow("⚠")
            },
            output.stats.pdf_bytes,
            output.stats.total_ms,
            bold(&output.pdf_path.display().to_string()),
        );
        if let Some(ref log) = output.error_log {
            eprintln!("   diagnostics: {}", dim(&log.display().to_string()));
        }
        if let Some(fault) = output.cleanup_fault() {
            eprintln!("   {}", yellow(&fault.to_string()));
        }
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .pandoc(ExternalTool::new(&cli.pandoc))
        .latex(ExternalTool::new(&cli.pdflatex))
        .converter_timeout_secs(cli.converter_timeout)
        .compiler_timeout_secs(cli.compiler_timeout)
        .keep_intermediates(cli.keep_intermediates);

    if let Some(ref dir) = cli.workspace {
        builder = builder.workspace_dir(dir);
    }
    if let Some(ref dir) = cli.templates {
        builder = builder.template_dir(dir);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn build_layout(cli: &Cli) -> LayoutOptions {
    LayoutOptions {
        font_size: cli.font_size.clone(),
        line_spacing: cli.line_spacing.clone(),
        column_count: cli.columns.clone(),
        orientation: cli.orientation.into(),
        column_gap: cli.column_gap.clone(),
        vertical_margin: cli.vertical_margin.clone(),
        horizontal_margin: cli.horizontal_margin.clone(),
    }
}

/// `notes.md` → `notes.pdf`.
fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("pdf")
}

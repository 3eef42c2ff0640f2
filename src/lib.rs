//! # cheatmark
//!
//! Convert Markdown documents into dense, multi-column PDF cheat sheets.
//!
//! Markdown is turned into a LaTeX fragment by `pandoc`, wrapped in a
//! parameterised multicol preamble, and compiled by `pdflatex`. Every
//! conversion lives in its own randomly named set of files under a
//! configurable workspace, so concurrent calls never collide.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Markdown
//!  │
//!  ├─ 1. Materialise  write <base>.md into the workspace
//!  ├─ 2. Convert      pandoc → <base>_temp.tex           (bounded wait)
//!  ├─ 3. Assemble     header(layout) + fragment + footer → <base>.tex
//!  ├─ 4. Compile      pdflatex → <base>.pdf              (bounded wait)
//!  ├─ 5. Reconcile    delete intermediates and byproducts
//!  └─ 6. Diagnostics  non-fatal tool errors → <base>_errors.log
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cheatmark::{convert, ConversionConfig, ConversionRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let request = ConversionRequest::new("# Title\n\nHello");
//!     let output = convert(&request, &config).await?;
//!     println!("{}", output.pdf_path.display());
//!     for d in output.diagnostics.iter() {
//!         eprintln!("warning: {d}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `cheatmark` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! ## External Requirements
//!
//! `pandoc` and a TeX distribution providing `pdflatex` (with `multicol`,
//! `geometry`, `enumitem` and `titlesec` for the built-in header) must be
//! installed, or their locations configured via
//! [`ConversionConfigBuilder::pandoc`] and [`ConversionConfigBuilder::latex`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod diagnostics;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod templates;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ConversionConfig, ConversionConfigBuilder, ConversionRequest, ExternalTool, LayoutOptions,
    Orientation,
};
pub use convert::{convert, convert_sync, convert_to_file, health};
pub use diagnostics::Diagnostics;
pub use error::CheatmarkError;
pub use output::{CleanupReport, ConversionOutput, ConversionStats, HealthStatus};
pub use pipeline::Stage;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use templates::{render_header, DEFAULT_FOOTER, DEFAULT_HEADER};

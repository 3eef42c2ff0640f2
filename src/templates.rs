//! LaTeX header/footer templates and placeholder substitution.
//!
//! A cheat sheet is `header + pandoc fragment + footer`. The header carries
//! seven `${name}` placeholders, one per [`LayoutOptions`] field; the footer
//! is static. Substitution is literal: values are inserted as-is with no
//! LaTeX escaping, so a value containing `%`, `#` or `}` will corrupt the
//! document. That is the caller's responsibility.
//!
//! Templates come either from the built-in constants below or from
//! `HEADER.txt` / `FOOTER.txt` in a configured directory, read fresh on
//! every conversion.

use crate::config::LayoutOptions;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};

/// File name of the header template inside a template directory.
pub const HEADER_FILE: &str = "HEADER.txt";

/// File name of the footer template inside a template directory.
pub const FOOTER_FILE: &str = "FOOTER.txt";

/// Built-in header: dense multi-column article preamble.
///
/// Pandoc's default LaTeX writer emits `\tightlist` and `\pandocbounded`
/// in fragments; both are provided here because the fragment is compiled
/// without pandoc's own template.
pub const DEFAULT_HEADER: &str = r"\documentclass{article}
\usepackage[utf8]{inputenc}
\usepackage[T1]{fontenc}
\usepackage{lmodern}
\usepackage[${orientation},top=${verticalMargin},bottom=${verticalMargin},left=${horizontalMargin},right=${horizontalMargin}]{geometry}
\usepackage{multicol}
\usepackage{amsmath,amssymb}
\usepackage{graphicx}
\usepackage{booktabs}
\usepackage{longtable}
\usepackage{array}
\usepackage{calc}
\usepackage{enumitem}
\usepackage{titlesec}
\usepackage[hidelinks]{hyperref}

\pagestyle{empty}
\setlength{\parindent}{0pt}
\setlength{\parskip}{0pt}
\setlength{\columnsep}{${columnGap}}
\setlength{\columnseprule}{0.2pt}
\setlist{nosep,leftmargin=*}
\titlespacing*{\section}{0pt}{1ex}{0.5ex}
\titlespacing*{\subsection}{0pt}{0.8ex}{0.3ex}
\titlespacing*{\subsubsection}{0pt}{0.5ex}{0.2ex}
\titleformat*{\section}{\bfseries}
\titleformat*{\subsection}{\bfseries}
\titleformat*{\subsubsection}{\bfseries\itshape}
\setcounter{secnumdepth}{0}

\providecommand{\tightlist}{\setlength{\itemsep}{0pt}\setlength{\parskip}{0pt}}
\providecommand{\pandocbounded}[1]{#1}

\begin{document}
\fontsize{${fontSize}}{${lineSpacing}}\selectfont
\begin{multicols*}{${columnCount}}
";

/// Built-in footer closing the column environment and the document.
pub const DEFAULT_FOOTER: &str = r"
\end{multicols*}
\end{document}
";

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"));

/// Substitute every known `${name}` in `template` with the matching layout
/// value.
///
/// Runs as a single left-to-right pass, so an inserted value is never scanned
/// again and the result does not depend on field order. Unknown placeholders
/// are left untouched (see [`unresolved_placeholders`]).
pub fn render_header(template: &str, layout: &LayoutOptions) -> String {
    let values = layout.placeholders();
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures<'_>| {
            let name = &caps[1];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.clone())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Every `${name}` token still present in `text`, in order of appearance.
pub fn unresolved_placeholders(text: &str) -> Vec<String> {
    PLACEHOLDER_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// A template file that could not be read.
#[derive(Debug)]
pub struct TemplateReadError {
    pub path: PathBuf,
    pub source: std::io::Error,
}

/// Header and footer text for one conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSet {
    pub header: String,
    pub footer: String,
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self {
            header: DEFAULT_HEADER.to_string(),
            footer: DEFAULT_FOOTER.to_string(),
        }
    }
}

impl TemplateSet {
    /// Load both templates before anything is written.
    ///
    /// `None` yields the built-ins. With a directory, the header is read
    /// first, then the footer; the first failure is returned with its path.
    pub async fn load(template_dir: Option<&Path>) -> Result<Self, TemplateReadError> {
        let Some(dir) = template_dir else {
            return Ok(Self::default());
        };

        let header = read_template(&dir.join(HEADER_FILE)).await?;
        let footer = read_template(&dir.join(FOOTER_FILE)).await?;
        Ok(Self { header, footer })
    }
}

async fn read_template(path: &Path) -> Result<String, TemplateReadError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| TemplateReadError {
            path: path.to_path_buf(),
            source,
        })
}

/// Write the built-in templates into `dir` as `HEADER.txt` and `FOOTER.txt`,
/// as a starting point for customised templates.
pub async fn write_default_templates(dir: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(dir.join(HEADER_FILE), DEFAULT_HEADER).await?;
    tokio::fs::write(dir.join(FOOTER_FILE), DEFAULT_FOOTER).await?;
    Ok(())
}

//! Pipeline stages for Markdown-to-cheat-sheet conversion.
//!
//! Each submodule implements exactly one step. Control only moves forward;
//! a stage either appends to the shared [`crate::diagnostics::Diagnostics`]
//! and returns `Ok`, or returns a fatal [`crate::error::CheatmarkError`]
//! that stops the run.
//!
//! ## Data Flow
//!
//! ```text
//! workspace ──▶ markdown ──▶ assemble ──▶ compile ──▶ cleanup
//! (<base>.md)   (_temp.tex)  (<base>.tex) (<base>.pdf) (byproducts gone)
//! ```
//!
//! 1. [`workspace`] — allocate a random WorkItem and write the Markdown
//! 2. [`markdown`]  — pandoc turns `<base>.md` into a LaTeX fragment
//! 3. [`assemble`]  — header + fragment + footer become `<base>.tex`
//! 4. [`compile`]   — pdflatex turns `<base>.tex` into `<base>.pdf`
//! 5. [`cleanup`]   — delete everything except the PDF and the error log
//!
//! Both external tools go through [`tool::run_tool`], which owns timeout and
//! process-reaping logic.

use std::fmt;

pub mod assemble;
pub mod cleanup;
pub mod compile;
pub mod markdown;
pub mod tool;
pub mod workspace;

/// Pipeline stage, reported to progress callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Materialize,
    Convert,
    Assemble,
    Compile,
    Reconcile,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Materialize => "materialize",
            Stage::Convert => "convert",
            Stage::Assemble => "assemble",
            Stage::Compile => "compile",
            Stage::Reconcile => "reconcile",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Lint and format fish shell scripts by delegating to `fish` and `fish_indent`.
//!
//! The checker (`fish -n <file>`) and formatter (`fish_indent`) do all the
//! real work; this crate runs them, reads their output, and turns it into
//! LSP diagnostics and text edits.

pub mod config;
pub mod document;
pub mod exit_codes;
pub mod format;
pub mod lint;
pub mod lsp;
pub mod parser;
pub mod process;
pub mod version;

pub use config::{FishlintConfig, FishlintLspOptions};
pub use format::{FormatEdit, FormatPipeline};
pub use lint::{LintPipeline, LintRequest};
pub use parser::{DiagnosticRecord, parse_error_output, parse_for_document};
pub use process::{Invocation, ProcessError, ProcessResult, ProcessRunner, TokioProcessRunner};
pub use version::{FishVersion, probe_version};

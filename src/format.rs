//! Formatting through `fish_indent`.
//!
//! The formatter reads the selected text on stdin and writes the formatted
//! text on stdout. Output is only used when it exits with status 0.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tower_lsp::lsp_types::{Range, TextEdit};

use crate::config::FishlintConfig;
use crate::document::TextDocument;
use crate::process::{Invocation, ProcessError, ProcessRunner};

/// Replacement of `range` with the formatter's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatEdit {
    pub range: Range,
    pub new_text: String,
}

impl From<FormatEdit> for TextEdit {
    fn from(edit: FormatEdit) -> Self {
        TextEdit {
            range: edit.range,
            new_text: edit.new_text,
        }
    }
}

#[derive(Clone)]
pub struct FormatPipeline {
    runner: Arc<dyn ProcessRunner>,
    /// Formatter executable followed by its extra arguments
    command: Vec<String>,
    cwd: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl FormatPipeline {
    pub fn new(runner: Arc<dyn ProcessRunner>, config: &FishlintConfig) -> Self {
        Self {
            runner,
            command: std::iter::once(config.formatter.clone())
                .chain(config.formatter_args.iter().cloned())
                .collect(),
            cwd: None,
            timeout: config.timeout_duration(),
        }
    }

    pub fn with_cwd(mut self, cwd: Option<PathBuf>) -> Self {
        self.cwd = cwd;
        self
    }

    /// Format `range` of `text`, or all of it when no range is given.
    ///
    /// The range is clamped to the document. Returns `Ok(None)` when the
    /// formatter rejects the input (non-zero exit); its output is never used
    /// in that case. Only failures to run the formatter are errors.
    pub async fn format(&self, text: &str, range: Option<Range>) -> Result<Option<FormatEdit>, ProcessError> {
        let document = TextDocument::new(text);
        let range = match range {
            Some(range) => document.clamp_range(range),
            None => document.full_range(),
        };

        let invocation = Invocation::from_command(&self.command)?
            .stdin(document.slice(range))
            .cwd(self.cwd.clone())
            .timeout(self.timeout);

        match self.runner.run_checked(&invocation).await {
            Ok(result) => Ok(Some(FormatEdit {
                range,
                new_text: result.stdout,
            })),
            Err(ProcessError::NonZeroExit(result)) => {
                log::debug!(
                    "Formatter exited with {}, leaving text untouched: {}",
                    result.exit_code,
                    result.stderr.trim()
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Format a whole text, returning the new text when the formatter succeeded.
    pub async fn format_text(&self, text: &str) -> Result<Option<String>, ProcessError> {
        Ok(self.format(text, None).await?.map(|edit| edit.new_text))
    }
}

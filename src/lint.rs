//! Syntax checking through `fish --no-execute`.
//!
//! The checker is pointed at the file on disk, so only saved documents can be
//! linted. Its error output is parsed into one diagnostic per reported line.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Position, Range, Url};

use crate::config::FishlintConfig;
use crate::document::TextDocument;
use crate::parser::{self, DiagnosticRecord};
use crate::process::{Invocation, ProcessError, ProcessRunner};

/// Source label attached to every diagnostic.
pub const DIAGNOSTIC_SOURCE: &str = "fish";

/// LSP language identifier of fish documents.
pub const LANGUAGE_ID: &str = "fish";

/// A document to lint.
#[derive(Debug, Clone, Copy)]
pub struct LintRequest<'a> {
    pub uri: &'a Url,
    /// Current text, used to size diagnostic ranges.
    pub text: &'a str,
    pub language_id: &'a str,
    /// False while the editor holds unsaved modifications.
    pub saved: bool,
}

impl LintRequest<'_> {
    /// Whether the request names a saved fish file on disk.
    pub fn is_eligible(&self) -> bool {
        self.saved && self.uri.scheme() == "file" && is_fish_document(self.uri, self.language_id)
    }
}

/// A document is fish if the editor says so, or, when the editor gives no
/// language, if it has a `.fish` extension.
pub fn is_fish_document(uri: &Url, language_id: &str) -> bool {
    if !language_id.is_empty() {
        return language_id == LANGUAGE_ID;
    }
    Path::new(uri.path())
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("fish"))
}

/// Runs the checker and turns its complaints into diagnostics.
#[derive(Clone)]
pub struct LintPipeline {
    runner: Arc<dyn ProcessRunner>,
    checker: String,
    cwd: Option<PathBuf>,
    timeout: Option<Duration>,
    home: Option<PathBuf>,
}

impl LintPipeline {
    pub fn new(runner: Arc<dyn ProcessRunner>, config: &FishlintConfig) -> Self {
        Self {
            runner,
            checker: config.checker.clone(),
            cwd: None,
            timeout: config.timeout_duration(),
            home: parser::home_dir(),
        }
    }

    /// Directory the checker runs in, normally the workspace root.
    pub fn with_cwd(mut self, cwd: Option<PathBuf>) -> Self {
        self.cwd = cwd;
        self
    }

    /// Home directory used to expand `~` in reported file names.
    pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    /// Lint one document.
    ///
    /// Returns `Ok(None)` when the document is not eligible (unsaved, not a
    /// local file, or not fish); its diagnostics should be left alone.
    /// A non-zero checker exit means "errors found" and is not an error here.
    pub async fn lint(&self, request: &LintRequest<'_>) -> Result<Option<Vec<Diagnostic>>, ProcessError> {
        if !request.is_eligible() {
            log::debug!("Skipping lint of {}: not a saved fish file", request.uri);
            return Ok(None);
        }
        let Ok(path) = request.uri.to_file_path() else {
            return Ok(None);
        };

        let invocation = Invocation::new(&self.checker)
            .arg("-n")
            .arg(path.to_string_lossy())
            .cwd(self.cwd.clone())
            .timeout(self.timeout);
        let result = self.runner.run(&invocation).await?;

        let records = parser::parse_for_document(&result.stderr, &path, self.home.as_deref());
        log::debug!(
            "Checker exited with {} and reported {} error(s) for {}",
            result.exit_code,
            records.len(),
            path.display()
        );

        let document = TextDocument::new(request.text);
        Ok(Some(records.iter().map(|record| record_to_diagnostic(record, &document)).collect()))
    }
}

/// Build a diagnostic spanning the whole reported line, clamped to the document.
pub fn record_to_diagnostic(record: &DiagnosticRecord, document: &TextDocument<'_>) -> Diagnostic {
    let line = record.line_number.saturating_sub(1).min(document.last_line());
    let range = Range {
        start: Position::new(line, 0),
        end: Position::new(line, document.line_len_utf16(line)),
    };

    Diagnostic {
        range,
        severity: Some(DiagnosticSeverity::ERROR),
        code: None,
        code_description: None,
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message: record.message.clone(),
        related_information: None,
        tags: None,
        data: None,
    }
}

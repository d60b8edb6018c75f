//! Parser for the error output of `fish --no-execute`.
//!
//! fish reports each syntax error as `<file> (line <N>): <message>` and follows
//! it with context lines (the offending source and a caret marker). Only the
//! header lines are turned into records; everything else is skipped.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static ERROR_LINE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(.+?) \(line (\d+)\): (.*?)\r?$").unwrap());

/// One error reported by the checker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
    /// File name exactly as fish printed it (may start with `~`).
    pub target_file: String,
    /// 1-based line number.
    pub line_number: u32,
    pub message: String,
}

impl DiagnosticRecord {
    /// The reported file with a leading `~` expanded.
    pub fn resolved_path(&self, home: Option<&Path>) -> PathBuf {
        expand_home(&self.target_file, home)
    }
}

/// Parse every well-formed error line, in the order they appear.
///
/// Lines that do not match, and lines reporting line 0 or a number too large
/// to be a line, are skipped.
pub fn parse_error_output(text: &str) -> Vec<DiagnosticRecord> {
    ERROR_LINE_REGEX
        .captures_iter(text)
        .filter_map(|caps| {
            let line_number = caps[2].parse::<u32>().ok().filter(|n| *n > 0)?;
            Some(DiagnosticRecord {
                target_file: caps[1].to_string(),
                line_number,
                message: caps[3].to_string(),
            })
        })
        .collect()
}

/// Parse error output, keeping only records that refer to `document`.
///
/// Both sides are compared as `file://` URLs after home expansion, so
/// `~/conf.fish` matches `/home/me/conf.fish`. Relative paths never match.
pub fn parse_for_document(text: &str, document: &Path, home: Option<&Path>) -> Vec<DiagnosticRecord> {
    let Some(document_url) = file_url(document) else {
        return Vec::new();
    };

    parse_error_output(text)
        .into_iter()
        .filter(|record| {
            let matches = file_url(&record.resolved_path(home)).is_some_and(|url| url.as_str() == document_url.as_str());
            if !matches {
                log::debug!("Ignoring error reported for other file: {}", record.target_file);
            }
            matches
        })
        .collect()
}

/// Expand a leading `~` (alone or followed by a separator) to `home`.
pub fn expand_home(path: &str, home: Option<&Path>) -> PathBuf {
    let Some(home) = home else {
        return PathBuf::from(path);
    };
    if path == "~" {
        return home.to_path_buf();
    }
    match path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        Some(rest) => home.join(rest),
        None => PathBuf::from(path),
    }
}

/// The current user's home directory, if it can be determined.
pub fn home_dir() -> Option<PathBuf> {
    use etcetera::{BaseStrategy, choose_base_strategy};
    choose_base_strategy().ok().map(|s| s.home_dir().to_path_buf())
}

fn file_url(path: &Path) -> Option<Url> {
    Url::from_file_path(path).ok()
}

//! Handler for the `check` command.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use colored::*;
use futures::stream::{self, StreamExt};
use tower_lsp::lsp_types::{Diagnostic, Url};

use fishlint_lib::exit_codes::exit;
use fishlint_lib::lint::{LANGUAGE_ID, LintPipeline, LintRequest};
use fishlint_lib::process::TokioProcessRunner;

use crate::Cli;
use crate::file_discovery::find_fish_files;

/// Check files for syntax errors and exit with the matching code.
pub fn handle_check(cli: &Cli, paths: &[String], quiet: bool) -> ! {
    let config = super::resolve_config(cli);

    let files = find_fish_files(paths).unwrap_or_else(|e| {
        eprintln!("{}: {e}", "Error".red().bold());
        exit::tool_error();
    });
    if files.is_empty() {
        if !quiet {
            println!("No fish files found");
        }
        exit::success();
    }

    let pipeline = LintPipeline::new(Arc::new(TokioProcessRunner::new()), &config)
        .with_cwd(std::env::current_dir().ok());

    let results: Vec<(PathBuf, Result<Vec<Diagnostic>, String>)> = super::runtime().block_on(async {
        stream::iter(files)
            .map(|path| {
                let pipeline = &pipeline;
                async move {
                    let outcome = check_file(pipeline, &path).await;
                    (path, outcome)
                }
            })
            .buffered(super::concurrency())
            .collect()
            .await
    });

    let mut errors = 0usize;
    let mut files_with_errors = 0usize;
    let mut failures = BTreeSet::new();

    for (path, outcome) in &results {
        match outcome {
            Ok(diagnostics) => {
                if !diagnostics.is_empty() {
                    files_with_errors += 1;
                    errors += diagnostics.len();
                }
                if !quiet {
                    for diagnostic in diagnostics {
                        print_diagnostic(path, diagnostic);
                    }
                }
            }
            Err(message) => {
                failures.insert(message.clone());
            }
        }
    }

    for failure in &failures {
        eprintln!("{}: {failure}", "Error".red().bold());
    }

    let checked = results.len();
    if errors > 0 {
        println!(
            "\n{} Found {} error(s) in {} file(s) ({} file(s) checked)",
            "Issues:".yellow().bold(),
            errors,
            files_with_errors,
            checked
        );
    } else if failures.is_empty() {
        println!(
            "{} No syntax errors found in {} file(s)",
            "Success:".green().bold(),
            checked
        );
    }

    if !failures.is_empty() {
        exit::tool_error();
    }
    if errors > 0 {
        exit::violations_found();
    }
    exit::success();
}

async fn check_file(pipeline: &LintPipeline, path: &Path) -> Result<Vec<Diagnostic>, String> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let absolute = std::path::absolute(path).map_err(|e| format!("Invalid path {}: {e}", path.display()))?;
    let uri = Url::from_file_path(&absolute).map_err(|_| format!("Invalid path {}", path.display()))?;

    let request = LintRequest {
        uri: &uri,
        text: &text,
        language_id: LANGUAGE_ID,
        saved: true,
    };
    log::debug!("Checking {}", path.display());
    match pipeline.lint(&request).await {
        Ok(diagnostics) => Ok(diagnostics.unwrap_or_default()),
        Err(e) => Err(e.to_string()),
    }
}

fn print_diagnostic(path: &Path, diagnostic: &Diagnostic) {
    let source = diagnostic.source.as_deref().unwrap_or("fish");
    println!(
        "{}:{}:{}: {} {}",
        path.display().to_string().blue().underline(),
        (diagnostic.range.start.line + 1).to_string().cyan(),
        (diagnostic.range.start.character + 1).to_string().cyan(),
        diagnostic.message,
        format!("[{source}]").dimmed()
    );
}

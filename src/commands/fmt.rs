//! Handler for the `fmt` command.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use colored::*;
use futures::stream::{self, StreamExt};

use fishlint_lib::exit_codes::exit;
use fishlint_lib::format::FormatPipeline;
use fishlint_lib::process::TokioProcessRunner;

use crate::Cli;
use crate::file_discovery::find_fish_files;

/// What happened to one file.
enum FileOutcome {
    Unchanged,
    Changed,
    /// The formatter rejected the file (usually a syntax error)
    Rejected,
    Failed(String),
}

pub fn handle_fmt(cli: &Cli, paths: &[String], check: bool, stdin: bool) -> ! {
    let config = super::resolve_config(cli);
    let pipeline = FormatPipeline::new(Arc::new(TokioProcessRunner::new()), &config)
        .with_cwd(std::env::current_dir().ok());

    if stdin {
        format_stdin(&pipeline);
    }

    let files = find_fish_files(paths).unwrap_or_else(|e| {
        eprintln!("{}: {e}", "Error".red().bold());
        exit::tool_error();
    });

    let results: Vec<(PathBuf, FileOutcome)> = super::runtime().block_on(async {
        stream::iter(files)
            .map(|path| {
                let pipeline = &pipeline;
                async move {
                    let outcome = format_file(pipeline, &path, check).await;
                    (path, outcome)
                }
            })
            .buffered(super::concurrency())
            .collect()
            .await
    });

    let mut changed = 0usize;
    let mut problems = 0usize;
    for (path, outcome) in &results {
        match outcome {
            FileOutcome::Unchanged => {}
            FileOutcome::Changed => {
                changed += 1;
                if check {
                    println!("Would reformat: {}", path.display());
                } else {
                    println!("Formatted: {}", path.display());
                }
            }
            FileOutcome::Rejected => {
                problems += 1;
                eprintln!(
                    "{}: formatter rejected {} (does it have syntax errors?)",
                    "Warning".yellow().bold(),
                    path.display()
                );
            }
            FileOutcome::Failed(message) => {
                problems += 1;
                eprintln!("{}: {message}", "Error".red().bold());
            }
        }
    }

    let verb = if check { "would be reformatted" } else { "reformatted" };
    println!("{changed} file(s) {verb}, {} file(s) left unchanged", results.len() - changed);

    if problems > 0 {
        exit::tool_error();
    }
    if check && changed > 0 {
        exit::violations_found();
    }
    exit::success();
}

async fn format_file(pipeline: &FormatPipeline, path: &Path, check: bool) -> FileOutcome {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) => return FileOutcome::Failed(format!("Failed to read {}: {e}", path.display())),
    };

    match pipeline.format_text(&text).await {
        Ok(Some(formatted)) if formatted == text => FileOutcome::Unchanged,
        Ok(Some(formatted)) => {
            if !check && let Err(e) = tokio::fs::write(path, formatted).await {
                return FileOutcome::Failed(format!("Failed to write {}: {e}", path.display()));
            }
            FileOutcome::Changed
        }
        Ok(None) => FileOutcome::Rejected,
        Err(e) => FileOutcome::Failed(e.to_string()),
    }
}

/// Format stdin to stdout. On failure the input is echoed back unchanged so
/// editor integrations piping through us never lose text.
fn format_stdin(pipeline: &FormatPipeline) -> ! {
    let mut input = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut input) {
        eprintln!("{}: Failed to read stdin: {e}", "Error".red().bold());
        exit::tool_error();
    }

    let outcome = super::runtime().block_on(pipeline.format_text(&input));
    let (output, ok) = match outcome {
        Ok(Some(formatted)) => (formatted, true),
        Ok(None) => {
            eprintln!("{}: formatter rejected the input", "Warning".yellow().bold());
            (input, false)
        }
        Err(e) => {
            eprintln!("{}: {e}", "Error".red().bold());
            (input, false)
        }
    };

    let mut stdout = io::stdout().lock();
    if stdout.write_all(output.as_bytes()).and_then(|_| stdout.flush()).is_err() {
        exit::tool_error();
    }
    if ok {
        exit::success();
    }
    exit::tool_error();
}

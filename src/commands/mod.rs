//! Command handlers for the fishlint CLI.
//!
//! Each subcommand has its own module with a public handler function
//! that `main()` dispatches to.

pub mod check;
pub mod fmt;
pub mod server;
pub mod version;

use std::path::Path;

use colored::*;

use fishlint_lib::config::FishlintConfig;
use fishlint_lib::exit_codes::exit;

use crate::Cli;

/// Load configuration and apply CLI overrides, exiting on error.
pub fn resolve_config(cli: &Cli) -> FishlintConfig {
    let cwd = std::env::current_dir().unwrap_or_else(|_| ".".into());
    let mut config = match FishlintConfig::resolve(cli.config.as_deref().map(Path::new), &cwd) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {e}", "Error".red().bold());
            exit::tool_error();
        }
    };

    if let Some(checker) = &cli.checker {
        config.checker = checker.clone();
    }
    if let Some(formatter) = &cli.formatter {
        config.formatter = formatter.clone();
    }
    if let Some(timeout) = cli.timeout {
        config.timeout = timeout;
    }
    config
}

/// Create the Tokio runtime the CLI commands run on.
pub fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("{}: Failed to create Tokio runtime: {}", "Error".red().bold(), e);
        exit::tool_error();
    })
}

/// How many tool processes the CLI runs at once.
pub fn concurrency() -> usize {
    std::thread::available_parallelism().map_or(4, |n| n.get())
}

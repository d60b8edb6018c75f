//! Handler for the `version` command.

use colored::*;

use fishlint_lib::exit_codes::exit;
use fishlint_lib::process::TokioProcessRunner;
use fishlint_lib::version::probe_version;

use crate::Cli;

/// Print fishlint's version and the fish it will use.
pub fn handle_version(cli: &Cli) -> ! {
    println!("fishlint {}", env!("CARGO_PKG_VERSION"));

    let config = super::resolve_config(cli);
    let probe = super::runtime().block_on(probe_version(&TokioProcessRunner::new(), &config, None));
    match probe {
        Ok(version) => {
            println!("{version} ({})", config.checker);
            exit::success();
        }
        Err(e) => {
            eprintln!("{}: {e}", "Error".red().bold());
            exit::tool_error();
        }
    }
}

//! Handler for the `server` command.

use colored::*;

use fishlint_lib::exit_codes::exit;

/// Handle the server command: start the LSP server.
pub fn handle_server(port: Option<u16>, stdio: bool, config: Option<String>) {
    // Validate config file exists if provided
    if let Some(config_path) = &config
        && !std::path::Path::new(config_path).exists()
    {
        eprintln!(
            "{}: Configuration file not found: {}",
            "Error".red().bold(),
            config_path
        );
        exit::tool_error();
    }

    let runtime = super::runtime();

    runtime.block_on(async {
        if let Some(port) = port {
            // TCP mode for debugging
            if let Err(e) = fishlint_lib::lsp::start_tcp_server(port, config.as_deref()).await {
                eprintln!("Failed to start LSP server on port {port}: {e}");
                exit::tool_error();
            }
        } else {
            // stdio is the default transport; the flag only documents intent
            log::debug!("Using stdio transport (explicit: {stdio})");
            if let Err(e) = fishlint_lib::lsp::start_server(config.as_deref()).await {
                eprintln!("Failed to start LSP server: {e}");
                exit::tool_error();
            }
        }
    });
}

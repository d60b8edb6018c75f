//! Language Server Protocol front end for fishlint
//!
//! Editors talk to `fishlint server` over stdio (or TCP for debugging) and get
//! fish syntax diagnostics on open/save plus document and range formatting.

pub mod server;
pub mod types;

pub use server::FishLanguageServer;
pub use types::{DocumentEntry, LintGenerations};

use anyhow::Result;
use tokio::net::TcpListener;
use tower_lsp::{LspService, Server};

/// Start the language server on stdin/stdout.
pub async fn start_server(config_path: Option<&str>) -> Result<()> {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let config_path = config_path.map(str::to_string);
    let (service, socket) = LspService::new(move |client| FishLanguageServer::new(client, config_path.as_deref()));

    log::info!("Starting fishlint language server");

    Server::new(stdin, stdout, socket).serve(service).await;

    Ok(())
}

/// Start the language server over TCP (useful for debugging)
pub async fn start_tcp_server(port: u16, config_path: Option<&str>) -> Result<()> {
    let listener = TcpListener::bind(format!("127.0.0.1:{port}")).await?;
    log::info!("fishlint language server listening on 127.0.0.1:{port}");

    loop {
        let (stream, peer) = listener.accept().await?;
        log::debug!("Accepted connection from {peer}");

        let config_path = config_path.map(str::to_string);
        let (service, socket) =
            LspService::new(move |client| FishLanguageServer::new(client, config_path.as_deref()));

        tokio::spawn(async move {
            let (read, write) = tokio::io::split(stream);
            Server::new(read, write, socket).serve(service).await;
        });
    }
}

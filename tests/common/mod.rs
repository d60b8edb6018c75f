//! Shared helpers for the integration tests: stand-in `fish` and
//! `fish_indent` scripts, and a harness that drives the language server
//! through real JSON-RPC messages.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use futures::future::poll_fn;
use serde_json::{Value, json};
use tower_lsp::jsonrpc::{Request, Response};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tower_lsp::LspService;
use tower_service::Service;

use fishlint_lib::lsp::FishLanguageServer;

/// Checker that flags the first line containing `=` the way fish does.
const FAKE_FISH: &str = r#"
if [ "$1" = "--version" ]; then
    echo "fish, version 3.7.1"
    exit 0
fi
if [ "$1" = "-n" ]; then
    line=$(grep -n "=" "$2" | head -n 1 | cut -d: -f1)
    if [ -n "$line" ]; then
        echo "$2 (line $line): Unsupported use of '='. In fish, please use 'set a 1'." >&2
        sed -n "${line}p" "$2" >&2
        echo "^" >&2
        exit 127
    fi
    exit 0
fi
exit 2
"#;

/// Formatter that squeezes runs of spaces and rejects input containing BROKEN.
const FAKE_FISH_INDENT: &str = r#"
input=$(cat)
case "$input" in
    *BROKEN*)
        echo "fish_indent: syntax error" >&2
        exit 1
        ;;
esac
printf '%s\n' "$input" | tr -s ' '
"#;

/// Checker like the stand-in `fish`, but it reads the file up front and
/// takes a second to answer when the file mentions `slow`.
const SLOW_FISH: &str = r#"
if [ "$1" = "--version" ]; then
    echo "fish, version 3.7.1"
    exit 0
fi
content=$(cat "$2")
case "$content" in
    *slow*) sleep 1 ;;
esac
line=$(printf '%s\n' "$content" | grep -n "=" | head -n 1 | cut -d: -f1)
if [ -n "$line" ]; then
    echo "$2 (line $line): Unsupported use of '='. In fish, please use 'set a 1'." >&2
    exit 127
fi
exit 0
"#;

/// Write an executable shell script into `dir`.
pub fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

pub fn fake_fish(dir: &Path) -> PathBuf {
    fake_tool(dir, "fish", FAKE_FISH)
}

pub fn fake_fish_indent(dir: &Path) -> PathBuf {
    fake_tool(dir, "fish_indent", FAKE_FISH_INDENT)
}

pub fn slow_fish(dir: &Path) -> PathBuf {
    fake_tool(dir, "slow-fish", SLOW_FISH)
}

/// Initialization options pointing the server at the fake tools in `dir`.
pub fn fake_tool_options(dir: &Path) -> Value {
    json!({
        "checker": fake_fish(dir),
        "formatter": fake_fish_indent(dir),
    })
}

/// Drives a [`FishLanguageServer`] through its `LspService`, the same way an
/// editor would, so server-to-client notifications can be observed.
///
/// The client socket is drained continuously into an unbounded queue, as the
/// real `Server` does. Its channel holds a single message, so a handler that
/// sends a notification would otherwise stall until the test reads it.
pub struct LspHarness {
    service: LspService<FishLanguageServer>,
    messages: mpsc::UnboundedReceiver<Request>,
    next_id: i64,
}

impl LspHarness {
    /// Must be called inside a Tokio runtime.
    pub fn new() -> Self {
        let (service, mut socket) = LspService::new(|client| FishLanguageServer::new(client, None));
        let (tx, messages) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(message) = socket.next().await {
                if tx.send(message).is_err() {
                    break;
                }
            }
        });
        Self {
            service,
            messages,
            next_id: 1,
        }
    }

    pub fn server(&self) -> &FishLanguageServer {
        self.service.inner()
    }

    async fn call(&mut self, request: Request) -> Option<Response> {
        poll_fn(|cx| self.service.poll_ready(cx)).await.unwrap();
        self.service.call(request).await.unwrap()
    }

    pub async fn request(&mut self, method: &'static str, params: Value) -> Result<Value, String> {
        let id = self.next_id;
        self.next_id += 1;
        let request = Request::build(method).params(params).id(id).finish();
        let response = self.call(request).await.expect("requests get a response");
        let (_, body) = response.into_parts();
        body.map_err(|e| e.message.to_string())
    }

    pub async fn notify(&mut self, method: &'static str, params: Value) {
        let request = Request::build(method).params(params).finish();
        assert!(self.call(request).await.is_none());
    }

    /// Send a notification without waiting for its handler, the way the real
    /// server runs handlers concurrently.
    pub async fn notify_detached(&mut self, method: &'static str, params: Value) -> JoinHandle<()> {
        let request = Request::build(method).params(params).finish();
        poll_fn(|cx| self.service.poll_ready(cx)).await.unwrap();
        let response = self.service.call(request);
        tokio::spawn(async move {
            assert!(response.await.unwrap().is_none());
        })
    }

    /// Send `initialize` + `initialized` with the given root and options.
    pub async fn initialize(&mut self, root: &Path, options: Value) -> Result<Value, String> {
        let root_uri = url::Url::from_file_path(root).unwrap();
        let result = self
            .request(
                "initialize",
                json!({
                    "processId": null,
                    "rootUri": root_uri,
                    "capabilities": {},
                    "initializationOptions": options,
                }),
            )
            .await?;
        self.notify("initialized", json!({})).await;
        Ok(result)
    }

    pub async fn open(&mut self, uri: &url::Url, text: &str) {
        self.notify(
            "textDocument/didOpen",
            json!({
                "textDocument": {
                    "uri": uri,
                    "languageId": "fish",
                    "version": 1,
                    "text": text,
                }
            }),
        )
        .await;
    }

    /// Wait for the next notification named `method`, skipping others.
    pub async fn next_notification(&mut self, method: &str) -> Value {
        let messages = &mut self.messages;
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let message = messages.recv().await.expect("client socket closed");
                if message.method() == method {
                    return message.params().cloned().unwrap_or(Value::Null);
                }
            }
        })
        .await
        .unwrap_or_else(|_| panic!("no {method} notification arrived"))
    }

    /// Collect every queued server-to-client message as `(method, params)`.
    pub async fn drain(&mut self) -> Vec<(String, Value)> {
        let mut found = Vec::new();
        while let Ok(Some(message)) =
            tokio::time::timeout(Duration::from_millis(300), self.messages.recv()).await
        {
            found.push((
                message.method().to_string(),
                message.params().cloned().unwrap_or(Value::Null),
            ));
        }
        found
    }

    /// Collect every queued notification named `method`.
    pub async fn drain_notifications(&mut self, method: &str) -> Vec<Value> {
        self.drain()
            .await
            .into_iter()
            .filter(|(name, _)| name == method)
            .map(|(_, params)| params)
            .collect()
    }
}

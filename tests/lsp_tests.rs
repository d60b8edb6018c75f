//! Tests for the fishlint language server
//!
//! These drive the server with real JSON-RPC messages and stand-in `fish` /
//! `fish_indent` scripts, covering:
//! - Initialization, configuration and the fish version probe
//! - Lint on open/save, clearing on close
//! - Error reporting when the checker cannot run

#![cfg(unix)]

mod common;

use std::fs;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tempfile::tempdir;
use url::Url;

use common::{LspHarness, fake_tool_options};

const PUBLISH: &str = "textDocument/publishDiagnostics";
const SHOW_MESSAGE: &str = "window/showMessage";

#[tokio::test]
async fn test_initialize_advertises_capabilities() {
    let dir = tempdir().unwrap();
    let mut lsp = LspHarness::new();

    let result = lsp.initialize(dir.path(), fake_tool_options(dir.path())).await.unwrap();

    let caps = &result["capabilities"];
    assert_eq!(caps["documentFormattingProvider"], json!(true));
    assert_eq!(caps["documentRangeFormattingProvider"], json!(true));
    assert_eq!(caps["textDocumentSync"]["openClose"], json!(true));
    assert_eq!(caps["textDocumentSync"]["change"], json!(1));
    assert_eq!(result["serverInfo"]["name"], json!("fishlint"));

    let version = lsp.server().fish_version().await.expect("version probed");
    assert_eq!(version.version, "3.7.1");
}

#[tokio::test]
async fn test_initialize_fails_without_fish() {
    let dir = tempdir().unwrap();
    let mut lsp = LspHarness::new();

    let err = lsp
        .initialize(dir.path(), json!({ "checker": "nonexistent-fish-xyz123" }))
        .await
        .unwrap_err();
    assert!(err.contains("nonexistent-fish-xyz123"), "unexpected error: {err}");
}

#[tokio::test]
async fn test_initialize_fails_on_unrecognized_version() {
    let dir = tempdir().unwrap();
    let not_fish = common::fake_tool(dir.path(), "not-fish", "echo 'zsh 5.9'\n");
    let mut lsp = LspHarness::new();

    let result = lsp.initialize(dir.path(), json!({ "checker": not_fish })).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_config_file_in_workspace_root_is_used() {
    let dir = tempdir().unwrap();
    let fish = common::fake_fish(dir.path());
    fs::write(
        dir.path().join(".fishlint.toml"),
        format!("checker = {:?}\nenable-formatting = false\n", fish.to_string_lossy()),
    )
    .unwrap();
    let mut lsp = LspHarness::new();

    let result = lsp.initialize(dir.path(), Value::Null).await.unwrap();
    assert_eq!(result["capabilities"]["documentFormattingProvider"], json!(false));

    let config = lsp.server().config().await;
    assert_eq!(config.checker, fish.to_string_lossy());
    assert!(!config.enable_formatting);
}

#[tokio::test]
async fn test_open_publishes_syntax_errors() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("bad.fish");
    let text = "echo hello\nset a=1\n";
    fs::write(&script, text).unwrap();
    let uri = Url::from_file_path(&script).unwrap();

    let mut lsp = LspHarness::new();
    lsp.initialize(dir.path(), fake_tool_options(dir.path())).await.unwrap();
    lsp.open(&uri, text).await;

    let published = lsp.next_notification(PUBLISH).await;
    assert_eq!(published["uri"], json!(uri));
    let diagnostics = published["diagnostics"].as_array().unwrap();
    assert_eq!(diagnostics.len(), 1);

    let diag = &diagnostics[0];
    assert_eq!(diag["range"]["start"], json!({ "line": 1, "character": 0 }));
    assert_eq!(diag["range"]["end"], json!({ "line": 1, "character": 7 }));
    assert_eq!(diag["severity"], json!(1));
    assert_eq!(diag["source"], json!("fish"));
    assert!(diag["message"].as_str().unwrap().starts_with("Unsupported use of '='"));
}

#[tokio::test]
async fn test_clean_file_publishes_empty_set() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("good.fish");
    fs::write(&script, "echo hello\n").unwrap();
    let uri = Url::from_file_path(&script).unwrap();

    let mut lsp = LspHarness::new();
    lsp.initialize(dir.path(), fake_tool_options(dir.path())).await.unwrap();
    lsp.open(&uri, "echo hello\n").await;

    let published = lsp.next_notification(PUBLISH).await;
    assert_eq!(published["diagnostics"], json!([]));
}

#[tokio::test]
async fn test_unsaved_changes_are_not_linted_until_save() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("edit.fish");
    fs::write(&script, "echo hello\n").unwrap();
    let uri = Url::from_file_path(&script).unwrap();

    let mut lsp = LspHarness::new();
    lsp.initialize(dir.path(), fake_tool_options(dir.path())).await.unwrap();
    lsp.open(&uri, "echo hello\n").await;
    assert_eq!(lsp.next_notification(PUBLISH).await["diagnostics"], json!([]));

    lsp.notify(
        "textDocument/didChange",
        json!({
            "textDocument": { "uri": uri, "version": 2 },
            "contentChanges": [{ "text": "set x=1\n" }],
        }),
    )
    .await;
    let entry = lsp.server().document(&uri).await.unwrap();
    assert!(!entry.saved);
    assert_eq!(entry.version, 2);
    assert!(lsp.drain_notifications(PUBLISH).await.is_empty());

    fs::write(&script, "set x=1\n").unwrap();
    lsp.notify("textDocument/didSave", json!({ "textDocument": { "uri": uri } }))
        .await;
    assert!(lsp.server().document(&uri).await.unwrap().saved);

    let published = lsp.next_notification(PUBLISH).await;
    assert_eq!(published["diagnostics"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_close_clears_diagnostics() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("bad.fish");
    fs::write(&script, "set a=1\n").unwrap();
    let uri = Url::from_file_path(&script).unwrap();

    let mut lsp = LspHarness::new();
    lsp.initialize(dir.path(), fake_tool_options(dir.path())).await.unwrap();
    lsp.open(&uri, "set a=1\n").await;
    assert_eq!(lsp.next_notification(PUBLISH).await["diagnostics"].as_array().unwrap().len(), 1);

    lsp.notify("textDocument/didClose", json!({ "textDocument": { "uri": uri } }))
        .await;
    let cleared = lsp.next_notification(PUBLISH).await;
    assert_eq!(cleared["uri"], json!(uri));
    assert_eq!(cleared["diagnostics"], json!([]));
    assert!(lsp.server().document(&uri).await.is_none());
}

#[tokio::test]
async fn test_foreign_documents_are_ignored() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("run.sh");
    fs::write(&script, "a=1\n").unwrap();
    let uri = Url::from_file_path(&script).unwrap();

    let mut lsp = LspHarness::new();
    lsp.initialize(dir.path(), fake_tool_options(dir.path())).await.unwrap();
    lsp.notify(
        "textDocument/didOpen",
        json!({
            "textDocument": { "uri": uri, "languageId": "shellscript", "version": 1, "text": "a=1\n" }
        }),
    )
    .await;

    assert!(lsp.drain_notifications(PUBLISH).await.is_empty());
}

#[tokio::test]
async fn test_checker_failure_shows_one_error_and_clears() {
    let dir = tempdir().unwrap();
    let fish = common::fake_fish(dir.path());
    let script = dir.path().join("bad.fish");
    fs::write(&script, "set a=1\n").unwrap();
    let uri = Url::from_file_path(&script).unwrap();

    let mut lsp = LspHarness::new();
    lsp.initialize(dir.path(), fake_tool_options(dir.path())).await.unwrap();
    lsp.open(&uri, "set a=1\n").await;
    assert_eq!(lsp.next_notification(PUBLISH).await["diagnostics"].as_array().unwrap().len(), 1);

    // The checker disappears after startup.
    fs::remove_file(&fish).unwrap();
    lsp.notify("textDocument/didSave", json!({ "textDocument": { "uri": uri } }))
        .await;

    let mut messages = Vec::new();
    let mut published = Vec::new();
    for (method, params) in lsp.drain().await {
        match method.as_str() {
            SHOW_MESSAGE => messages.push(params),
            PUBLISH => published.push(params),
            _ => {}
        }
    }

    assert_eq!(messages.len(), 1, "exactly one error notification");
    assert_eq!(messages[0]["type"], json!(1));
    assert!(messages[0]["message"].as_str().unwrap().contains("not found"));
    assert_eq!(published.len(), 1);
    assert_eq!(published[0]["diagnostics"], json!([]));
}

fn slow_checker_options(dir: &std::path::Path) -> Value {
    let mut options = fake_tool_options(dir);
    options["checker"] = json!(common::slow_fish(dir));
    options
}

#[tokio::test]
async fn test_close_during_lint_drops_late_result() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("slow.fish");
    let text = "# slow\nset a=1\n";
    fs::write(&script, text).unwrap();
    let uri = Url::from_file_path(&script).unwrap();

    let mut lsp = LspHarness::new();
    lsp.initialize(dir.path(), slow_checker_options(dir.path())).await.unwrap();
    let open = lsp
        .notify_detached(
            "textDocument/didOpen",
            json!({
                "textDocument": { "uri": uri, "languageId": "fish", "version": 1, "text": text }
            }),
        )
        .await;

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    lsp.notify("textDocument/didClose", json!({ "textDocument": { "uri": uri } }))
        .await;
    open.await.unwrap();

    let published = lsp.drain_notifications(PUBLISH).await;
    assert_eq!(published.len(), 1, "only the clear from didClose: {published:?}");
    assert_eq!(published[0]["diagnostics"], json!([]));
}

#[tokio::test]
async fn test_newer_lint_wins_over_slower_older_one() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("race.fish");
    let text = "# slow\nset a=1\n";
    fs::write(&script, text).unwrap();
    let uri = Url::from_file_path(&script).unwrap();

    let mut lsp = LspHarness::new();
    lsp.initialize(dir.path(), slow_checker_options(dir.path())).await.unwrap();
    let open = lsp
        .notify_detached(
            "textDocument/didOpen",
            json!({
                "textDocument": { "uri": uri, "languageId": "fish", "version": 1, "text": text }
            }),
        )
        .await;

    // The first run has read the broken text and is sleeping; fix the file.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    fs::write(&script, "echo fixed\n").unwrap();
    lsp.notify(
        "textDocument/didChange",
        json!({
            "textDocument": { "uri": uri, "version": 2 },
            "contentChanges": [{ "text": "echo fixed\n" }],
        }),
    )
    .await;
    lsp.notify("textDocument/didSave", json!({ "textDocument": { "uri": uri } }))
        .await;
    open.await.unwrap();

    let published = lsp.drain_notifications(PUBLISH).await;
    assert_eq!(published.len(), 1, "the slow first run must not publish: {published:?}");
    assert_eq!(published[0]["diagnostics"], json!([]));
    assert_eq!(published[0]["version"], json!(2));
    assert!(lsp.server().document(&uri).await.unwrap().saved);
}

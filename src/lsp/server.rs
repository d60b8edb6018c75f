//! Language server for fish scripts.
//!
//! Routes editor lifecycle events to the lint pipeline and formatting
//! requests to the format pipeline:
//! - open and save lint the document and publish its full diagnostic set
//! - close clears the document's diagnostics
//! - document and range formatting run the formatter on the stored text

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;
use tower_lsp::jsonrpc::{Error as JsonRpcError, Result as JsonRpcResult};
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use crate::config::{FishlintConfig, FishlintLspOptions};
use crate::document::TextDocument;
use crate::format::FormatPipeline;
use crate::lint::{LintPipeline, LintRequest, is_fish_document};
use crate::lsp::types::{DocumentEntry, LintGenerations};
use crate::process::{ProcessRunner, TokioProcessRunner};
use crate::version::{FishVersion, probe_version};

pub struct FishLanguageServer {
    client: Client,
    runner: Arc<dyn ProcessRunner>,
    /// Config file given on the command line, if any
    config_path: Option<String>,
    config: Arc<RwLock<FishlintConfig>>,
    /// Working directory for the external tools
    workspace_root: Arc<RwLock<Option<PathBuf>>>,
    /// Document store for open files
    documents: Arc<RwLock<HashMap<Url, DocumentEntry>>>,
    generations: Arc<LintGenerations>,
    fish_version: Arc<RwLock<Option<FishVersion>>>,
}

impl FishLanguageServer {
    pub fn new(client: Client, config_path: Option<&str>) -> Self {
        Self::with_runner(client, config_path, Arc::new(TokioProcessRunner::new()))
    }

    pub fn with_runner(client: Client, config_path: Option<&str>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            client,
            runner,
            config_path: config_path.map(str::to_string),
            config: Arc::new(RwLock::new(FishlintConfig::default())),
            workspace_root: Arc::new(RwLock::new(None)),
            documents: Arc::new(RwLock::new(HashMap::new())),
            generations: Arc::new(LintGenerations::new()),
            fish_version: Arc::new(RwLock::new(None)),
        }
    }

    /// Snapshot of an open document.
    pub async fn document(&self, uri: &Url) -> Option<DocumentEntry> {
        self.documents.read().await.get(uri).cloned()
    }

    /// fish version found during initialization.
    pub async fn fish_version(&self) -> Option<FishVersion> {
        self.fish_version.read().await.clone()
    }

    pub async fn config(&self) -> FishlintConfig {
        self.config.read().await.clone()
    }

    /// Lint a document and replace its published diagnostics.
    async fn lint_and_publish(&self, uri: Url) {
        let config = self.config.read().await.clone();
        if !config.enable_linting {
            return;
        }

        // Snapshot and generation are taken under the same lock `did_close`
        // needs, so a close either happens first or retires this run.
        let (entry, generation) = {
            let documents = self.documents.read().await;
            let Some(entry) = documents.get(&uri).cloned() else {
                return;
            };
            let request = LintRequest {
                uri: &uri,
                text: &entry.text,
                language_id: &entry.language_id,
                saved: entry.saved,
            };
            if !request.is_eligible() {
                log::debug!("Not linting {uri}");
                return;
            }
            (entry, self.generations.begin(&uri).await)
        };

        let request = LintRequest {
            uri: &uri,
            text: &entry.text,
            language_id: &entry.language_id,
            saved: entry.saved,
        };
        let root = self.workspace_root.read().await.clone();
        let pipeline = LintPipeline::new(self.runner.clone(), &config).with_cwd(root);
        let outcome = pipeline.lint(&request).await;

        // Held until published so a close cannot slip in between.
        let _documents = self.documents.read().await;
        if !self.generations.is_current(&uri, generation).await {
            log::debug!("Discarding stale lint result for {uri}");
            return;
        }

        match outcome {
            Ok(Some(diagnostics)) => {
                self.client
                    .publish_diagnostics(uri, diagnostics, Some(entry.version))
                    .await;
            }
            Ok(None) => {}
            Err(e) => {
                log::error!("Failed to lint {uri}: {e}");
                self.client
                    .show_message(MessageType::ERROR, format!("fishlint: linting unavailable: {e}"))
                    .await;
                // Unknown is not clean, but stale errors would be worse.
                self.client
                    .publish_diagnostics(uri, Vec::new(), Some(entry.version))
                    .await;
            }
        }
    }

    async fn format_document(&self, uri: &Url, range: Option<Range>) -> JsonRpcResult<Option<Vec<TextEdit>>> {
        let config = self.config.read().await.clone();
        if !config.enable_formatting {
            return Ok(None);
        }
        let Some(entry) = self.document(uri).await else {
            log::debug!("Formatting requested for unknown document {uri}");
            return Ok(None);
        };
        if !is_fish_document(uri, &entry.language_id) {
            return Ok(None);
        }

        let root = self.workspace_root.read().await.clone();
        let pipeline = FormatPipeline::new(self.runner.clone(), &config).with_cwd(root);

        // A cancelled request drops this future; the formatter process is
        // left to finish and its output goes nowhere.
        match pipeline.format(&entry.text, range).await {
            Ok(Some(edit)) => {
                if TextDocument::new(&entry.text).slice(edit.range) == edit.new_text {
                    Ok(Some(Vec::new()))
                } else {
                    Ok(Some(vec![edit.into()]))
                }
            }
            Ok(None) => Ok(None),
            Err(e) => {
                log::error!("Failed to format {uri}: {e}");
                self.client
                    .show_message(MessageType::ERROR, format!("fishlint: formatting unavailable: {e}"))
                    .await;
                Ok(None)
            }
        }
    }
}

/// Workspace root from `rootUri`, falling back to the first workspace folder.
fn workspace_root(params: &InitializeParams) -> Option<PathBuf> {
    params
        .root_uri
        .as_ref()
        .and_then(|uri| uri.to_file_path().ok())
        .or_else(|| {
            params
                .workspace_folders
                .as_ref()
                .and_then(|folders| folders.first())
                .and_then(|folder| folder.uri.to_file_path().ok())
        })
}

fn load_config(explicit: Option<&str>, root: Option<&Path>) -> FishlintConfig {
    if let Some(path) = explicit {
        return match FishlintConfig::load(Path::new(path)) {
            Ok(config) => {
                log::info!("Loaded fishlint config from: {path}");
                config
            }
            Err(e) => {
                log::warn!("{e}; using defaults");
                FishlintConfig::default()
            }
        };
    }

    let Some(root) = root else {
        return FishlintConfig::default();
    };
    match FishlintConfig::discover(root) {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            log::warn!("{e}; using defaults");
            FishlintConfig::default()
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for FishLanguageServer {
    async fn initialize(&self, params: InitializeParams) -> JsonRpcResult<InitializeResult> {
        log::info!("Initializing fishlint language server");

        let options = match params.initialization_options.clone() {
            Some(value) => serde_json::from_value::<FishlintLspOptions>(value).unwrap_or_else(|e| {
                log::warn!("Ignoring invalid initialization options: {e}");
                FishlintLspOptions::default()
            }),
            None => FishlintLspOptions::default(),
        };

        let root = workspace_root(&params);
        let explicit = options.config_path.as_deref().or(self.config_path.as_deref());
        let mut config = load_config(explicit, root.as_deref());
        options.apply_to(&mut config);

        let version = probe_version(self.runner.as_ref(), &config, root.clone())
            .await
            .map_err(|e| {
                log::error!("fish version probe failed: {e}");
                let mut error = JsonRpcError::internal_error();
                error.message = format!("fishlint cannot start: {e}").into();
                error
            })?;
        log::info!("Using {version}");

        let enable_formatting = config.enable_formatting;
        *self.fish_version.write().await = Some(version);
        *self.workspace_root.write().await = root;
        *self.config.write().await = config;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(TextDocumentSyncOptions {
                    open_close: Some(true),
                    change: Some(TextDocumentSyncKind::FULL),
                    will_save: None,
                    will_save_wait_until: None,
                    save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                        include_text: Some(false),
                    })),
                })),
                document_formatting_provider: Some(OneOf::Left(enable_formatting)),
                document_range_formatting_provider: Some(OneOf::Left(enable_formatting)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "fishlint".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        log::info!("fishlint language server initialized");

        let message = match self.fish_version().await {
            Some(version) => format!("fishlint started ({version})"),
            None => "fishlint started".to_string(),
        };
        self.client.log_message(MessageType::INFO, message).await;
    }

    async fn shutdown(&self) -> JsonRpcResult<()> {
        log::info!("Shutting down fishlint language server");
        Ok(())
    }

    // Editors replay didOpen for documents that were already open when the
    // server started, so this also covers the initial lint pass.
    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        self.documents
            .write()
            .await
            .insert(doc.uri.clone(), DocumentEntry::opened(doc.text, doc.language_id, doc.version));

        self.lint_and_publish(doc.uri).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;

        // FULL sync: the last change carries the whole text
        let Some(change) = params.content_changes.into_iter().last() else {
            return;
        };
        if let Some(entry) = self.documents.write().await.get_mut(&uri) {
            entry.text = change.text;
            entry.version = params.text_document.version;
            entry.saved = false;
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri;
        if let Some(entry) = self.documents.write().await.get_mut(&uri) {
            if let Some(text) = params.text {
                entry.text = text;
            }
            entry.saved = true;
        }

        self.lint_and_publish(uri).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents.write().await.remove(&uri);
        self.generations.retire(&uri).await;

        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    async fn formatting(&self, params: DocumentFormattingParams) -> JsonRpcResult<Option<Vec<TextEdit>>> {
        self.format_document(&params.text_document.uri, None).await
    }

    async fn range_formatting(&self, params: DocumentRangeFormattingParams) -> JsonRpcResult<Option<Vec<TextEdit>>> {
        self.format_document(&params.text_document.uri, Some(params.range))
            .await
    }
}

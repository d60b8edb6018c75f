//! State kept by the language server between requests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tower_lsp::lsp_types::Url;

/// An open document as the editor last described it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEntry {
    pub text: String,
    pub language_id: String,
    pub version: i32,
    /// False after an edit until the next save.
    pub saved: bool,
}

impl DocumentEntry {
    pub fn opened(text: String, language_id: String, version: i32) -> Self {
        Self {
            text,
            language_id,
            version,
            saved: true,
        }
    }
}

/// Per-document lint generations.
///
/// Every lint run takes a fresh generation for its document and only
/// publishes if that generation is still the newest when it finishes, so a
/// slow run can never overwrite the result of a later, faster one. Closing a
/// document retires its generation so late results are dropped too.
/// Generations come from one counter shared by all documents, so a reopened
/// document never reuses a number handed out before it was closed.
#[derive(Debug, Default)]
pub struct LintGenerations {
    counter: AtomicU64,
    latest: Mutex<HashMap<Url, u64>>,
}

impl LintGenerations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new run for `uri` and return its generation.
    pub async fn begin(&self, uri: &Url) -> u64 {
        let mut latest = self.latest.lock().await;
        let generation = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        latest.insert(uri.clone(), generation);
        generation
    }

    pub async fn is_current(&self, uri: &Url, generation: u64) -> bool {
        self.latest.lock().await.get(uri) == Some(&generation)
    }

    /// Forget `uri`; any run still in flight for it becomes stale.
    pub async fn retire(&self, uri: &Url) {
        self.latest.lock().await.remove(uri);
    }
}

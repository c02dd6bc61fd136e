use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use drl_core::{DrlEngine, TextEdit};
use ropey::Rope;
use tokio::task::JoinHandle;
use tower_lsp::Client;
use tower_lsp::lsp_types::Url;

/// An open DRL document and the edits not yet analysed.
#[derive(Debug, Default)]
pub(crate) struct Document {
    pub(crate) content: Rope,
    pub(crate) version: i32,
    /// Version the next analysis may start from; `None` forces a full parse.
    pub(crate) analyzed_version: Option<i32>,
    /// Changes since `analyzed_version`, in the order they were applied.
    pub(crate) pending_edits: Vec<TextEdit>,
}

impl Document {
    pub(crate) fn new(text: &str, version: i32) -> Self {
        Self {
            content: Rope::from_str(text),
            version,
            analyzed_version: None,
            pending_edits: Vec::new(),
        }
    }

    /// Claim the current snapshot for analysis: the text, its version and,
    /// when an earlier analysed snapshot exists, the edits leading from it.
    pub(crate) fn take_snapshot(&mut self) -> Snapshot {
        let base = self.analyzed_version.map(|v| (v, std::mem::take(&mut self.pending_edits)));
        self.pending_edits.clear();
        self.analyzed_version = Some(self.version);
        Snapshot {
            text: self.content.to_string(),
            version: self.version,
            base,
        }
    }
}

pub(crate) struct Snapshot {
    pub(crate) text: String,
    pub(crate) version: i32,
    pub(crate) base: Option<(i32, Vec<TextEdit>)>,
}

/// Primary LSP server state shared across handlers.
pub(crate) struct DrlLanguageServer {
    pub(crate) client: Client,
    pub(crate) documents: Arc<DashMap<Url, Document>>,
    pub(crate) engine: Arc<DrlEngine>,
    pub(crate) sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl DrlLanguageServer {
    pub(crate) fn new(client: Client) -> Self {
        Self {
            client,
            documents: Arc::new(DashMap::new()),
            engine: Arc::new(DrlEngine::default()),
            sweeper: Mutex::new(None),
        }
    }
}

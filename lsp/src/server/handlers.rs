use tower_lsp::LanguageServer;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tracing::{debug, info};

use super::state::{Document, DrlLanguageServer};
use super::text::apply_change;

#[tower_lsp::async_trait]
impl LanguageServer for DrlLanguageServer {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        info!("DRL language server initializing with params: {:?}", params.root_uri);

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(TextDocumentSyncOptions {
                    open_close: Some(true),
                    change: Some(TextDocumentSyncKind::INCREMENTAL),
                    ..Default::default()
                })),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "DRL Language Server".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        info!("DRL language server initialized");
        let _ = self
            .client
            .log_message(MessageType::INFO, "DRL language server started")
            .await;
        self.load_config().await;
        self.restart_sweeper();
    }

    async fn shutdown(&self) -> Result<()> {
        info!("DRL language server shutting down");
        if let Some(sweeper) = self.sweeper.lock().unwrap_or_else(|e| e.into_inner()).take() {
            sweeper.abort();
        }
        Ok(())
    }

    async fn did_change_configuration(&self, _params: DidChangeConfigurationParams) {
        self.load_config().await;
        // cached results were dropped; refresh what the client shows
        let uris: Vec<Url> = self.documents.iter().map(|entry| entry.key().clone()).collect();
        for uri in uris {
            if let Some(mut doc) = self.documents.get_mut(&uri) {
                doc.analyzed_version = None;
                doc.pending_edits.clear();
            }
            self.schedule_diagnostics(uri);
        }
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let document = Document::new(&params.text_document.text, params.text_document.version);
        self.documents.insert(uri.clone(), document);
        self.schedule_diagnostics(uri);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        {
            let mut doc = self.documents.entry(uri.clone()).or_default();
            doc.version = params.text_document.version;
            for change in &params.content_changes {
                match apply_change(&mut doc.content, change) {
                    Some(edit) => doc.pending_edits.push(edit),
                    None => {
                        // whole-document replacement: nothing to reparse incrementally from
                        doc.analyzed_version = None;
                        doc.pending_edits.clear();
                    }
                }
            }
            debug!(uri = %uri, version = doc.version, pending = doc.pending_edits.len(), "document changed");
        }
        self.schedule_diagnostics(uri);
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents.remove(&uri);
        self.engine.close_document(uri.as_str());
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }
}

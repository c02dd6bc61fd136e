use std::sync::Arc;

use dashmap::DashMap;
use drl_core::DrlEngine;
use tokio::task;
use tower_lsp::Client;
use tower_lsp::lsp_types::{PublishDiagnosticsParams, Url, notification};
use tracing::{debug, warn};

use super::convert::to_lsp_diagnostic;
use super::state::{Document, DrlLanguageServer};

impl DrlLanguageServer {
    /// Re-analyse `uri` once edits stop arriving for the debounce delay.
    pub(crate) fn schedule_diagnostics(&self, uri: Url) {
        let documents = Arc::clone(&self.documents);
        let engine = Arc::clone(&self.engine);
        let client = self.client.clone();
        let key = uri.to_string();
        self.engine
            .debouncer()
            .schedule(&key, move || publish_diagnostics(documents, engine, client, uri));
    }
}

async fn publish_diagnostics(documents: Arc<DashMap<Url, Document>>, engine: Arc<DrlEngine>, client: Client, uri: Url) {
    let snapshot = match documents.get_mut(&uri) {
        Some(mut doc) => doc.take_snapshot(),
        None => return,
    };
    let version = snapshot.version;
    let document = uri.to_string();

    let analysis = task::spawn_blocking(move || match snapshot.base {
        Some((base_version, edits)) if !edits.is_empty() => {
            engine.analyze_edited(&document, base_version, version, &snapshot.text, &edits)
        }
        _ => engine.analyze(&document, version, &snapshot.text),
    })
    .await;
    let analysis = match analysis {
        Ok(analysis) => analysis,
        Err(err) => {
            warn!(uri = %uri, error = %err, "analysis task failed");
            return;
        }
    };

    let diagnostics = {
        let Some(doc) = documents.get(&uri) else {
            return;
        };
        if doc.version != version {
            debug!(uri = %uri, version, current = doc.version, "document changed during analysis, not publishing");
            return;
        }
        analysis
            .diagnostics
            .iter()
            .map(|d| to_lsp_diagnostic(&uri, &doc.content, d))
            .collect()
    };

    client
        .send_notification::<notification::PublishDiagnostics>(PublishDiagnosticsParams {
            uri,
            diagnostics,
            version: Some(version),
        })
        .await;
}

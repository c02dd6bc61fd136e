use tower_lsp::{LspService, Server};
use tracing_subscriber::EnvFilter;

use super::state::DrlLanguageServer;

const DEFAULT_LOG_FILTER: &str = "drl_lsp=info,drl_core=warn";

pub async fn run() {
    // stdout carries the protocol
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(DrlLanguageServer::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}

use std::sync::Arc;

use tokio::net::TcpListener;
use tracechain_ledger::Ledger;
use tracechain_store::JournalStore;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::router::build_router;

/// Tracechain HTTP server over a journal-backed ledger.
pub struct TracechainServer {
    config: ServerConfig,
    ledger: Arc<Ledger<JournalStore>>,
}

impl TracechainServer {
    /// Open (or create) the journal under `config.data_dir`.
    pub fn open(config: ServerConfig) -> ServerResult<Self> {
        let store = JournalStore::open_dir(&config.data_dir, config.journal_options())?;
        let ledger = Ledger::new(Arc::new(store), config.ledger.clone());
        Ok(Self {
            config,
            ledger: Arc::new(ledger),
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<Ledger<JournalStore>> {
        &self.ledger
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(AppState::new(Arc::clone(&self.ledger)))
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(
            addr = %self.config.bind_addr,
            data_dir = %self.config.data_dir.display(),
            "tracechain server listening"
        );
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

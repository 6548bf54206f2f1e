//! Shared application state.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::sessions::SessionStore;
use reportsage_chat::LLMConfig;
use reportsage_core::ReportSageConfig;
use reportsage_infer::EmbedderBackend;
use reportsage_store::IndexStore;

/// Shared application state accessible from all route handlers.
///
/// The index store is opened once at startup and lives here for the whole
/// process; chat turns never reload it.
pub struct AppState {
    pub config: ReportSageConfig,
    pub store: IndexStore,
    pub embedder: Arc<dyn EmbedderBackend>,
    pub llm_config: RwLock<LLMConfig>,
    pub sessions: SessionStore,
    pub http_client: reqwest::Client,
}

impl AppState {
    pub fn new(
        config: ReportSageConfig,
        store: IndexStore,
        embedder: Arc<dyn EmbedderBackend>,
    ) -> Self {
        let llm_config = LLMConfig::load(&config.data_paths.llm_config_file);

        Self {
            config,
            store,
            embedder,
            llm_config: RwLock::new(llm_config),
            sessions: SessionStore::new(),
            http_client: reqwest::Client::new(),
        }
    }
}

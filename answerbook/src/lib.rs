use std::sync::Arc;

use answerbook_core::{RemoteFileStore, UpsertError, UpsertSettings, Upserter};

pub mod cli;
pub mod commands;
pub mod logging;
pub mod server;

/// What every command and request handler works with.
///
/// The store is kept as a `Result` so the server can start without credentials and report
/// `ConfigMissing` per request instead.
pub struct AppContext {
    pub settings: UpsertSettings,
    pub store: anyhow::Result<Arc<dyn RemoteFileStore>>,
}

impl AppContext {
    pub fn new(settings: UpsertSettings, store: anyhow::Result<Arc<dyn RemoteFileStore>>) -> Self {
        AppContext { settings, store }
    }

    pub fn upserter(&self) -> Result<Upserter, UpsertError> {
        match &self.store {
            Ok(store) => Ok(Upserter::with_settings(store.clone(), self.settings.clone())),
            Err(e) => Err(UpsertError::ConfigMissing(format!("{:#}", e))),
        }
    }
}

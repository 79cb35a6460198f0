//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the message log and the chatter table, each behind its own lock,
//! so a chatter lookup never waits on log readers and vice versa.

use std::sync::Arc;

use crate::config::Config;
use crate::services::chatter::ChatterTable;
use crate::services::message_log::MessageLog;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub log: MessageLog,
    pub chatters: ChatterTable,
}

impl AppState {
    #[must_use]
    pub fn new(config: Config) -> Self {
        let log = MessageLog::new(config.welcome_message.clone());
        let chatters = ChatterTable::new(config.default_color.clone());
        Self { config: Arc::new(config), log, chatters }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;

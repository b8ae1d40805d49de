//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::GameHandle;
use crate::ws::session::SessionRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Channel into the authoritative game server
    pub game: GameHandle,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(config: Config, game: GameHandle) -> Self {
        Self {
            config: Arc::new(config),
            game,
            sessions: SessionRegistry::new(),
        }
    }
}

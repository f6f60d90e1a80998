//! Application state shared across routes

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::Config;
use crate::game::MatchRegistry;
use crate::matchmaking::Matchmaker;
use crate::store::MatchResult;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub matchmaker: Arc<Matchmaker>,
    pub match_registry: Arc<MatchRegistry>,
}

impl AppState {
    /// Build the application state. The returned receiver feeds the result
    /// recorder task; every match holds a sender clone.
    pub fn new(config: Config) -> (Self, mpsc::Receiver<MatchResult>) {
        let config = Arc::new(config);

        let match_registry = Arc::new(MatchRegistry::new());

        let (results_tx, results_rx) = mpsc::channel(256);

        let matchmaker = Arc::new(Matchmaker::new(
            match_registry.clone(),
            results_tx,
            config.game,
        ));

        (
            Self {
                config,
                matchmaker,
                match_registry,
            },
            results_rx,
        )
    }
}

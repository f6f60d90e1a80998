//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Shared secret for verifying JWTs issued by the auth service
    pub auth_jwt_secret: String,

    /// Base URL of the match results persistence service
    pub results_url: String,
    /// Service key for the results service (server only!)
    pub results_service_key: String,

    /// Allowed client origin for CORS
    pub client_origin: String,

    /// Game rule tunables
    pub game: GameSettings,
}

/// Game rule tunables, shared by every match
#[derive(Clone, Copy, Debug)]
pub struct GameSettings {
    /// Score a side must reach to win
    pub winning_score: u32,
    /// Simulation ticks per second
    pub tick_hz: u32,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            winning_score: 5,
            tick_hz: 60,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Render provides PORT env var, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            auth_jwt_secret: env::var("AUTH_JWT_SECRET")
                .map_err(|_| ConfigError::Missing("AUTH_JWT_SECRET"))?,

            results_url: env::var("RESULTS_URL")
                .map_err(|_| ConfigError::Missing("RESULTS_URL"))?,
            results_service_key: env::var("RESULTS_SERVICE_KEY")
                .map_err(|_| ConfigError::Missing("RESULTS_SERVICE_KEY"))?,

            client_origin: env::var("CLIENT_ORIGIN")
                .map_err(|_| ConfigError::Missing("CLIENT_ORIGIN"))?,

            game: GameSettings {
                winning_score: parse_or_default("GAME_WINNING_SCORE", 5)?,
                tick_hz: parse_or_default("GAME_TICK_HZ", 60)?,
            },
        })
    }
}

fn parse_or_default(var: &'static str, default: u32) -> Result<u32, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidNumber(var)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid numeric value for environment variable: {0}")]
    InvalidNumber(&'static str),
}

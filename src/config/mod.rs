//! Configuration module - environment variable parsing

mod game;

pub use game::GameConfig;

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS (empty = any origin)
    pub client_origins: Vec<String>,

    /// Simulation ticks per second
    pub simulation_tps: u32,
    /// State broadcasts per second
    pub broadcast_tps: u32,
    /// Fixed world seed; random when unset
    pub world_seed: Option<u64>,

    /// Gameplay tunables
    pub game: GameConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".to_string())
        };

        let client_origins = env::var("CLIENT_ORIGIN")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let simulation_tps = parse_var("SIMULATION_TPS")?.unwrap_or(60);
        let broadcast_tps = parse_var("BROADCAST_TPS")?.unwrap_or(20);
        if simulation_tps == 0 {
            return Err(ConfigError::Invalid("SIMULATION_TPS"));
        }
        if broadcast_tps == 0 || broadcast_tps > simulation_tps {
            return Err(ConfigError::Invalid("BROADCAST_TPS"));
        }

        let mut game = GameConfig::default();
        if let Some(goal) = parse_var::<u32>("GOAL_SCORE")? {
            if goal == 0 {
                return Err(ConfigError::Invalid("GOAL_SCORE"));
            }
            game.goal_score = goal;
        }

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            client_origins,
            simulation_tps,
            broadcast_tps,
            world_seed: parse_var("WORLD_SEED")?,
            game,
        })
    }
}

/// Parse an optional environment variable
fn parse_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_var_reports_variable_name() {
        env::set_var("ARENA_TEST_BAD_NUMBER", "sixty");
        let err = parse_var::<u32>("ARENA_TEST_BAD_NUMBER").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("ARENA_TEST_BAD_NUMBER")));
        assert_eq!(
            err.to_string(),
            "Invalid value for environment variable: ARENA_TEST_BAD_NUMBER"
        );
    }

    #[test]
    fn parse_var_missing_is_none() {
        let parsed = parse_var::<u64>("ARENA_TEST_DEFINITELY_UNSET").unwrap();
        assert_eq!(parsed, None);
    }

    #[test]
    fn parse_var_trims_whitespace() {
        env::set_var("ARENA_TEST_PADDED", " 42 ");
        assert_eq!(parse_var::<u64>("ARENA_TEST_PADDED").unwrap(), Some(42));
    }
}

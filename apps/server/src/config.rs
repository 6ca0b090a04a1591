//! Server configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults.

use cantina_core::menu::OverrideStrategy;
use std::env;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// Path to the SQLite database file
    pub database_path: String,

    /// How `manual_override` menu rules interact with other rules.
    ///
    /// The product decision is still open, so it ships as configuration:
    /// `MENU_OVERRIDE_STRATEGY=conjunctive` (default) or `short_circuit`.
    pub override_strategy: OverrideStrategy,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = ServerConfig {
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("HTTP_PORT".to_string()))?,

            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "./cantina.db".to_string()),

            override_strategy: match env::var("MENU_OVERRIDE_STRATEGY")
                .unwrap_or_else(|_| "conjunctive".to_string())
                .as_str()
            {
                "conjunctive" => OverrideStrategy::Conjunctive,
                "short_circuit" => OverrideStrategy::ShortCircuit,
                _ => {
                    return Err(ConfigError::InvalidValue(
                        "MENU_OVERRIDE_STRATEGY".to_string(),
                    ))
                }
            },
        };

        Ok(config)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        // Only meaningful when the env vars are unset, which is the normal
        // test environment.
        if env::var("HTTP_PORT").is_err() {
            let config = ServerConfig::load().unwrap();
            assert_eq!(config.http_port, 8080);
            assert_eq!(config.override_strategy, OverrideStrategy::Conjunctive);
        }
    }
}

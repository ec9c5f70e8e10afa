use crate::error::VerificationError;
use config::{Config, Environment};
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub run_migrations: bool,
}

/// Secondary signal used when a variant-less entry faces several candidates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisambiguationStrategy {
    #[default]
    Quantity,
    Description,
    Disabled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingConfig {
    #[serde(default)]
    pub disambiguation: DisambiguationStrategy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/deliveries".to_string(),
                max_connections: 10,
                run_migrations: true,
            },
            matching: MatchingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Defaults, then VERIFY__* variables; SERVER_HOST / SERVER_PORT / DATABASE_URL win when set
    pub fn from_env() -> Result<Self, VerificationError> {
        let defaults = AppConfig::default();

        let settings = Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", i64::from(defaults.server.port))?
            .set_default("database.url", defaults.database.url)?
            .set_default("database.max_connections", i64::from(defaults.database.max_connections))?
            .set_default("database.run_migrations", defaults.database.run_migrations)?
            .set_default("matching.disambiguation", "quantity")?
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .add_source(Environment::with_prefix("VERIFY").separator("__").try_parsing(true))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_strategy_is_quantity() {
        assert_eq!(
            AppConfig::default().matching.disambiguation,
            DisambiguationStrategy::Quantity
        );
    }

    #[test]
    fn strategy_deserializes_from_snake_case() {
        let cfg: MatchingConfig =
            serde_json::from_str(r#"{"disambiguation":"description"}"#).unwrap();
        assert_eq!(cfg.disambiguation, DisambiguationStrategy::Description);
    }
}

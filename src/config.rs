use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::error::ReviewError;

pub const DEFAULT_CONFIG_PATH: &str = "review-assigner.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub server_host: String,
    pub server_port: u16,
    pub request_timeout_secs: u64,
    pub shutdown_timeout_secs: u64,
}

impl AppConfig {
    /// Load configuration from defaults, an optional TOML file and the
    /// environment, later sources overriding earlier ones.
    pub fn load(path: &Path) -> Result<Self, ReviewError> {
        let settings = Config::builder()
            .set_default("database_url", "sqlite://review-assigner.db")?
            .set_default("database_max_connections", 5)?
            .set_default("server_host", "0.0.0.0")?
            .set_default("server_port", 8080)?
            .set_default("request_timeout_secs", 30)?
            .set_default("shutdown_timeout_secs", 5)?
            .add_source(File::from(path).required(false))
            .add_source(Environment::default().try_parsing(true))
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ReviewError> {
        if self.database_url.trim().is_empty() {
            return Err(ReviewError::ConfigError(
                "database_url must not be empty".to_string(),
            ));
        }
        if self.database_max_connections == 0 {
            return Err(ReviewError::ConfigError(
                "database_max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ReviewError> {
        format!("{}:{}", self.server_host, self.server_port)
            .parse()
            .map_err(|e| {
                ReviewError::ConfigError(format!(
                    "Invalid listen address {}:{}: {}",
                    self.server_host, self.server_port, e
                ))
            })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://review-assigner.db".to_string(),
            database_max_connections: 5,
            server_host: "0.0.0.0".to_string(),
            server_port: 8080,
            request_timeout_secs: 30,
            shutdown_timeout_secs: 5,
        }
    }
}

//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::{net::IpAddr, path::PathBuf};

use crate::data::ActorType;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub actor: ActorConfig,
    pub federation: FederationConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 9810)
    pub port: u16,
    /// Public domain (e.g., "social.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the base URL for the instance
    ///
    /// # Returns
    /// Full URL like "https://social.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// The local actor provisioned at startup
///
/// Key material is read from disk as opaque text. It is never generated here.
#[derive(Debug, Clone, Deserialize)]
pub struct ActorConfig {
    pub handle: String,
    #[serde(default = "default_display_name")]
    pub display_name: String,
    #[serde(default)]
    pub actor_type: ActorType,
    pub summary: Option<String>,
    pub private_key_path: Option<PathBuf>,
    pub public_key_path: Option<PathBuf>,
}

fn default_display_name() -> String {
    "Podcast Performance".to_string()
}

/// Collection paging and publishing limits
#[derive(Debug, Clone, Deserialize)]
pub struct FederationConfig {
    /// Items per outbox/followers page served to the substrate
    pub page_size: u32,
    /// Upper bound for any caller-supplied page size
    pub max_page_size: u32,
    /// Maximum post length in characters
    pub max_post_chars: usize,
    /// Capacity of the in-process delivery queue
    pub delivery_queue_capacity: usize,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            max_page_size: 100,
            max_post_chars: 5000,
            delivery_queue_capacity: 256,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (PODPERF__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 9810)?
            .set_default("server.protocol", "http")?
            .set_default("database.path", "data/podcast-performance.db")?
            .set_default("actor.actor_type", "Person")?
            .set_default("federation.page_size", 10)?
            .set_default("federation.max_page_size", 100)?
            .set_default("federation.max_post_chars", 5000)?
            .set_default("federation.delivery_queue_capacity", 256)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("PODPERF")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        use crate::error::AppError;

        if self.actor.handle.trim().is_empty() {
            return Err(AppError::Config("actor.handle must not be empty".to_string()));
        }

        let federation = &self.federation;
        if federation.page_size == 0 || federation.page_size > federation.max_page_size {
            return Err(AppError::Config(format!(
                "federation.page_size must be between 1 and federation.max_page_size ({})",
                federation.max_page_size
            )));
        }

        if federation.max_post_chars == 0 {
            return Err(AppError::Config(
                "federation.max_post_chars must be greater than 0".to_string(),
            ));
        }

        if federation.delivery_queue_capacity == 0 {
            return Err(AppError::Config(
                "federation.delivery_queue_capacity must be greater than 0".to_string(),
            ));
        }

        if is_local_server_domain(&self.server.domain) {
            if !self.server.protocol.eq_ignore_ascii_case("https") {
                tracing::warn!(
                    domain = %self.server.domain,
                    "Serving over plain http for local development"
                );
            }
        } else if !self.server.protocol.eq_ignore_ascii_case("https") {
            return Err(AppError::Config(
                "server.protocol must be https for non-local server domains".to_string(),
            ));
        }

        Ok(())
    }
}

fn normalized_server_host(domain: &str) -> String {
    let trimmed = domain.trim();
    let parsed_host = url::Url::parse(&format!("http://{trimmed}"))
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()));
    let host = parsed_host.unwrap_or_else(|| trimmed.to_string());
    host.trim_end_matches('.').to_ascii_lowercase()
}

fn is_local_server_domain(domain: &str) -> bool {
    let host = normalized_server_host(domain);
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 9810,
                domain: "localhost".to_string(),
                protocol: "http".to_string(),
            },
            database: DatabaseConfig {
                path: PathBuf::from("/tmp/podperf-test.db"),
            },
            actor: ActorConfig {
                handle: "fresh7at7".to_string(),
                display_name: "Fresh".to_string(),
                actor_type: ActorType::Person,
                summary: None,
                private_key_path: None,
                public_key_path: None,
            },
            federation: FederationConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    #[test]
    fn validate_accepts_http_on_localhost() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_http_for_non_local_domain() {
        let mut config = valid_config();
        config.server.domain = "podcastperformance.com".to_string();

        let error = config
            .validate()
            .expect_err("public domains must require https");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("server.protocol must be https")
        ));
    }

    #[test]
    fn validate_rejects_page_size_above_maximum() {
        let mut config = valid_config();
        config.federation.page_size = 500;

        let error = config.validate().expect_err("page size over the cap must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message) if message.contains("federation.page_size")
        ));
    }

    #[test]
    fn validate_rejects_blank_handle() {
        let mut config = valid_config();
        config.actor.handle = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn base_url_joins_protocol_and_domain() {
        let mut config = valid_config();
        config.server.domain = "podcastperformance.com".to_string();
        config.server.protocol = "https".to_string();
        assert_eq!(config.server.base_url(), "https://podcastperformance.com");
    }
}

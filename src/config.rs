use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub catalog: CatalogConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot API token issued by @BotFather
    pub token: String,
    /// The one group chat the bot serves
    pub master_chat_id: i64,
    /// Member allowed to run admin commands (new meeting, stage changes)
    pub master_user_id: i64,
    /// Long-poll timeout in seconds for getUpdates
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

fn default_poll_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Google Books volumes endpoint
    #[serde(default = "default_catalog_url")]
    pub base_url: String,
    pub api_key: String,
    /// Cap on search results shown to a member
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

fn default_catalog_url() -> String {
    "https://www.googleapis.com/books/v1".to_string()
}

fn default_max_results() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite URL, e.g. "sqlite://bookclub.db?mode=rwc"
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("telegram.poll_timeout_secs", 30)?
            .set_default("catalog.base_url", default_catalog_url())?
            .set_default("catalog.max_results", 10)?
            .set_default("database.url", "sqlite://bookclub.db?mode=rwc")?
            .set_default("database.max_connections", 5)?
            .set_default("logging.level", "info")?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("TOME_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (TOME_TELEGRAM__TOKEN, etc.)
            .add_source(
                Environment::with_prefix("TOME")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_optional_fields() {
        let cfg: AppConfig = Config::builder()
            .set_default("telegram.token", "test-token")
            .unwrap()
            .set_default("telegram.master_chat_id", -100)
            .unwrap()
            .set_default("telegram.master_user_id", 42)
            .unwrap()
            .set_default("catalog.api_key", "key")
            .unwrap()
            .set_default("database.url", "sqlite::memory:")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.telegram.poll_timeout_secs, 30);
        assert_eq!(cfg.catalog.max_results, 10);
        assert_eq!(cfg.database.max_connections, 5);
        assert_eq!(cfg.logging.level, "info");
    }
}

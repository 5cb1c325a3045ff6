//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Ledger configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Webhook processing configuration.
    #[serde(default)]
    pub webhook: WebhookConfig,
}

/// Ledger configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// First transaction number handed out by a fresh store.
    #[serde(default = "default_transaction_number_start")]
    pub transaction_number_start: i64,
}

fn default_transaction_number_start() -> i64 {
    1
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            transaction_number_start: default_transaction_number_start(),
        }
    }
}

/// Webhook processing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// How long the per-event exclusive lock is held, in seconds.
    #[serde(default = "default_lock_ttl_secs")]
    pub lock_ttl_secs: u64,
}

fn default_lock_ttl_secs() -> u64 {
    60
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            lock_ttl_secs: default_lock_ttl_secs(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Layering: `config/default` then `config/{RUN_MODE}` then `KEEL__*`
    /// environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("KEEL").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig {
            ledger: LedgerConfig::default(),
            webhook: WebhookConfig::default(),
        };
        assert_eq!(config.ledger.transaction_number_start, 1);
        assert_eq!(config.webhook.lock_ttl_secs, 60);
    }

    #[test]
    fn test_load_from_env() {
        temp_env::with_vars(
            [
                ("KEEL__LEDGER__TRANSACTION_NUMBER_START", Some("1000")),
                ("KEEL__WEBHOOK__LOCK_TTL_SECS", Some("5")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.ledger.transaction_number_start, 1000);
                assert_eq!(config.webhook.lock_ttl_secs, 5);
            },
        );
    }
}

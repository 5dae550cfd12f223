use anyhow::{bail, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for call transactions
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CallTransactionsConfig {
    /// Transaction engine settings
    pub transactions: TransactionConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TransactionConfig {
    /// Watchdog applied to every transaction, in milliseconds
    pub timeout_limit_ms: u64,
}

impl TransactionConfig {
    pub fn timeout_limit(&self) -> Duration {
        Duration::from_millis(self.timeout_limit_ms)
    }
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            timeout_limit_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is not set
    pub log_level: String,
    /// Emit JSON structured logs instead of human-readable lines
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: true,
        }
    }
}

impl CallTransactionsConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (call-transactions.toml)
    /// 3. Environment variables (prefixed with CALL_TRANSACTIONS_, `__` between sections)
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder();

        if Path::new("call-transactions.toml").exists() {
            builder = builder.add_source(File::with_name("call-transactions"));
        }

        builder = builder.add_source(
            Environment::with_prefix("CALL_TRANSACTIONS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: CallTransactionsConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an explicit file, without environment overrides
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: CallTransactionsConfig = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.transactions.timeout_limit_ms == 0 {
            bail!("transactions.timeout_limit_ms must be greater than zero");
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<CallTransactionsConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        // Load .env file first
        let _ = CallTransactionsConfig::load_env_file();
        CallTransactionsConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static CallTransactionsConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CallTransactionsConfig::default();
        assert_eq!(config.transactions.timeout_limit(), Duration::from_secs(5));
        assert_eq!(config.observability.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_reload_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("call-transactions.toml");

        let mut config = CallTransactionsConfig::default();
        config.transactions.timeout_limit_ms = 1500;
        config.observability.json_logs = false;
        config.save_to_file(&path).unwrap();

        let loaded = CallTransactionsConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.transactions.timeout_limit(), Duration::from_millis(1500));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[transactions]\ntimeout_limit_ms = 250\n").unwrap();

        let loaded = CallTransactionsConfig::load_from(&path).unwrap();
        assert_eq!(loaded.transactions.timeout_limit_ms, 250);
        assert_eq!(loaded.observability, ObservabilityConfig::default());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zero.toml");
        std::fs::write(&path, "[transactions]\ntimeout_limit_ms = 0\n").unwrap();

        let err = CallTransactionsConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("timeout_limit_ms"));
    }
}

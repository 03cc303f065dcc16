//! Configuration Loader
//!
//! Environment-aware configuration loading. Layers, lowest to highest
//! precedence: built-in defaults, `stratus.toml`, `stratus.{environment}.toml`,
//! then `STRATUS_`-prefixed environment variables (`__` separating path
//! segments, e.g. `STRATUS_ORCHESTRATION__RETRY__MAX_ATTEMPTS`). Missing files
//! are fine; every layer is optional.

use config::{Config, Environment, File};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use super::error::ConfigResult;
use super::StratusConfig;

const BASE_CONFIG_FILE: &str = "stratus.toml";

/// Loaded-and-validated configuration plus the environment it was loaded for.
pub struct ConfigManager {
    config: StratusConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection.
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory (default: `./config`).
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load with an explicit environment. Tests use this to avoid touching
    /// process-global environment variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));
        debug!(
            environment = %environment,
            directory = %config_directory.display(),
            "Loading configuration"
        );

        let config = Self::build_config(&config_directory, environment)?;
        config.validate()?;

        info!(
            environment = %environment,
            retry_max_attempts = config.orchestration.retry.max_attempts,
            provider_ack_timeout_ms = config.orchestration.providers.ack_timeout_ms,
            "⚙️ CONFIG: Configuration loaded"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    pub fn config(&self) -> &StratusConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Environment detection: `STRATUS_ENV`, then `APP_ENV`, then
    /// `development`.
    fn detect_environment() -> String {
        env::var("STRATUS_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn build_config(config_directory: &Path, environment: &str) -> ConfigResult<StratusConfig> {
        let mut builder = Config::builder();

        let base = config_directory.join(BASE_CONFIG_FILE);
        if base.exists() {
            debug!(path = %base.display(), "Adding base configuration file");
            builder = builder.add_source(File::from(base));
        }

        let overlay = config_directory.join(format!("stratus.{environment}.toml"));
        if overlay.exists() {
            debug!(path = %overlay.display(), "Adding environment overlay");
            builder = builder.add_source(File::from(overlay));
        }

        builder = builder.add_source(Environment::with_prefix("STRATUS").separator("__"));

        let mut config: StratusConfig = builder.build()?.try_deserialize()?;
        // The detected environment wins over anything a file claims.
        config.system.environment = environment.to_string();
        Ok(config)
    }
}

static GLOBAL_CONFIG: OnceLock<Arc<ConfigManager>> = OnceLock::new();

impl ConfigManager {
    /// Process-wide configuration, loaded on first use. Falls back to defaults
    /// when loading fails so callers cannot be left without a configuration.
    pub fn global() -> Arc<ConfigManager> {
        GLOBAL_CONFIG
            .get_or_init(|| {
                ConfigManager::load().unwrap_or_else(|e| {
                    warn!(error = %e, "⚙️ CONFIG: Load failed, using built-in defaults");
                    Arc::new(ConfigManager {
                        config: StratusConfig::default(),
                        environment: Self::detect_environment(),
                        config_directory: PathBuf::from("config"),
                    })
                })
            })
            .clone()
    }
}

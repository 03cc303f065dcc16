//! # Structured Logging Module
//!
//! Environment-aware structured logging for following replayed workflow turns
//! and provider fan-out. Human-readable console output by default; set
//! `STRATUS_LOG_FORMAT=json` for machine-readable lines. `RUST_LOG` overrides
//! the environment-derived level.

use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize the global tracing subscriber. Safe to call more than once and
/// from parallel tests; only the first call installs anything.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = detect_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_log_level(&environment)));

        let json = matches!(std::env::var("STRATUS_LOG_FORMAT").as_deref(), Ok("json"));
        let initialized = if json {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .json()
                .try_init()
        } else {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .try_init()
        };

        match initialized {
            Ok(()) => tracing::info!(
                environment = %environment,
                json,
                "🔧 LOGGING: Structured logging initialized"
            ),
            // A subscriber installed by the embedding application wins.
            Err(_) => tracing::debug!("Global tracing subscriber already initialized"),
        }
    });
}

fn detect_environment() -> String {
    std::env::var("STRATUS_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

fn default_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

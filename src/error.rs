//! Crate-level error type unifying the domain errors at the public boundary.
//! Internal seams keep their specific error enums; this wrapper exists for
//! embedders that want one `?`-compatible type.

use thiserror::Error;

use crate::commands::CommandError;
use crate::config::ConfigurationError;
use crate::orchestration::EngineError;
use crate::repository::RepositoryError;
use crate::runtime::StoreError;

#[derive(Debug, Error)]
pub enum StratusError {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("History store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, StratusError>;

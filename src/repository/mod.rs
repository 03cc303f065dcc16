//! # Document Repository
//!
//! The narrow seam to the document store. Orchestrations never touch a
//! repository directly: every call goes through a recorded activity so results
//! replay deterministically. Not-found is an absent value, not an error;
//! duplicate adds are conflicts; infrastructure failures are transient and
//! retry-eligible.

pub mod activities;
mod memory;

pub use activities::DocumentClient;
pub use memory::InMemoryRepository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::DocumentKey;

/// Persisted envelope around an entity snapshot. Timestamps are stamped by the
/// repository so orchestration code never reads the clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub key: DocumentKey,
    pub body: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RepositoryError {
    #[error("Document already exists: {key}")]
    Conflict { key: String },
    #[error("Document store unavailable: {reason}")]
    Unavailable { reason: String },
    #[error("Document serialization failed: {reason}")]
    Serialization { reason: String },
}

impl RepositoryError {
    pub fn conflict(key: &DocumentKey) -> Self {
        RepositoryError::Conflict {
            key: key.to_string(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        RepositoryError::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, RepositoryError::Unavailable { .. })
    }
}

/// Storage operations the orchestration engine needs. Implementations against
/// real document stores live outside this crate; the in-memory one below backs
/// tests and embedded use.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Fetch a document. Absence is a normal result.
    async fn get(&self, key: &DocumentKey) -> Result<Option<Document>, RepositoryError>;

    /// Insert a new document. Fails with [`RepositoryError::Conflict`] when the
    /// key is already present.
    async fn add(&self, key: &DocumentKey, body: Value) -> Result<Document, RepositoryError>;

    /// Write a document unconditionally, preserving `created_at` when the key
    /// already exists.
    async fn set(&self, key: &DocumentKey, body: Value) -> Result<Document, RepositoryError>;

    /// Remove a document, returning the removed snapshot when it existed.
    async fn remove(&self, key: &DocumentKey) -> Result<Option<Document>, RepositoryError>;
}

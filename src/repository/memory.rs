//! In-memory repository used by tests and embedded deployments.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

use super::{Document, DocumentRepository, RepositoryError};
use crate::models::DocumentKey;

#[derive(Debug, Default)]
pub struct InMemoryRepository {
    documents: DashMap<DocumentKey, Document>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn contains(&self, key: &DocumentKey) -> bool {
        self.documents.contains_key(key)
    }
}

#[async_trait]
impl DocumentRepository for InMemoryRepository {
    async fn get(&self, key: &DocumentKey) -> Result<Option<Document>, RepositoryError> {
        Ok(self.documents.get(key).map(|entry| entry.clone()))
    }

    async fn add(&self, key: &DocumentKey, body: Value) -> Result<Document, RepositoryError> {
        match self.documents.entry(key.clone()) {
            Entry::Occupied(_) => {
                debug!(key = %key, "💾 REPOSITORY: Rejected duplicate add");
                Err(RepositoryError::conflict(key))
            }
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let document = Document {
                    key: key.clone(),
                    body,
                    created_at: now,
                    updated_at: now,
                };
                slot.insert(document.clone());
                Ok(document)
            }
        }
    }

    async fn set(&self, key: &DocumentKey, body: Value) -> Result<Document, RepositoryError> {
        let now = Utc::now();
        // Scope the read so the shard lock is released before the insert.
        let created_at = self
            .documents
            .get(key)
            .map(|existing| existing.created_at)
            .unwrap_or(now);
        let document = Document {
            key: key.clone(),
            body,
            created_at,
            updated_at: now,
        };
        self.documents.insert(key.clone(), document.clone());
        Ok(document)
    }

    async fn remove(&self, key: &DocumentKey) -> Result<Option<Document>, RepositoryError> {
        Ok(self.documents.remove(key).map(|(_, document)| document))
    }
}

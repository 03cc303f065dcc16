//! # Repository Activities
//!
//! Durable bridge between workflows and the document store. The raw handlers
//! registered here run host-side with full retry support; [`DocumentClient`]
//! is the workflow-facing facade that schedules them and enforces the lock
//! discipline on every write.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use super::{Document, DocumentRepository};
use crate::commands::CommandError;
use crate::constants::activities as activity_names;
use crate::models::{DocumentKey, LockableDocument};
use crate::orchestration::DocumentLockGuard;
use crate::runtime::{ActivityError, ActivityRegistry, OrchestrationContext, RetryPolicy};

#[derive(Debug, Serialize, Deserialize)]
struct KeyedRequest {
    partition: String,
    id: String,
}

impl KeyedRequest {
    fn key(&self) -> DocumentKey {
        DocumentKey::new(&self.partition, &self.id)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WriteRequest {
    key: DocumentKey,
    body: Value,
}

fn parse_input<T: DeserializeOwned>(input: Value) -> Result<T, ActivityError> {
    serde_json::from_value(input)
        .map_err(|e| ActivityError::permanent(format!("malformed activity input: {e}")))
}

/// Register the four persistence activities against `repository`.
pub async fn register_repository_activities(
    registry: &ActivityRegistry,
    repository: Arc<dyn DocumentRepository>,
) {
    let repo = Arc::clone(&repository);
    registry
        .register(activity_names::REPOSITORY_GET, move |input| {
            let repo = Arc::clone(&repo);
            async move {
                let request: KeyedRequest = parse_input(input)?;
                let document = repo.get(&request.key()).await?;
                Ok(serde_json::to_value(document)?)
            }
        })
        .await;

    let repo = Arc::clone(&repository);
    registry
        .register(activity_names::REPOSITORY_ADD, move |input| {
            let repo = Arc::clone(&repo);
            async move {
                let request: WriteRequest = parse_input(input)?;
                let stored = repo.add(&request.key, request.body).await?;
                Ok(serde_json::to_value(stored)?)
            }
        })
        .await;

    let repo = Arc::clone(&repository);
    registry
        .register(activity_names::REPOSITORY_SET, move |input| {
            let repo = Arc::clone(&repo);
            async move {
                let request: WriteRequest = parse_input(input)?;
                let stored = repo.set(&request.key, request.body).await?;
                Ok(serde_json::to_value(stored)?)
            }
        })
        .await;

    let repo = Arc::clone(&repository);
    registry
        .register(activity_names::REPOSITORY_REMOVE, move |input| {
            let repo = Arc::clone(&repo);
            async move {
                let request: KeyedRequest = parse_input(input)?;
                let removed = repo.remove(&request.key()).await?;
                Ok(serde_json::to_value(removed)?)
            }
        })
        .await;
}

/// Workflow-side persistence facade.
///
/// Reads are plain recorded activities. Writes demand proof of exclusion: the
/// caller passes the lock guard covering the document, and a guard for the
/// wrong key is an internal fault, not a storable state. Create flows use
/// [`DocumentClient::add_unlocked`] because the document does not exist yet
/// and the store's uniqueness check is the race arbiter.
#[derive(Debug, Clone)]
pub struct DocumentClient {
    ctx: OrchestrationContext,
    retry: Option<RetryPolicy>,
}

impl DocumentClient {
    pub fn new(ctx: &OrchestrationContext) -> Self {
        Self {
            ctx: ctx.clone(),
            retry: None,
        }
    }

    /// Override the engine-default retry policy for this client's calls.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    fn policy(&self) -> RetryPolicy {
        self.retry
            .clone()
            .unwrap_or_else(|| self.ctx.default_retry())
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        key: &DocumentKey,
    ) -> Result<Option<T>, CommandError> {
        let input = json!({"partition": key.partition, "id": key.id});
        let value = self
            .ctx
            .schedule_activity(activity_names::REPOSITORY_GET, input, self.policy())
            .await?;
        let document: Option<Document> = decode(value)?;
        match document {
            None => Ok(None),
            Some(document) => decode(document.body).map(Some),
        }
    }

    /// Insert a new document under the held lock. A duplicate key surfaces as
    /// a conflict error.
    pub async fn add_locked<T>(
        &self,
        guard: &DocumentLockGuard,
        entity: &T,
    ) -> Result<(), CommandError>
    where
        T: Serialize + LockableDocument,
    {
        let key = entity.document_key();
        ensure_covers(guard, &key)?;
        self.write(activity_names::REPOSITORY_ADD, &key, entity)
            .await
    }

    /// Insert without a lock. Only valid for creates, where the key cannot be
    /// contended by an existing document and the add conflict is the barrier.
    pub async fn add_unlocked<T>(&self, entity: &T) -> Result<(), CommandError>
    where
        T: Serialize + LockableDocument,
    {
        let key = entity.document_key();
        self.write(activity_names::REPOSITORY_ADD, &key, entity)
            .await
    }

    /// Overwrite an existing document under the held lock.
    pub async fn set_locked<T>(
        &self,
        guard: &DocumentLockGuard,
        entity: &T,
    ) -> Result<(), CommandError>
    where
        T: Serialize + LockableDocument,
    {
        let key = entity.document_key();
        ensure_covers(guard, &key)?;
        self.write(activity_names::REPOSITORY_SET, &key, entity)
            .await
    }

    /// Remove a document under the held lock. Returns whether it existed.
    pub async fn remove_locked(
        &self,
        guard: &DocumentLockGuard,
        key: &DocumentKey,
    ) -> Result<bool, CommandError> {
        ensure_covers(guard, key)?;
        let input = json!({"partition": key.partition, "id": key.id});
        let value = self
            .ctx
            .schedule_activity(activity_names::REPOSITORY_REMOVE, input, self.policy())
            .await?;
        let removed: Option<Document> = decode(value)?;
        Ok(removed.is_some())
    }

    async fn write<T: Serialize>(
        &self,
        activity: &str,
        key: &DocumentKey,
        entity: &T,
    ) -> Result<(), CommandError> {
        let body = serde_json::to_value(entity)
            .map_err(|e| CommandError::internal(format!("entity serialization failed: {e}")))?;
        let input = json!({"key": key, "body": body});
        self.ctx
            .schedule_activity(activity, input, self.policy())
            .await?;
        Ok(())
    }
}

fn ensure_covers(guard: &DocumentLockGuard, key: &DocumentKey) -> Result<(), CommandError> {
    if guard.covers(key) {
        return Ok(());
    }
    Err(CommandError::internal(format!(
        "lock discipline violation: write to {} while holding the lock on {}",
        key,
        guard.key()
    )))
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, CommandError> {
    serde_json::from_value(value)
        .map_err(|e| CommandError::internal(format!("recorded document did not parse: {e}")))
}

//! Test doubles: a repository wrapper that records calls and injects faults,
//! and providers whose outcomes are scripted per test.

#![allow(dead_code)] // Each test binary uses its own slice of these helpers.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use stratus_core::models::DocumentKey;
use stratus_core::providers::{
    CommandProvider, ProviderCommand, ProviderEvent, ProviderResponse,
};
use stratus_core::repository::{
    Document, DocumentRepository, InMemoryRepository, RepositoryError,
};
use stratus_core::CommandError;

/// Wraps the in-memory repository, logging every operation in call order and
/// optionally failing or delaying scripted calls. The log is how lock tests
/// observe interleaving: two commands against one document must never have
/// their operation windows overlap.
#[derive(Debug, Default)]
pub struct RecordingRepository {
    inner: InMemoryRepository,
    operations: Mutex<Vec<(String, DocumentKey)>>,
    failures: Mutex<VecDeque<(String, RepositoryError)>>,
    delay: Mutex<Option<Duration>>,
}

impl RecordingRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue an error for the next call to `op` (`get`, `add`, `set`, or
    /// `remove`). Queued failures are consumed one call at a time, so two
    /// pushes fail two consecutive calls and the third succeeds.
    pub fn fail_next(&self, op: &str, error: RepositoryError) {
        self.failures.lock().push_back((op.to_string(), error));
    }

    /// Sleep this long inside every repository call, widening the window in
    /// which a concurrently running command could interleave.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn operations(&self) -> Vec<(String, DocumentKey)> {
        self.operations.lock().clone()
    }

    pub fn calls_to(&self, op: &str) -> usize {
        self.operations
            .lock()
            .iter()
            .filter(|(name, _)| name == op)
            .count()
    }

    pub fn inner(&self) -> &InMemoryRepository {
        &self.inner
    }

    async fn enter(&self, op: &str, key: &DocumentKey) -> Result<(), RepositoryError> {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.operations.lock().push((op.to_string(), key.clone()));
        let mut failures = self.failures.lock();
        if let Some(slot) = failures.iter().position(|(name, _)| name == op) {
            let (_, error) = failures.remove(slot).unwrap();
            return Err(error);
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentRepository for RecordingRepository {
    async fn get(&self, key: &DocumentKey) -> Result<Option<Document>, RepositoryError> {
        self.enter("get", key).await?;
        self.inner.get(key).await
    }

    async fn add(&self, key: &DocumentKey, body: Value) -> Result<Document, RepositoryError> {
        self.enter("add", key).await?;
        self.inner.add(key, body).await
    }

    async fn set(&self, key: &DocumentKey, body: Value) -> Result<Document, RepositoryError> {
        self.enter("set", key).await?;
        self.inner.set(key, body).await
    }

    async fn remove(&self, key: &DocumentKey) -> Result<Option<Document>, RepositoryError> {
        self.enter("remove", key).await?;
        self.inner.remove(key).await
    }
}

/// Poll `check` every few milliseconds until it holds, panicking after two
/// seconds. For observing a parked command's side effects without racing it.
pub async fn wait_until(what: &str, mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !check() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// What a scripted provider does with each command it receives.
#[derive(Debug, Clone)]
pub enum ProviderScript {
    Succeed,
    SucceedWith(Value),
    FailWith(String),
    /// Sleep before acknowledging. Long enough, and the dispatcher gives up
    /// on this provider's slot.
    Stall(Duration),
}

/// Provider whose behavior is fixed up front and whose received commands are
/// kept for assertion.
#[derive(Debug)]
pub struct ScriptedProvider {
    name: String,
    subscriptions: Vec<ProviderEvent>,
    script: ProviderScript,
    received: Mutex<Vec<ProviderCommand>>,
}

impl ScriptedProvider {
    pub fn new(
        name: &str,
        subscriptions: Vec<ProviderEvent>,
        script: ProviderScript,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            subscriptions,
            script,
            received: Mutex::new(Vec::new()),
        })
    }

    pub fn received(&self) -> Vec<ProviderCommand> {
        self.received.lock().clone()
    }
}

#[async_trait]
impl CommandProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn subscriptions(&self) -> Vec<ProviderEvent> {
        self.subscriptions.clone()
    }

    async fn handle(&self, command: ProviderCommand) -> ProviderResponse {
        self.received.lock().push(command);
        match &self.script {
            ProviderScript::Succeed => ProviderResponse::success(),
            ProviderScript::SucceedWith(payload) => {
                ProviderResponse::with_payload(payload.clone())
            }
            ProviderScript::FailWith(message) => {
                ProviderResponse::failed(CommandError::provider(message.clone()))
            }
            ProviderScript::Stall(delay) => {
                tokio::time::sleep(*delay).await;
                ProviderResponse::success()
            }
        }
    }
}

//! History persistence seam. The engine appends deltas after every turn and
//! reads full histories on resume; an append is the durability boundary, so a
//! store implementation must make the events visible to later reads before
//! returning.

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use uuid::Uuid;

use super::history::HistoryEvent;

/// Orchestration instance id. Equal to the command id: one command, one
/// instance.
pub type InstanceId = Uuid;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("History store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Full history of an instance, empty when the instance is unknown.
    async fn read(&self, instance: InstanceId) -> Result<Vec<HistoryEvent>, StoreError>;

    /// Append events in order. Events already appended are never rewritten.
    async fn append(&self, instance: InstanceId, events: &[HistoryEvent])
        -> Result<(), StoreError>;

    /// Drop an instance's history.
    async fn remove(&self, instance: InstanceId) -> Result<(), StoreError>;

    /// Ids of every stored instance.
    async fn instances(&self) -> Result<Vec<InstanceId>, StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    histories: DashMap<InstanceId, Vec<HistoryEvent>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events recorded for an instance. Handy in tests that wait for
    /// an instance to reach a known point.
    pub fn event_count(&self, instance: InstanceId) -> usize {
        self.histories
            .get(&instance)
            .map(|events| events.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn read(&self, instance: InstanceId) -> Result<Vec<HistoryEvent>, StoreError> {
        Ok(self
            .histories
            .get(&instance)
            .map(|events| events.clone())
            .unwrap_or_default())
    }

    async fn append(
        &self,
        instance: InstanceId,
        events: &[HistoryEvent],
    ) -> Result<(), StoreError> {
        self.histories
            .entry(instance)
            .or_default()
            .extend_from_slice(events);
        Ok(())
    }

    async fn remove(&self, instance: InstanceId) -> Result<(), StoreError> {
        self.histories.remove(&instance);
        Ok(())
    }

    async fn instances(&self) -> Result<Vec<InstanceId>, StoreError> {
        Ok(self.histories.iter().map(|entry| *entry.key()).collect())
    }
}

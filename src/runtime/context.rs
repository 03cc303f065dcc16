//! # Orchestration Context
//!
//! The capability object handed to every workflow. All interaction with the
//! outside world flows through it: activities, document locks, provider sends,
//! status reporting, and the deterministic clock/uuid helpers. Each call
//! consumes the next sequence id in the workflow's own call order, which is
//! what lets a re-executed workflow line up with its recorded history.
//!
//! ## Replay model
//!
//! A turn re-runs the workflow function from the start against the committed
//! history:
//!
//! - a call whose id is already recorded does not re-emit its action
//!   (at-most-once), and its future resolves instantly once the matching
//!   completion exists in history;
//! - a call with no recorded schedule appends the schedule event to the turn's
//!   delta and hands the host an action to execute;
//! - a call whose descriptor disagrees with the recorded event at the same id
//!   flags the replay as nondeterministic, which fails the command instead of
//!   corrupting state.
//!
//! Lock guards record their release through the same id stream. When a turn
//! suspends, the executor flips the core into teardown mode before dropping
//! the partially-run future, so guard drops from an abandoned turn record
//! nothing; the next turn replays the guard back into existence.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use uuid::Uuid;

use super::activities::RetryPolicy;
use super::history::{EventId, HistoryEvent};
use super::store::InstanceId;
use crate::commands::CommandError;
use crate::constants::activities as activity_names;
use crate::models::DocumentKey;
use crate::providers::{ProviderCommand, ProviderResult};

/// Engine-level defaults a context carries into a turn.
#[derive(Debug, Clone)]
pub struct RuntimeDefaults {
    /// Default bound on lock acquisition; `None` waits indefinitely.
    pub lock_timeout: Option<Duration>,
    /// Per-provider acknowledgement deadline.
    pub provider_ack_timeout: Duration,
    /// Retry policy for activity invocations that do not choose their own.
    pub retry: RetryPolicy,
}

impl Default for RuntimeDefaults {
    fn default() -> Self {
        Self {
            lock_timeout: None,
            provider_ack_timeout: Duration::from_millis(30000),
            retry: RetryPolicy::default(),
        }
    }
}

/// Work the host must perform for newly scheduled points.
#[derive(Debug, Clone)]
pub(crate) enum HostAction {
    InvokeActivity {
        id: EventId,
        activity: String,
        input: Value,
        retry: RetryPolicy,
    },
    AcquireLock {
        id: EventId,
        key: DocumentKey,
        timeout: Option<Duration>,
    },
    SendProviderCommand {
        id: EventId,
        provider: String,
        command: ProviderCommand,
        timeout: Duration,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TurnMode {
    Live,
    TearDown,
}

pub(crate) type CoreHandle = Arc<Mutex<ReplayCore>>;

/// Per-turn replay state shared between the context, its futures, and lock
/// guards.
#[derive(Debug)]
pub(crate) struct ReplayCore {
    committed: Vec<HistoryEvent>,
    schedule_index: HashMap<EventId, usize>,
    completion_index: HashMap<EventId, usize>,
    /// acquisition id → the id its recorded release consumed.
    released_acquisitions: HashMap<EventId, EventId>,
    release_ids: HashSet<EventId>,
    committed_status_count: usize,
    next_id: EventId,
    status_calls: usize,
    delta: Vec<HistoryEvent>,
    actions: Vec<HostAction>,
    mode: TurnMode,
    nondeterminism: Option<String>,
}

impl ReplayCore {
    pub(crate) fn new(committed: &[HistoryEvent]) -> Self {
        let mut schedule_index = HashMap::new();
        let mut completion_index = HashMap::new();
        let mut released_acquisitions = HashMap::new();
        let mut release_ids = HashSet::new();
        let mut committed_status_count = 0;

        for (index, event) in committed.iter().enumerate() {
            if let Some(id) = event.schedule_id() {
                schedule_index.insert(id, index);
            }
            if let Some(id) = event.completion_id() {
                completion_index.insert(id, index);
            }
            match event {
                HistoryEvent::LockReleased {
                    id, acquisition_id, ..
                } => {
                    released_acquisitions.insert(*acquisition_id, *id);
                    release_ids.insert(*id);
                }
                HistoryEvent::StatusSet { .. } => committed_status_count += 1,
                _ => {}
            }
        }

        Self {
            committed: committed.to_vec(),
            schedule_index,
            completion_index,
            released_acquisitions,
            release_ids,
            committed_status_count,
            next_id: 1,
            status_calls: 0,
            delta: Vec::new(),
            actions: Vec::new(),
            mode: TurnMode::Live,
            nondeterminism: None,
        }
    }

    fn consume_id(&mut self) -> EventId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn flag_nondeterminism(&mut self, id: EventId, expected: &str, found: &str) {
        if self.nondeterminism.is_none() {
            self.nondeterminism = Some(format!(
                "schedule #{id} diverged from recorded history: workflow produced {expected}, history holds {found}"
            ));
        }
    }

    pub(crate) fn schedule_activity(
        &mut self,
        activity: &str,
        input: Value,
        retry: RetryPolicy,
    ) -> EventId {
        let id = self.consume_id();
        if let Some(&index) = self.schedule_index.get(&id) {
            let matches = matches!(
                &self.committed[index],
                HistoryEvent::ActivityScheduled { activity: recorded, .. } if recorded == activity
            );
            if !matches {
                let found = self.committed[index].label();
                self.flag_nondeterminism(id, &format!("activity {activity}"), found);
            }
            return id;
        }
        if self.release_ids.contains(&id) {
            self.flag_nondeterminism(id, &format!("activity {activity}"), "lock_released");
            return id;
        }
        self.delta.push(HistoryEvent::ActivityScheduled {
            id,
            activity: activity.to_string(),
            input: input.clone(),
            retry: retry.clone(),
        });
        self.actions.push(HostAction::InvokeActivity {
            id,
            activity: activity.to_string(),
            input,
            retry,
        });
        id
    }

    pub(crate) fn request_lock(
        &mut self,
        key: &DocumentKey,
        timeout: Option<Duration>,
    ) -> EventId {
        let id = self.consume_id();
        if let Some(&index) = self.schedule_index.get(&id) {
            let matches = matches!(
                &self.committed[index],
                HistoryEvent::LockRequested { partition, document_id, .. }
                    if *partition == key.partition && *document_id == key.id
            );
            if !matches {
                let found = self.committed[index].label();
                self.flag_nondeterminism(id, &format!("lock request for {key}"), found);
            }
            return id;
        }
        if self.release_ids.contains(&id) {
            self.flag_nondeterminism(id, &format!("lock request for {key}"), "lock_released");
            return id;
        }
        self.delta.push(HistoryEvent::LockRequested {
            id,
            partition: key.partition.clone(),
            document_id: key.id.clone(),
            timeout_ms: timeout.map(|t| t.as_millis() as u64),
        });
        self.actions.push(HostAction::AcquireLock {
            id,
            key: key.clone(),
            timeout,
        });
        id
    }

    pub(crate) fn send_provider(
        &mut self,
        provider: &str,
        command: ProviderCommand,
        timeout: Duration,
    ) -> EventId {
        let id = self.consume_id();
        if let Some(&index) = self.schedule_index.get(&id) {
            let matches = matches!(
                &self.committed[index],
                HistoryEvent::ProviderCommandSent { provider: recorded, .. } if recorded == provider
            );
            if !matches {
                let found = self.committed[index].label();
                self.flag_nondeterminism(id, &format!("provider send to {provider}"), found);
            }
            return id;
        }
        if self.release_ids.contains(&id) {
            self.flag_nondeterminism(id, &format!("provider send to {provider}"), "lock_released");
            return id;
        }
        let timeout_ms = timeout.as_millis() as u64;
        self.delta.push(HistoryEvent::ProviderCommandSent {
            id,
            provider: provider.to_string(),
            command: command.clone(),
            timeout_ms,
        });
        self.actions.push(HostAction::SendProviderCommand {
            id,
            provider: provider.to_string(),
            command,
            timeout,
        });
        id
    }

    /// Record a lock release from a guard drop. Skipped entirely while the
    /// executor is tearing down a suspended turn; the guard will be replayed
    /// back into existence next turn.
    pub(crate) fn record_release(&mut self, acquisition_id: EventId, key: &DocumentKey) {
        if self.mode == TurnMode::TearDown {
            return;
        }
        let id = self.consume_id();
        if let Some(&recorded_id) = self.released_acquisitions.get(&acquisition_id) {
            if recorded_id != id {
                self.flag_nondeterminism(
                    id,
                    &format!("lock release for {key}"),
                    "lock release at a different point",
                );
            }
            return;
        }
        self.delta.push(HistoryEvent::LockReleased {
            id,
            acquisition_id,
            partition: key.partition.clone(),
            document_id: key.id.clone(),
        });
    }

    pub(crate) fn set_status(&mut self, status: String) {
        self.status_calls += 1;
        if self.status_calls <= self.committed_status_count {
            return;
        }
        self.delta.push(HistoryEvent::StatusSet { status });
    }

    fn completion(&self, id: EventId) -> Option<HistoryEvent> {
        self.completion_index
            .get(&id)
            .map(|&index| self.committed[index].clone())
    }

    pub(crate) fn begin_teardown(&mut self) {
        self.mode = TurnMode::TearDown;
    }

    pub(crate) fn take_delta(&mut self) -> Vec<HistoryEvent> {
        std::mem::take(&mut self.delta)
    }

    pub(crate) fn take_actions(&mut self) -> Vec<HostAction> {
        std::mem::take(&mut self.actions)
    }

    pub(crate) fn nondeterminism(&self) -> Option<String> {
        self.nondeterminism.clone()
    }
}

/// Capability object for workflow code. Cheap to clone; all clones share the
/// turn's replay core.
#[derive(Debug, Clone)]
pub struct OrchestrationContext {
    core: CoreHandle,
    instance: InstanceId,
    defaults: RuntimeDefaults,
}

impl OrchestrationContext {
    pub(crate) fn new(core: CoreHandle, instance: InstanceId, defaults: RuntimeDefaults) -> Self {
        Self {
            core,
            instance,
            defaults,
        }
    }

    pub fn instance_id(&self) -> InstanceId {
        self.instance
    }

    /// Retry policy activity calls use when none is supplied explicitly.
    pub fn default_retry(&self) -> RetryPolicy {
        self.defaults.retry.clone()
    }

    pub(crate) fn core_handle(&self) -> CoreHandle {
        Arc::clone(&self.core)
    }

    pub(crate) fn default_lock_timeout(&self) -> Option<Duration> {
        self.defaults.lock_timeout
    }

    pub(crate) fn provider_ack_timeout(&self) -> Duration {
        self.defaults.provider_ack_timeout
    }

    /// Report a human-readable phase label. Recorded in history and surfaced
    /// through the engine's custom status; replayed calls publish nothing.
    pub fn set_status(&self, status: impl Into<String>) {
        self.core.lock().set_status(status.into());
    }

    /// Schedule an activity invocation. The returned future resolves when the
    /// activity's completion event is in history.
    pub fn schedule_activity(
        &self,
        activity: &str,
        input: Value,
        retry: RetryPolicy,
    ) -> ActivityFuture {
        let id = self.core.lock().schedule_activity(activity, input, retry);
        ActivityFuture {
            core: Arc::clone(&self.core),
            id,
        }
    }

    pub(crate) fn request_lock(&self, key: &DocumentKey, timeout: Option<Duration>) -> LockFuture {
        let id = self.core.lock().request_lock(key, timeout);
        LockFuture {
            core: Arc::clone(&self.core),
            id,
            key: key.clone(),
        }
    }

    pub(crate) fn send_provider_command(
        &self,
        provider: &str,
        command: ProviderCommand,
    ) -> ProviderFuture {
        let timeout = self.defaults.provider_ack_timeout;
        let id = self.core.lock().send_provider(provider, command, timeout);
        ProviderFuture {
            core: Arc::clone(&self.core),
            id,
            provider: provider.to_string(),
        }
    }

    /// Deterministic wall-clock read, recorded as an activity so replay reuses
    /// the original value.
    pub async fn current_time(&self) -> Result<DateTime<Utc>, CommandError> {
        let value = self
            .schedule_activity(activity_names::UTC_NOW, Value::Null, RetryPolicy::none())
            .await?;
        serde_json::from_value(value)
            .map_err(|e| CommandError::internal(format!("recorded timestamp did not parse: {e}")))
    }

    /// Deterministic uuid generation, recorded as an activity.
    pub async fn new_uuid(&self) -> Result<Uuid, CommandError> {
        let value = self
            .schedule_activity(activity_names::NEW_UUID, Value::Null, RetryPolicy::none())
            .await?;
        serde_json::from_value(value)
            .map_err(|e| CommandError::internal(format!("recorded uuid did not parse: {e}")))
    }
}

fn poison_error(core: &ReplayCore) -> Option<CommandError> {
    core.nondeterminism
        .as_ref()
        .map(|reason| CommandError::internal(reason.clone()))
}

/// Resolves to the activity's recorded result or failure.
pub struct ActivityFuture {
    core: CoreHandle,
    id: EventId,
}

impl Future for ActivityFuture {
    type Output = Result<Value, CommandError>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let core = self.core.lock();
        if let Some(error) = poison_error(&core) {
            return Poll::Ready(Err(error));
        }
        match core.completion(self.id) {
            Some(HistoryEvent::ActivityCompleted { result, .. }) => Poll::Ready(Ok(result)),
            Some(HistoryEvent::ActivityFailed { error, .. }) => Poll::Ready(Err(error)),
            Some(other) => Poll::Ready(Err(CommandError::internal(format!(
                "completion #{} is a {}, expected an activity completion",
                self.id,
                other.label()
            )))),
            None => Poll::Pending,
        }
    }
}

/// Resolves to the acquisition id once the lock grant (or timeout) is
/// recorded.
pub(crate) struct LockFuture {
    core: CoreHandle,
    id: EventId,
    key: DocumentKey,
}

impl Future for LockFuture {
    type Output = Result<EventId, CommandError>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let core = self.core.lock();
        if let Some(error) = poison_error(&core) {
            return Poll::Ready(Err(error));
        }
        match core.completion(self.id) {
            Some(HistoryEvent::LockAcquired { .. }) => Poll::Ready(Ok(self.id)),
            Some(HistoryEvent::LockTimedOut { waited_ms, .. }) => {
                Poll::Ready(Err(CommandError::lock_timeout(format!(
                    "lock on {} not acquired within {waited_ms}ms",
                    self.key
                ))))
            }
            Some(other) => Poll::Ready(Err(CommandError::internal(format!(
                "completion #{} is a {}, expected a lock grant",
                self.id,
                other.label()
            )))),
            None => Poll::Pending,
        }
    }
}

/// Resolves to the provider's slot result; a timeout becomes an error slot,
/// never a future failure.
pub(crate) struct ProviderFuture {
    core: CoreHandle,
    id: EventId,
    provider: String,
}

impl Future for ProviderFuture {
    type Output = Result<ProviderResult, CommandError>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let core = self.core.lock();
        if let Some(error) = poison_error(&core) {
            return Poll::Ready(Err(error));
        }
        match core.completion(self.id) {
            Some(HistoryEvent::ProviderResultReceived { result, .. }) => Poll::Ready(Ok(result)),
            Some(HistoryEvent::ProviderTimedOut { timeout_ms, .. }) => {
                Poll::Ready(Ok(ProviderResult::timed_out(&self.provider, timeout_ms)))
            }
            Some(other) => Poll::Ready(Err(CommandError::internal(format!(
                "completion #{} is a {}, expected a provider result",
                self.id,
                other.label()
            )))),
            None => Poll::Pending,
        }
    }
}

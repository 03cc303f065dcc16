//! # Command Engine
//!
//! The host side of the orchestration runtime. The engine owns every shared
//! registry (activities, providers, workflows), the lock manager, the history
//! store, and the event publisher, and drives one replay loop per submitted
//! command.
//!
//! ## Instance loop
//!
//! Each command runs as its own tokio task:
//!
//! 1. execute one turn of the workflow against the committed history;
//! 2. append the turn's delta to the store, then apply its side effects
//!    (lock releases, status changes) and dispatch its new actions;
//! 3. if the turn finished, record the completion and wake waiters;
//! 4. otherwise wait for at least one completion event, append the batch,
//!    and go around again.
//!
//! Appending before dispatching is what makes actions at-most-once: an action
//! only runs after its schedule event is durable, so a crash between the two
//! re-issues the action on resume instead of losing it.
//!
//! ## Deduplication
//!
//! The command id doubles as the instance id. Submitting a command whose id is
//! already active (or already finished) attaches to the original instance, so
//! at-least-once delivery upstream cannot double-apply a mutation.

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::registry::OrchestrationRegistry;
use crate::commands::{Command, CommandError, CommandKind, CommandResult};
use crate::config::StratusConfig;
use crate::constants::{activities as activity_names, events as event_names};
use crate::events::EventPublisher;
use crate::models::DocumentKey;
use crate::providers::{
    CommandProvider, ProviderEvent, ProviderRegistry, ProviderRegistryError, ProviderResult,
};
use crate::repository::activities::register_repository_activities;
use crate::repository::{DocumentRepository, InMemoryRepository};
use crate::runtime::activities::{run_with_retry, ActivityRegistry, ActivityResult};
use crate::runtime::context::{HostAction, RuntimeDefaults};
use crate::runtime::executor::{execute_turn, OrchestrationFn};
use crate::runtime::history::{EventId, HistoryEvent};
use crate::runtime::locks::LockManager;
use crate::runtime::store::{HistoryStore, InMemoryHistoryStore, InstanceId, StoreError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("No workflow registered for command kind: {0}")]
    UnregisteredKind(CommandKind),

    #[error("Unknown command: {0}")]
    UnknownCommand(Uuid),

    #[error("Engine is shutting down")]
    ShuttingDown,

    #[error("Provider registration failed: {0}")]
    Provider(#[from] ProviderRegistryError),

    #[error("History store error: {0}")]
    Store(#[from] StoreError),
}

struct EngineInner {
    store: Arc<dyn HistoryStore>,
    locks: LockManager,
    activities: ActivityRegistry,
    providers: ProviderRegistry,
    orchestrations: OrchestrationRegistry,
    publisher: EventPublisher,
    defaults: RuntimeDefaults,
    results: DashMap<InstanceId, CommandResult>,
    statuses: DashMap<InstanceId, String>,
    active: DashMap<InstanceId, ()>,
    completed: Notify,
    shutting_down: AtomicBool,
}

/// Builds a [`CommandEngine`] with overridable collaborators. Everything not
/// supplied falls back to an in-memory implementation, which is what tests
/// and single-process deployments use.
pub struct CommandEngineBuilder {
    config: StratusConfig,
    repository: Option<Arc<dyn DocumentRepository>>,
    store: Option<Arc<dyn HistoryStore>>,
}

impl CommandEngineBuilder {
    pub fn new() -> Self {
        Self {
            config: StratusConfig::default(),
            repository: None,
            store: None,
        }
    }

    pub fn with_config(mut self, config: StratusConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_repository(mut self, repository: Arc<dyn DocumentRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn with_history_store(mut self, store: Arc<dyn HistoryStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub async fn build(self) -> CommandEngine {
        let defaults = self.config.runtime_defaults();
        let repository = self
            .repository
            .unwrap_or_else(|| Arc::new(InMemoryRepository::new()));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryHistoryStore::new()));

        let activities = ActivityRegistry::new();
        let providers = ProviderRegistry::new();
        register_repository_activities(&activities, repository).await;
        register_builtin_activities(&activities, providers.clone()).await;
        let orchestrations = OrchestrationRegistry::with_default_workflows().await;
        let publisher = EventPublisher::new(self.config.events.channel_capacity);

        info!(
            environment = %self.config.system.environment,
            workflows = orchestrations.len().await,
            "🚀 ENGINE: Command engine ready"
        );

        CommandEngine {
            inner: Arc::new(EngineInner {
                store,
                locks: LockManager::new(),
                activities,
                providers,
                orchestrations,
                publisher,
                defaults,
                results: DashMap::new(),
                statuses: DashMap::new(),
                active: DashMap::new(),
                completed: Notify::new(),
                shutting_down: AtomicBool::new(false),
            }),
        }
    }
}

impl Default for CommandEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The entry point for submitting commands and observing their outcomes.
/// Cheap to clone; all clones share the same engine state.
#[derive(Clone)]
pub struct CommandEngine {
    inner: Arc<EngineInner>,
}

impl CommandEngine {
    pub fn builder() -> CommandEngineBuilder {
        CommandEngineBuilder::new()
    }

    /// An engine with default configuration and in-memory collaborators.
    pub async fn new() -> Self {
        CommandEngineBuilder::new().build().await
    }

    /// Submit a command for execution. Returns the instance id (equal to the
    /// command id) once the start of the orchestration is durable.
    ///
    /// Submitting a command id that is already running or already finished is
    /// not an error: the call attaches to the original instance, which is how
    /// redelivered commands stay exactly-once.
    pub async fn submit(&self, command: Command) -> Result<InstanceId, EngineError> {
        if self.inner.shutting_down.load(Ordering::SeqCst) {
            return Err(EngineError::ShuttingDown);
        }
        if command.command_id.is_nil() {
            return Err(EngineError::InvalidCommand(
                "command id must not be nil".to_string(),
            ));
        }
        if !command.payload.is_object() {
            return Err(EngineError::InvalidCommand(format!(
                "payload for {} must be a JSON object",
                command.kind
            )));
        }
        let workflow = self
            .inner
            .orchestrations
            .resolve(command.kind)
            .await
            .ok_or(EngineError::UnregisteredKind(command.kind))?;

        let instance = command.command_id;
        if self.inner.results.contains_key(&instance) {
            debug!(command_id = %instance, "🔁 ENGINE: Redelivered command already finished");
            return Ok(instance);
        }
        match self.inner.active.entry(instance) {
            Entry::Occupied(_) => {
                debug!(command_id = %instance, "🔁 ENGINE: Redelivered command already running");
                return Ok(instance);
            }
            Entry::Vacant(slot) => {
                slot.insert(());
            }
        }

        let started = HistoryEvent::OrchestrationStarted {
            command: command.clone(),
            started_at: Utc::now(),
        };
        if let Err(error) = self.inner.store.append(instance, &[started.clone()]).await {
            self.inner.active.remove(&instance);
            return Err(error.into());
        }

        info!(
            command_id = %instance,
            kind = %command.kind,
            requested_by = %command.requested_by,
            "📥 ENGINE: Command accepted"
        );
        self.inner.publisher.publish(
            event_names::COMMAND_RECEIVED,
            json!({
                "command_id": instance,
                "kind": command.kind.as_str(),
                "requested_by": command.requested_by,
                "correlation_id": command.correlation_id,
            }),
        );

        tokio::spawn(run_instance(
            Arc::clone(&self.inner),
            workflow,
            command,
            vec![started],
        ));
        Ok(instance)
    }

    /// Wait until the command reaches a terminal state and return its result.
    pub async fn await_result(&self, command_id: Uuid) -> Result<CommandResult, EngineError> {
        loop {
            if let Some(result) = self.inner.results.get(&command_id) {
                return Ok(result.clone());
            }
            if !self.inner.active.contains_key(&command_id) {
                return Err(EngineError::UnknownCommand(command_id));
            }
            let notified = self.inner.completed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            // The result may have landed between the check and the enable.
            if let Some(result) = self.inner.results.get(&command_id) {
                return Ok(result.clone());
            }
            notified.await;
        }
    }

    /// The result of a finished command, without waiting.
    pub fn result(&self, command_id: Uuid) -> Option<CommandResult> {
        self.inner.results.get(&command_id).map(|r| r.clone())
    }

    /// The most recent status a running workflow reported, cleared once the
    /// command finishes.
    pub fn custom_status(&self, command_id: Uuid) -> Option<String> {
        self.inner.statuses.get(&command_id).map(|s| s.clone())
    }

    /// Rebuild and continue an instance from its stored history after a crash
    /// or restart. A terminal history just republishes its recorded result; a
    /// mid-flight history restores lock holdership, re-issues every action
    /// whose completion was never recorded, and re-enters the replay loop.
    pub async fn resume(&self, command_id: Uuid) -> Result<(), EngineError> {
        if self.inner.shutting_down.load(Ordering::SeqCst) {
            return Err(EngineError::ShuttingDown);
        }
        let history = self.inner.store.read(command_id).await?;
        let Some(HistoryEvent::OrchestrationStarted { command, .. }) = history.first().cloned()
        else {
            return Err(EngineError::UnknownCommand(command_id));
        };

        if let Some(result) = history.iter().find_map(|event| match event {
            HistoryEvent::OrchestrationCompleted { result, .. } => Some(result.clone()),
            _ => None,
        }) {
            debug!(command_id = %command_id, "🔄 ENGINE: Resume found a finished instance");
            self.inner.results.insert(command_id, result);
            self.inner.completed.notify_waiters();
            return Ok(());
        }

        let workflow = self
            .inner
            .orchestrations
            .resolve(command.kind)
            .await
            .ok_or(EngineError::UnregisteredKind(command.kind))?;
        match self.inner.active.entry(command_id) {
            Entry::Occupied(_) => return Ok(()),
            Entry::Vacant(slot) => {
                slot.insert(());
            }
        }
        for key in held_keys(&history) {
            self.inner.locks.restore_holder(command_id, key);
        }

        info!(
            command_id = %command_id,
            kind = %command.kind,
            events = history.len(),
            "🔄 ENGINE: Resuming command"
        );
        self.inner.publisher.publish(
            event_names::COMMAND_RESUMED,
            json!({ "command_id": command_id, "events": history.len() }),
        );

        tokio::spawn(run_instance(
            Arc::clone(&self.inner),
            workflow,
            command,
            history,
        ));
        Ok(())
    }

    /// Stop accepting new commands and wait for in-flight instances to finish.
    pub async fn shutdown(&self) {
        self.inner.shutting_down.store(true, Ordering::SeqCst);
        info!("🛑 ENGINE: Shutdown requested, draining in-flight commands");
        loop {
            if self.inner.active.is_empty() {
                break;
            }
            let notified = self.inner.completed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.inner.active.is_empty() {
                break;
            }
            notified.await;
        }
        info!("🛑 ENGINE: Shutdown complete");
    }

    pub async fn register_provider(
        &self,
        provider: Arc<dyn CommandProvider>,
    ) -> Result<(), EngineError> {
        Ok(self.inner.providers.register(provider).await?)
    }

    /// Register (or override) an activity handler. Overriding is how tests
    /// install probes in place of built-ins.
    pub async fn register_activity<F, Fut>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActivityResult> + Send + 'static,
    {
        self.inner.activities.register(name, handler).await;
    }

    pub async fn register_workflow(&self, kind: CommandKind, workflow: OrchestrationFn) {
        self.inner.orchestrations.register(kind, workflow).await;
    }

    pub fn event_publisher(&self) -> &EventPublisher {
        &self.inner.publisher
    }
}

impl std::fmt::Debug for CommandEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandEngine")
            .field("active", &self.inner.active.len())
            .field("finished", &self.inner.results.len())
            .finish_non_exhaustive()
    }
}

async fn register_builtin_activities(activities: &ActivityRegistry, providers: ProviderRegistry) {
    activities
        .register(activity_names::UTC_NOW, |_input: Value| async move {
            Ok(serde_json::to_value(Utc::now())?)
        })
        .await;
    activities
        .register(activity_names::NEW_UUID, |_input: Value| async move {
            Ok(serde_json::to_value(Uuid::new_v4())?)
        })
        .await;
    activities
        .register(
            activity_names::RESOLVE_PROVIDER_TARGETS,
            move |input: Value| {
                let providers = providers.clone();
                async move {
                    let event: ProviderEvent = serde_json::from_value(input)?;
                    Ok(serde_json::to_value(providers.targets_for(event).await)?)
                }
            },
        )
        .await;
}

/// One replay loop, from first turn to terminal result.
async fn run_instance(
    inner: Arc<EngineInner>,
    workflow: OrchestrationFn,
    command: Command,
    mut committed: Vec<HistoryEvent>,
) {
    let instance = command.command_id;
    let (tx, mut rx) = mpsc::unbounded_channel::<HistoryEvent>();

    // Resume path: recorded schedules without a recorded completion are
    // re-issued. Fresh submissions have none.
    for action in pending_actions(&committed) {
        dispatch_action(&inner, instance, action, &tx);
    }

    loop {
        let outcome = execute_turn(&workflow, &command, &committed, instance, &inner.defaults);

        if let Some(fault) = outcome.fault {
            error!(
                command_id = %instance,
                reason = %fault.reason(),
                "🛑 ENGINE: Turn faulted"
            );
            let mut result = CommandResult::new(instance);
            result.record_error(CommandError::internal(fault.reason()));
            finish(&inner, &command, result).await;
            return;
        }

        if !outcome.delta.is_empty() {
            // Commit before dispatch: an action runs only after its schedule
            // event is durable.
            if let Err(error) = inner.store.append(instance, &outcome.delta).await {
                fail_on_store_error(&inner, &command, error).await;
                return;
            }
            apply_committed_effects(&inner, instance, &outcome.delta);
            committed.extend(outcome.delta);
        }

        for action in outcome.actions {
            dispatch_action(&inner, instance, action, &tx);
        }

        if let Some(result) = outcome.result {
            finish(&inner, &command, result).await;
            return;
        }

        // Suspended. Wait for the first completion, then drain whatever else
        // already arrived so one turn can consume the whole batch.
        let Some(first) = rx.recv().await else {
            error!(command_id = %instance, "🛑 ENGINE: Completion channel closed mid-run");
            return;
        };
        let mut batch = vec![first];
        while let Ok(next) = rx.try_recv() {
            batch.push(next);
        }
        if let Err(error) = inner.store.append(instance, &batch).await {
            fail_on_store_error(&inner, &command, error).await;
            return;
        }
        committed.extend(batch);
    }
}

/// Hand one scheduled action to the host. Activity and provider work runs on
/// its own task; lock requests go straight to the lock manager, which replies
/// on the instance's completion channel.
fn dispatch_action(
    inner: &Arc<EngineInner>,
    instance: InstanceId,
    action: HostAction,
    tx: &mpsc::UnboundedSender<HistoryEvent>,
) {
    match action {
        HostAction::InvokeActivity {
            id,
            activity,
            input,
            retry,
        } => {
            let inner = Arc::clone(inner);
            let tx = tx.clone();
            tokio::spawn(async move {
                let event = match inner.activities.resolve(&activity).await {
                    Some(handler) => match run_with_retry(handler, input, &retry, &activity).await {
                        Ok(result) => HistoryEvent::ActivityCompleted { id, result },
                        Err(error) => HistoryEvent::ActivityFailed { id, error },
                    },
                    None => HistoryEvent::ActivityFailed {
                        id,
                        error: CommandError::internal(format!(
                            "no handler registered for activity {activity}"
                        )),
                    },
                };
                let _ = tx.send(event);
            });
        }
        HostAction::AcquireLock { id, key, timeout } => {
            inner.locks.acquire(instance, key, id, tx.clone(), timeout);
        }
        HostAction::SendProviderCommand {
            id,
            provider,
            command,
            timeout,
        } => {
            let inner = Arc::clone(inner);
            let tx = tx.clone();
            tokio::spawn(async move {
                let event = match inner.providers.resolve(&provider).await {
                    Some(target) => {
                        match tokio::time::timeout(timeout, target.handle(command)).await {
                            Ok(response) => HistoryEvent::ProviderResultReceived {
                                id,
                                result: ProviderResult::from_response(&provider, response),
                            },
                            Err(_) => {
                                warn!(
                                    provider = %provider,
                                    timeout_ms = timeout.as_millis() as u64,
                                    "⏱️ ENGINE: Provider missed its acknowledgement deadline"
                                );
                                HistoryEvent::ProviderTimedOut {
                                    id,
                                    timeout_ms: timeout.as_millis() as u64,
                                }
                            }
                        }
                    }
                    None => HistoryEvent::ProviderResultReceived {
                        id,
                        result: ProviderResult::unregistered(&provider),
                    },
                };
                let _ = tx.send(event);
            });
        }
    }
}

/// Side effects of newly committed events. Replayed events never reach this
/// point; only a turn's delta does.
fn apply_committed_effects(inner: &Arc<EngineInner>, instance: InstanceId, events: &[HistoryEvent]) {
    for event in events {
        match event {
            HistoryEvent::LockReleased {
                partition,
                document_id,
                ..
            } => {
                inner
                    .locks
                    .release(instance, &DocumentKey::new(partition.clone(), document_id.clone()));
            }
            HistoryEvent::StatusSet { status } => {
                debug!(command_id = %instance, status = %status, "📍 ENGINE: Status changed");
                inner.statuses.insert(instance, status.clone());
                inner.publisher.publish(
                    event_names::COMMAND_STATUS_CHANGED,
                    json!({ "command_id": instance, "status": status }),
                );
            }
            _ => {}
        }
    }
}

/// Record the terminal result, clean up instance state, and wake waiters.
async fn finish(inner: &Arc<EngineInner>, command: &Command, result: CommandResult) {
    let instance = command.command_id;
    // Finalizing is idempotent; workflows hand back a terminal result already.
    let result = result.finalized();

    let completion = HistoryEvent::OrchestrationCompleted {
        result: result.clone(),
        completed_at: Utc::now(),
    };
    if let Err(error) = inner.store.append(instance, &[completion]).await {
        error!(
            command_id = %instance,
            error = %error,
            "💾 ENGINE: Failed to record completion"
        );
    }

    // Safety net for faulted turns; a clean exit released everything already.
    inner.locks.release_all(instance);
    inner.statuses.remove(&instance);

    if result.is_success() {
        info!(command_id = %instance, kind = %command.kind, "✅ ENGINE: Command completed");
        inner.publisher.publish(
            event_names::COMMAND_COMPLETED,
            json!({ "command_id": instance, "kind": command.kind.as_str() }),
        );
    } else {
        warn!(
            command_id = %instance,
            kind = %command.kind,
            errors = result.errors.len(),
            "❌ ENGINE: Command failed"
        );
        inner.publisher.publish(
            event_names::COMMAND_FAILED,
            json!({
                "command_id": instance,
                "kind": command.kind.as_str(),
                "errors": result.errors,
            }),
        );
    }

    inner.results.insert(instance, result);
    inner.active.remove(&instance);
    inner.completed.notify_waiters();
}

async fn fail_on_store_error(inner: &Arc<EngineInner>, command: &Command, error: StoreError) {
    error!(
        command_id = %command.command_id,
        error = %error,
        "💾 ENGINE: History append failed"
    );
    let mut result = CommandResult::new(command.command_id);
    result.record_error(CommandError::internal(format!(
        "history append failed: {error}"
    )));
    finish(inner, command, result).await;
}

/// Schedule events in `history` whose completion never arrived, turned back
/// into dispatchable actions. The schedule events carry everything needed.
fn pending_actions(history: &[HistoryEvent]) -> Vec<HostAction> {
    let completed: HashSet<EventId> = history
        .iter()
        .filter_map(|event| event.completion_id())
        .collect();
    history
        .iter()
        .filter_map(|event| match event {
            HistoryEvent::ActivityScheduled {
                id,
                activity,
                input,
                retry,
            } if !completed.contains(id) => Some(HostAction::InvokeActivity {
                id: *id,
                activity: activity.clone(),
                input: input.clone(),
                retry: retry.clone(),
            }),
            HistoryEvent::LockRequested {
                id,
                partition,
                document_id,
                timeout_ms,
            } if !completed.contains(id) => Some(HostAction::AcquireLock {
                id: *id,
                key: DocumentKey::new(partition.clone(), document_id.clone()),
                timeout: timeout_ms.map(Duration::from_millis),
            }),
            HistoryEvent::ProviderCommandSent {
                id,
                provider,
                command,
                timeout_ms,
            } if !completed.contains(id) => Some(HostAction::SendProviderCommand {
                id: *id,
                provider: provider.clone(),
                command: command.clone(),
                timeout: Duration::from_millis(*timeout_ms),
            }),
            _ => None,
        })
        .collect()
}

/// Keys whose acquisition has no recorded release: the locks the instance was
/// holding when its history was cut.
fn held_keys(history: &[HistoryEvent]) -> Vec<DocumentKey> {
    let mut requested: HashMap<EventId, DocumentKey> = HashMap::new();
    let mut acquired: HashSet<EventId> = HashSet::new();
    let mut released: HashSet<EventId> = HashSet::new();
    for event in history {
        match event {
            HistoryEvent::LockRequested {
                id,
                partition,
                document_id,
                ..
            } => {
                requested.insert(*id, DocumentKey::new(partition.clone(), document_id.clone()));
            }
            HistoryEvent::LockAcquired { id } => {
                acquired.insert(*id);
            }
            HistoryEvent::LockReleased { acquisition_id, .. } => {
                released.insert(*acquisition_id);
            }
            _ => {}
        }
    }
    acquired
        .difference(&released)
        .filter_map(|id| requested.get(id).cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandErrorKind;
    use crate::models::Project;

    fn create_project_command(project: &Project) -> Command {
        Command::new(
            CommandKind::CreateProject,
            serde_json::to_value(project).unwrap(),
        )
        .with_organization_id(project.organization_id)
    }

    #[tokio::test]
    async fn create_command_persists_the_document() {
        let repository = Arc::new(InMemoryRepository::new());
        let engine = CommandEngine::builder()
            .with_repository(repository.clone())
            .build()
            .await;

        let project = Project::new(Uuid::new_v4(), "checkout");
        let id = engine
            .submit(create_project_command(&project))
            .await
            .unwrap();
        let result = engine.await_result(id).await.unwrap();

        assert!(result.is_success(), "errors: {:?}", result.errors);
        let stored = repository
            .get(&Project::key_for(project.organization_id, project.id))
            .await
            .unwrap()
            .expect("document should be persisted");
        assert_eq!(stored.body["name"], "checkout");
        // Instance state is cleaned up once terminal.
        assert!(engine.custom_status(id).is_none());
        assert!(engine.result(id).is_some());
    }

    #[tokio::test]
    async fn redelivered_command_attaches_to_the_original_instance() {
        let store = Arc::new(InMemoryHistoryStore::new());
        let engine = CommandEngine::builder()
            .with_history_store(store.clone())
            .build()
            .await;

        let project = Project::new(Uuid::new_v4(), "checkout");
        let command = create_project_command(&project);
        let first = engine.submit(command.clone()).await.unwrap();
        let second = engine.submit(command).await.unwrap();
        assert_eq!(first, second);

        let result = engine.await_result(first).await.unwrap();
        assert!(result.is_success());

        let history = store.read(first).await.unwrap();
        let starts = history
            .iter()
            .filter(|e| matches!(e, HistoryEvent::OrchestrationStarted { .. }))
            .count();
        assert_eq!(starts, 1, "redelivery must not start a second instance");
    }

    #[tokio::test]
    async fn nil_command_id_is_rejected() {
        let engine = CommandEngine::new().await;
        let command = Command::new(CommandKind::CreateProject, json!({"name": "x"}))
            .with_command_id(Uuid::nil());
        assert!(matches!(
            engine.submit(command).await,
            Err(EngineError::InvalidCommand(_))
        ));
    }

    #[tokio::test]
    async fn update_of_a_missing_document_fails_not_found() {
        let engine = CommandEngine::new().await;
        let project = Project::new(Uuid::new_v4(), "ghost");
        let command = Command::new(
            CommandKind::UpdateProject,
            serde_json::to_value(&project).unwrap(),
        );

        let id = engine.submit(command).await.unwrap();
        let result = engine.await_result(id).await.unwrap();

        assert!(!result.is_success());
        assert_eq!(result.errors[0].kind, CommandErrorKind::NotFound);
        assert!(result.result.is_none());
    }

    #[tokio::test]
    async fn await_result_for_an_unknown_command_errors() {
        let engine = CommandEngine::new().await;
        assert!(matches!(
            engine.await_result(Uuid::new_v4()).await,
            Err(EngineError::UnknownCommand(_))
        ));
    }

    #[tokio::test]
    async fn finished_instance_resumes_to_its_recorded_result() {
        let store = Arc::new(InMemoryHistoryStore::new());
        let repository = Arc::new(InMemoryRepository::new());
        let engine = CommandEngine::builder()
            .with_history_store(store.clone())
            .with_repository(repository.clone())
            .build()
            .await;

        let project = Project::new(Uuid::new_v4(), "checkout");
        let id = engine
            .submit(create_project_command(&project))
            .await
            .unwrap();
        let original = engine.await_result(id).await.unwrap();
        assert!(original.is_success());
        drop(engine);

        let revived = CommandEngine::builder()
            .with_history_store(store)
            .with_repository(repository)
            .build()
            .await;
        revived.resume(id).await.unwrap();
        let replayed = revived.await_result(id).await.unwrap();
        assert_eq!(replayed, original);
    }

    #[tokio::test]
    async fn resume_of_an_unknown_instance_errors() {
        let engine = CommandEngine::new().await;
        assert!(matches!(
            engine.resume(Uuid::new_v4()).await,
            Err(EngineError::UnknownCommand(_))
        ));
    }

    #[tokio::test]
    async fn shutdown_rejects_new_submissions() {
        let engine = CommandEngine::new().await;
        engine.shutdown().await;
        let project = Project::new(Uuid::new_v4(), "late");
        assert!(matches!(
            engine.submit(create_project_command(&project)).await,
            Err(EngineError::ShuttingDown)
        ));
    }
}

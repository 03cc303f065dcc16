//! # Replay and Resume Integration Tests
//!
//! Crash recovery against a shared history store: a second engine picks up a
//! parked instance from its recorded history, re-runs only what never
//! completed, restores lock holdership across the critical section, and
//! flags diverging replays instead of double-applying effects. "Crashes" are
//! staged by overriding one activity (or provider) to hang forever on the
//! first engine, parking the instance after its schedule event is durable.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::*;
use stratus_core::models::{LockableDocument, Project};
use stratus_core::providers::ProviderEvent;
use stratus_core::repository::DocumentRepository;
use stratus_core::runtime::{
    ActivityResult, HistoryEvent, HistoryStore, InMemoryHistoryStore, InstanceId, OrchestrationFn,
};
use stratus_core::{CommandEngine, CommandErrorKind, CommandKind, CommandResult, CommandStatus};

async fn paired_engine(
    store: &Arc<InMemoryHistoryStore>,
    repository: &Arc<RecordingRepository>,
) -> CommandEngine {
    CommandEngine::builder()
        .with_config(fast_config())
        .with_history_store(store.clone())
        .with_repository(repository.clone())
        .build()
        .await
}

async fn wait_for_event(
    store: &Arc<InMemoryHistoryStore>,
    instance: InstanceId,
    what: &str,
    matched: impl Fn(&HistoryEvent) -> bool,
) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let events = store.read(instance).await.unwrap();
        if events.iter().any(&matched) {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn finished_instance_resumes_to_its_recorded_result_without_rerunning() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let repository = RecordingRepository::new();

    let original = paired_engine(&store, &repository).await;
    let project = sample_project();
    let command_id = original.submit(create_project(&project)).await.unwrap();
    let first = original.await_result(command_id).await.unwrap();
    assert!(first.is_success());

    let restarted = paired_engine(&store, &repository).await;
    restarted.resume(command_id).await.unwrap();
    let replayed = restarted.await_result(command_id).await.unwrap();

    assert_eq!(replayed, first);
    assert_eq!(repository.calls_to("add"), 1);
}

#[tokio::test]
async fn resume_runs_a_scheduled_but_unfinished_activity_exactly_once() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let repository = RecordingRepository::new();

    let halted = paired_engine(&store, &repository).await;
    // Park the instance at its first persistence step: the schedule event
    // commits, the activity itself never returns.
    halted
        .register_activity("repository.add", |_| {
            std::future::pending::<ActivityResult>()
        })
        .await;

    let project = sample_project();
    let command_id = halted.submit(create_project(&project)).await.unwrap();
    wait_until("the add schedule to commit", || {
        store.event_count(command_id) > 1
    })
    .await;
    assert_eq!(repository.calls_to("add"), 0);

    let recovered = paired_engine(&store, &repository).await;
    recovered.resume(command_id).await.unwrap();
    let result = recovered.await_result(command_id).await.unwrap();

    assert!(result.is_success());
    assert_eq!(repository.calls_to("add"), 1);
    assert!(repository.inner().contains(&project.document_key()));
}

#[tokio::test]
async fn resume_restores_lock_holdership_through_the_critical_section() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let repository = RecordingRepository::new();

    let seeded = paired_engine(&store, &repository).await;
    let project = sample_project();
    let created = seeded.submit(create_project(&project)).await.unwrap();
    assert!(seeded.await_result(created).await.unwrap().is_success());

    // Park an update after its lock acquisition and read, mid write.
    let halted = paired_engine(&store, &repository).await;
    halted
        .register_activity("repository.set", |_| {
            std::future::pending::<ActivityResult>()
        })
        .await;
    let renamed = Project {
        description: Some("rebuilt".to_string()),
        ..project.clone()
    };
    let command_id = halted.submit(update_project(&renamed)).await.unwrap();
    wait_for_event(&store, command_id, "the set schedule", |event| {
        matches!(event, HistoryEvent::ActivityScheduled { activity, .. } if activity == "repository.set")
    })
    .await;

    let recovered = paired_engine(&store, &repository).await;
    recovered.resume(command_id).await.unwrap();
    let result = recovered.await_result(command_id).await.unwrap();

    assert!(result.is_success());
    // The read replayed from history; only the parked write ran again.
    assert_eq!(repository.calls_to("get"), 1);
    assert_eq!(repository.calls_to("set"), 1);
    let stored = repository
        .inner()
        .get(&project.document_key())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.body["description"], serde_json::json!("rebuilt"));

    // Holdership was restored, not re-requested, and released on completion.
    let history = store.read(command_id).await.unwrap();
    let lock_requests = history
        .iter()
        .filter(|e| matches!(e, HistoryEvent::LockRequested { .. }))
        .count();
    assert_eq!(lock_requests, 1);
    let followup = recovered.submit(update_project(&renamed)).await.unwrap();
    let outcome = tokio::time::timeout(
        Duration::from_secs(1),
        recovered.await_result(followup),
    )
    .await
    .expect("lock was not released after the resumed command completed")
    .unwrap();
    assert!(outcome.is_success());
}

#[tokio::test]
async fn resume_redispatches_unacknowledged_provider_sends() {
    let store = Arc::new(InMemoryHistoryStore::new());
    let repository = RecordingRepository::new();

    let halted = paired_engine(&store, &repository).await;
    let black_hole = ScriptedProvider::new(
        "mirror",
        vec![ProviderEvent::ProjectCreated],
        ProviderScript::Stall(Duration::from_secs(600)),
    );
    halted.register_provider(black_hole.clone()).await.unwrap();

    let project = sample_project();
    let command_id = halted.submit(create_project(&project)).await.unwrap();
    wait_for_event(&store, command_id, "the provider send", |event| {
        matches!(event, HistoryEvent::ProviderCommandSent { provider, .. } if provider == "mirror")
    })
    .await;

    let recovered = paired_engine(&store, &repository).await;
    let mirror = ScriptedProvider::new(
        "mirror",
        vec![ProviderEvent::ProjectCreated],
        ProviderScript::Succeed,
    );
    recovered.register_provider(mirror.clone()).await.unwrap();
    recovered.resume(command_id).await.unwrap();
    let result = recovered.await_result(command_id).await.unwrap();

    assert!(result.is_success());
    // The provider saw the command again; the mutation did not run again.
    assert_eq!(mirror.received().len(), 1);
    assert_eq!(repository.calls_to("add"), 1);
}

#[tokio::test]
async fn diverging_replay_faults_the_command_as_internal() {
    static EXECUTIONS: AtomicUsize = AtomicUsize::new(0);

    let engine = CommandEngine::builder()
        .with_config(fast_config())
        .build()
        .await;

    // Asks for a different first operation on every execution, which replay
    // must refuse rather than guess at.
    let workflow: OrchestrationFn = Arc::new(|ctx, command| {
        Box::pin(async move {
            let mut result = CommandResult::new(command.command_id);
            let step = if EXECUTIONS.fetch_add(1, Ordering::SeqCst) == 0 {
                ctx.current_time().await.map(|_| ())
            } else {
                ctx.new_uuid().await.map(|_| ())
            };
            if let Err(error) = step {
                result.record_error(error);
            }
            result.finalized()
        })
    });
    engine
        .register_workflow(CommandKind::CreateProject, workflow)
        .await;

    let command_id = engine
        .submit(create_project(&sample_project()))
        .await
        .unwrap();
    let result = engine.await_result(command_id).await.unwrap();

    assert_eq!(result.status, CommandStatus::Failed);
    assert_eq!(result.errors[0].kind, CommandErrorKind::Internal);

    // The fault is contained to its instance; the engine keeps serving.
    let component = sample_component(&sample_project());
    let next = engine.submit(create_component(&component)).await.unwrap();
    assert!(engine.await_result(next).await.unwrap().is_success());
}

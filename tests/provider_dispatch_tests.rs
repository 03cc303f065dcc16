//! # Provider Dispatch Integration Tests
//!
//! Fan-out and aggregation semantics: every subscriber gets one command per
//! applicable lifecycle event, per-provider failures and timeouts degrade the
//! command result without losing the mutation, and slots aggregate in
//! provider-name order.

mod common;

use std::time::Duration;

use common::*;
use serde_json::json;
use stratus_core::models::Project;
use stratus_core::providers::ProviderEvent;
use stratus_core::{Command, CommandEngine, CommandErrorKind, CommandKind, CommandStatus};
use uuid::Uuid;

#[tokio::test]
async fn command_fans_out_to_every_subscriber() {
    let repository = RecordingRepository::new();
    let engine = CommandEngine::builder()
        .with_config(fast_config())
        .with_repository(repository.clone())
        .build()
        .await;

    let alpha = ScriptedProvider::new(
        "alpha",
        vec![ProviderEvent::ProjectCreated],
        ProviderScript::Succeed,
    );
    let beta = ScriptedProvider::new(
        "beta",
        vec![ProviderEvent::ProjectCreated, ProviderEvent::ProjectDeleted],
        ProviderScript::Succeed,
    );
    let gamma = ScriptedProvider::new(
        "gamma",
        vec![ProviderEvent::ComponentCreated],
        ProviderScript::Succeed,
    );
    for provider in [&alpha, &beta, &gamma] {
        engine.register_provider(provider.clone()).await.unwrap();
    }

    let project = sample_project();
    let command = create_project(&project).with_requested_by("alice@example.com");
    let command_id = engine.submit(command).await.unwrap();
    let result = engine.await_result(command_id).await.unwrap();

    assert!(result.is_success());
    let to_alpha = alpha.received();
    assert_eq!(to_alpha.len(), 1);
    assert_eq!(to_alpha[0].event, ProviderEvent::ProjectCreated);
    assert_eq!(to_alpha[0].payload["name"], json!("checkout"));
    assert_eq!(to_alpha[0].requested_by, "alice@example.com");
    assert_eq!(beta.received().len(), 1);
    assert!(gamma.received().is_empty());
}

#[tokio::test]
async fn provider_failure_degrades_the_result_but_keeps_the_mutation() {
    let repository = RecordingRepository::new();
    let engine = CommandEngine::builder()
        .with_config(fast_config())
        .with_repository(repository.clone())
        .build()
        .await;

    let mirror = ScriptedProvider::new(
        "mirror",
        vec![ProviderEvent::ProjectCreated],
        ProviderScript::Succeed,
    );
    let flaky = ScriptedProvider::new(
        "flaky",
        vec![ProviderEvent::ProjectCreated],
        ProviderScript::FailWith("webhook rejected".to_string()),
    );
    engine.register_provider(mirror.clone()).await.unwrap();
    engine.register_provider(flaky.clone()).await.unwrap();

    let project = sample_project();
    let command_id = engine.submit(create_project(&project)).await.unwrap();
    let result = engine.await_result(command_id).await.unwrap();

    assert_eq!(result.status, CommandStatus::Failed);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, CommandErrorKind::Provider);
    assert_eq!(result.errors[0].source.as_deref(), Some("flaky"));
    // The document was stored before dispatch and stays stored.
    assert!(repository
        .inner()
        .contains(&Project::key_for(project.organization_id, project.id)));
    assert_eq!(result.result.as_ref().unwrap()["name"], json!("checkout"));
}

#[tokio::test]
async fn provider_failures_aggregate_in_name_order() {
    let engine = CommandEngine::builder()
        .with_config(fast_config())
        .build()
        .await;

    let zeta = ScriptedProvider::new(
        "zeta",
        vec![ProviderEvent::ProjectCreated],
        ProviderScript::FailWith("queue full".to_string()),
    );
    let alpha = ScriptedProvider::new(
        "alpha",
        vec![ProviderEvent::ProjectCreated],
        ProviderScript::FailWith("endpoint gone".to_string()),
    );
    engine.register_provider(zeta.clone()).await.unwrap();
    engine.register_provider(alpha.clone()).await.unwrap();

    let command_id = engine
        .submit(create_project(&sample_project()))
        .await
        .unwrap();
    let result = engine.await_result(command_id).await.unwrap();

    assert_eq!(result.status, CommandStatus::Failed);
    let sources: Vec<&str> = result
        .errors
        .iter()
        .filter_map(|e| e.source.as_deref())
        .collect();
    assert_eq!(sources, vec!["alpha", "zeta"]);
}

#[tokio::test]
async fn slow_provider_times_out_without_failing_the_fast_one() {
    let engine = CommandEngine::builder()
        .with_config(fast_config_with_ack_timeout(50))
        .build()
        .await;

    let snail = ScriptedProvider::new(
        "snail",
        vec![ProviderEvent::ProjectCreated],
        ProviderScript::Stall(Duration::from_millis(1000)),
    );
    let rabbit = ScriptedProvider::new(
        "rabbit",
        vec![ProviderEvent::ProjectCreated],
        ProviderScript::Succeed,
    );
    engine.register_provider(snail.clone()).await.unwrap();
    engine.register_provider(rabbit.clone()).await.unwrap();

    let command_id = engine
        .submit(create_project(&sample_project()))
        .await
        .unwrap();
    let result = engine.await_result(command_id).await.unwrap();

    assert_eq!(result.status, CommandStatus::Failed);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, CommandErrorKind::Provider);
    assert_eq!(result.errors[0].source.as_deref(), Some("snail"));
    assert!(result.errors[0].message.contains("did not acknowledge"));
    assert_eq!(rabbit.received().len(), 1);
}

#[tokio::test]
async fn no_subscribers_is_a_clean_success() {
    let engine = CommandEngine::builder()
        .with_config(fast_config())
        .build()
        .await;

    let command_id = engine
        .submit(create_project(&sample_project()))
        .await
        .unwrap();
    let result = engine.await_result(command_id).await.unwrap();

    assert!(result.is_success());
    assert!(result.errors.is_empty());
}

#[tokio::test]
async fn dispatch_carries_the_post_mutation_snapshot() {
    let engine = CommandEngine::builder()
        .with_config(fast_config())
        .build()
        .await;

    let mirror = ScriptedProvider::new(
        "mirror",
        vec![ProviderEvent::ProjectCreated],
        ProviderScript::Succeed,
    );
    engine.register_provider(mirror.clone()).await.unwrap();

    // No id in the payload: the engine assigns one, and the provider must see
    // the assigned value, not the submitted blank.
    let organization_id = Uuid::new_v4();
    let command = Command::new(
        CommandKind::CreateProject,
        json!({"organization_id": organization_id, "name": "billing"}),
    )
    .with_organization_id(organization_id);
    let correlation_id = command.correlation_id;

    let command_id = engine.submit(command).await.unwrap();
    let result = engine.await_result(command_id).await.unwrap();
    assert!(result.is_success());

    let received = mirror.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].command_id, command_id);
    assert_eq!(received[0].correlation_id, correlation_id);
    assert_eq!(received[0].organization_id, Some(organization_id));
    assert_eq!(
        received[0].payload["id"],
        result.result.as_ref().unwrap()["id"]
    );
    assert_ne!(received[0].payload["id"], json!(Uuid::nil().to_string()));
}

#[tokio::test]
async fn deletion_dispatch_carries_the_final_snapshot() {
    let engine = CommandEngine::builder()
        .with_config(fast_config())
        .build()
        .await;

    let auditor = ScriptedProvider::new(
        "auditor",
        vec![ProviderEvent::ProjectDeleted],
        ProviderScript::SucceedWith(json!({"archived": true})),
    );
    engine.register_provider(auditor.clone()).await.unwrap();

    let project = sample_project();
    let created = engine.submit(create_project(&project)).await.unwrap();
    assert!(engine.await_result(created).await.unwrap().is_success());

    let deleted = engine
        .submit(delete_project(project.organization_id, project.id))
        .await
        .unwrap();
    let result = engine.await_result(deleted).await.unwrap();

    assert!(result.is_success());
    let received = auditor.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].event, ProviderEvent::ProjectDeleted);
    // The deleted document's last stored state, not the slim delete payload.
    assert_eq!(received[0].payload["name"], json!("checkout"));
}

//! # Lifecycle Event Stream Tests
//!
//! The engine broadcasts command lifecycle events as JSON contexts. The
//! terminal event lands before `await_result` returns, so draining the
//! receiver afterwards sees the whole run in order.

mod common;

use common::*;
use serde_json::json;
use stratus_core::constants::events;
use stratus_core::{CommandEngine, PublishedEvent};

async fn drained(stream: &mut tokio::sync::broadcast::Receiver<PublishedEvent>) -> Vec<PublishedEvent> {
    let mut events = Vec::new();
    while let Ok(event) = stream.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn successful_command_publishes_received_phases_then_completed() {
    let engine = CommandEngine::builder()
        .with_config(fast_config())
        .build()
        .await;
    let mut stream = engine.event_publisher().subscribe();

    let project = sample_project();
    let command_id = engine.submit(create_project(&project)).await.unwrap();
    assert!(engine.await_result(command_id).await.unwrap().is_success());

    let events = drained(&mut stream).await;
    assert_eq!(events.first().unwrap().name, events::COMMAND_RECEIVED);
    assert_eq!(
        events.first().unwrap().context["command_id"],
        json!(command_id)
    );
    assert_eq!(events.last().unwrap().name, events::COMMAND_COMPLETED);

    let phases: Vec<String> = events
        .iter()
        .filter(|e| e.name == events::COMMAND_STATUS_CHANGED)
        .map(|e| e.context["status"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        phases,
        vec!["processing", "persisting", "dispatching", "finalizing"]
    );
}

#[tokio::test]
async fn failed_command_publishes_failed_with_its_errors() {
    let engine = CommandEngine::builder()
        .with_config(fast_config())
        .build()
        .await;
    let mut stream = engine.event_publisher().subscribe();

    let mut project = sample_project();
    project.name = String::new();
    let command_id = engine.submit(create_project(&project)).await.unwrap();
    let result = engine.await_result(command_id).await.unwrap();
    assert!(!result.is_success());

    let events = drained(&mut stream).await;
    let terminal = events.last().unwrap();
    assert_eq!(terminal.name, events::COMMAND_FAILED);
    assert_eq!(terminal.context["errors"][0]["kind"], json!("validation"));
    assert!(!events
        .iter()
        .any(|e| e.name == events::COMMAND_COMPLETED));
}

#[tokio::test]
async fn update_reports_the_lock_phase() {
    let engine = CommandEngine::builder()
        .with_config(fast_config())
        .build()
        .await;

    let project = sample_project();
    let created = engine.submit(create_project(&project)).await.unwrap();
    assert!(engine.await_result(created).await.unwrap().is_success());

    let mut stream = engine.event_publisher().subscribe();
    let updated = engine.submit(update_project(&project)).await.unwrap();
    assert!(engine.await_result(updated).await.unwrap().is_success());

    let phases: Vec<String> = drained(&mut stream)
        .await
        .iter()
        .filter(|e| e.name == events::COMMAND_STATUS_CHANGED)
        .map(|e| e.context["status"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        phases,
        vec![
            "processing",
            "acquiring_lock",
            "persisting",
            "dispatching",
            "finalizing"
        ]
    );
}

#![allow(clippy::doc_markdown)] // Allow technical terms like TOML, JSON in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Stratus Core
//!
//! Deterministic command orchestration core for control-plane services.
//!
//! ## Overview
//!
//! Stratus Core executes entity lifecycle commands (create/update/delete of
//! projects, project users, components, and deployment scopes) as durable,
//! replayable workflows. Every side effect — repository call, document lock,
//! provider send — is recorded in an append-only history; after a crash the
//! engine rebuilds in-flight state by re-executing the workflow against that
//! history, so no action runs twice and no lock is leaked.
//!
//! ## Execution Model
//!
//! Workflows run in turns. Each turn re-executes the workflow function from
//! the start against committed history: calls whose outcome is recorded
//! resolve instantly, the first unrecorded call suspends the turn, and the
//! host performs the newly scheduled work before the next turn. Workflow
//! code must be deterministic; the clock, uuid generation, and every other
//! side effect go through the [`runtime::OrchestrationContext`].
//!
//! ## Module Organization
//!
//! - [`commands`] - Command envelopes, errors, and per-command results
//! - [`models`] - The lockable entity documents the control plane manages
//! - [`repository`] - Document store seam plus its recorded activities
//! - [`runtime`] - Replay machinery: history, activities, locks, context
//! - [`orchestration`] - The engine, workflow registry, and built-in workflows
//! - [`providers`] - Downstream provider registry and fan-out dispatch
//! - [`events`] - Lifecycle event publishing
//! - [`config`] - Typed configuration with TOML and environment layering
//! - [`error`] - Crate-level error wrapper
//!
//! ## Quick Start
//!
//! ```rust
//! use stratus_core::commands::{Command, CommandKind};
//! use stratus_core::models::Project;
//! use stratus_core::orchestration::CommandEngine;
//! use uuid::Uuid;
//!
//! tokio_test::block_on(async {
//!     let engine = CommandEngine::new().await;
//!
//!     let project = Project::new(Uuid::new_v4(), "checkout");
//!     let command = Command::new(
//!         CommandKind::CreateProject,
//!         serde_json::to_value(&project).unwrap(),
//!     );
//!
//!     let id = engine.submit(command).await.unwrap();
//!     let result = engine.await_result(id).await.unwrap();
//!     assert!(result.is_success());
//! });
//! ```

pub mod commands;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod providers;
pub mod repository;
pub mod runtime;

pub use commands::{
    Command, CommandError, CommandErrorKind, CommandKind, CommandResult, CommandStatus,
};
pub use config::{ConfigManager, StratusConfig};
pub use error::{Result, StratusError};
pub use events::{EventPublisher, PublishedEvent};
pub use logging::init_structured_logging;
pub use models::{
    Component, DeploymentScope, DocumentKey, LockableDocument, Project, ProjectRole, ProjectUser,
    ScopeEnvironment,
};
pub use orchestration::{
    CommandEngine, CommandEngineBuilder, DocumentLock, DocumentLockGuard, EngineError,
    OrchestrationRegistry,
};
pub use providers::{
    CommandProvider, ProviderCommand, ProviderEvent, ProviderRegistry, ProviderResponse,
    ProviderResult,
};
pub use repository::{
    Document, DocumentClient, DocumentRepository, InMemoryRepository, RepositoryError,
};
pub use runtime::{
    ActivityError, ActivityRegistry, ActivityResult, ErrorCategory, HistoryEvent, HistoryStore,
    InMemoryHistoryStore, InstanceId, OrchestrationContext, RetryPolicy, RuntimeDefaults,
};

//! Construction helpers shared by the integration tests: engine configs tuned
//! for fast runs, sample entities, and command envelopes for each kind.

#![allow(dead_code)] // Each test binary uses its own slice of these helpers.

use serde_json::json;
use uuid::Uuid;

use stratus_core::models::{
    Component, DeploymentScope, Project, ProjectRole, ProjectUser, ScopeEnvironment,
};
use stratus_core::{Command, CommandKind, StratusConfig};

/// Default configuration with retry delays collapsed to near-zero so failure
/// paths finish in milliseconds instead of minutes.
pub fn fast_config() -> StratusConfig {
    let mut config = StratusConfig::default();
    config.orchestration.retry.max_attempts = 3;
    config.orchestration.retry.base_delay_ms = 1;
    config.orchestration.retry.max_delay_ms = 5;
    config.orchestration.retry.jitter = false;
    config
}

/// [`fast_config`] with a bounded lock wait, for tests that expect contention
/// to surface as a timeout rather than a hang.
pub fn fast_config_with_lock_timeout(timeout_ms: u64) -> StratusConfig {
    let mut config = fast_config();
    config.orchestration.locks.acquire_timeout_ms = Some(timeout_ms);
    config
}

/// [`fast_config`] with a short provider acknowledgement deadline.
pub fn fast_config_with_ack_timeout(timeout_ms: u64) -> StratusConfig {
    let mut config = fast_config();
    config.orchestration.providers.ack_timeout_ms = timeout_ms;
    config
}

pub fn sample_project() -> Project {
    Project::new(Uuid::new_v4(), "checkout")
}

pub fn sample_component(project: &Project) -> Component {
    Component::new(project.id, "api", "templates/service@2")
}

pub fn sample_user(project: &Project) -> ProjectUser {
    ProjectUser::new(project.id, "alice", "Alice", ProjectRole::Owner)
}

pub fn sample_scope(project: &Project) -> DeploymentScope {
    DeploymentScope::new(project.id, "staging-eu", ScopeEnvironment::Staging, "eu-west-1")
}

pub fn create_project(project: &Project) -> Command {
    Command::new(
        CommandKind::CreateProject,
        serde_json::to_value(project).unwrap(),
    )
    .with_organization_id(project.organization_id)
}

pub fn update_project(project: &Project) -> Command {
    Command::new(
        CommandKind::UpdateProject,
        serde_json::to_value(project).unwrap(),
    )
    .with_organization_id(project.organization_id)
}

pub fn delete_project(organization_id: Uuid, id: Uuid) -> Command {
    Command::new(
        CommandKind::DeleteProject,
        json!({"organization_id": organization_id, "id": id}),
    )
    .with_organization_id(organization_id)
}

pub fn create_user(user: &ProjectUser) -> Command {
    Command::new(
        CommandKind::CreateProjectUser,
        serde_json::to_value(user).unwrap(),
    )
    .with_project_id(user.project_id)
}

pub fn update_user(user: &ProjectUser) -> Command {
    Command::new(
        CommandKind::UpdateProjectUser,
        serde_json::to_value(user).unwrap(),
    )
    .with_project_id(user.project_id)
}

pub fn delete_user(project_id: Uuid, id: Uuid) -> Command {
    Command::new(
        CommandKind::DeleteProjectUser,
        json!({"project_id": project_id, "id": id}),
    )
    .with_project_id(project_id)
}

pub fn create_component(component: &Component) -> Command {
    Command::new(
        CommandKind::CreateComponent,
        serde_json::to_value(component).unwrap(),
    )
    .with_project_id(component.project_id)
}

pub fn update_component(component: &Component) -> Command {
    Command::new(
        CommandKind::UpdateComponent,
        serde_json::to_value(component).unwrap(),
    )
    .with_project_id(component.project_id)
}

pub fn delete_component(project_id: Uuid, id: Uuid) -> Command {
    Command::new(
        CommandKind::DeleteComponent,
        json!({"project_id": project_id, "id": id}),
    )
    .with_project_id(project_id)
}

pub fn create_scope(scope: &DeploymentScope) -> Command {
    Command::new(
        CommandKind::CreateDeploymentScope,
        serde_json::to_value(scope).unwrap(),
    )
    .with_project_id(scope.project_id)
}

pub fn delete_scope(project_id: Uuid, id: Uuid) -> Command {
    Command::new(
        CommandKind::DeleteDeploymentScope,
        json!({"project_id": project_id, "id": id}),
    )
    .with_project_id(project_id)
}

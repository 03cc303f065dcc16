//! # Command Envelope
//!
//! The immutable unit of work submitted to the orchestration engine. A command
//! names the operation (its [`CommandKind`]), carries the entity snapshot being
//! acted on as its payload, and holds the correlation metadata that follows the
//! command through logs, history, and provider fan-out.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::error::CommandError;

/// The operation a command requests. Each kind maps to exactly one registered
/// orchestration workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    CreateProject,
    UpdateProject,
    DeleteProject,
    CreateProjectUser,
    UpdateProjectUser,
    DeleteProjectUser,
    CreateComponent,
    UpdateComponent,
    DeleteComponent,
    CreateDeploymentScope,
    DeleteDeploymentScope,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::CreateProject => "create_project",
            CommandKind::UpdateProject => "update_project",
            CommandKind::DeleteProject => "delete_project",
            CommandKind::CreateProjectUser => "create_project_user",
            CommandKind::UpdateProjectUser => "update_project_user",
            CommandKind::DeleteProjectUser => "delete_project_user",
            CommandKind::CreateComponent => "create_component",
            CommandKind::UpdateComponent => "update_component",
            CommandKind::DeleteComponent => "delete_component",
            CommandKind::CreateDeploymentScope => "create_deployment_scope",
            CommandKind::DeleteDeploymentScope => "delete_deployment_scope",
        }
    }

    /// Entity family this command operates on.
    pub fn entity(&self) -> &'static str {
        match self {
            CommandKind::CreateProject | CommandKind::UpdateProject | CommandKind::DeleteProject => {
                "project"
            }
            CommandKind::CreateProjectUser
            | CommandKind::UpdateProjectUser
            | CommandKind::DeleteProjectUser => "project_user",
            CommandKind::CreateComponent
            | CommandKind::UpdateComponent
            | CommandKind::DeleteComponent => "component",
            CommandKind::CreateDeploymentScope | CommandKind::DeleteDeploymentScope => {
                "deployment_scope"
            }
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(
            self,
            CommandKind::CreateProject
                | CommandKind::CreateProjectUser
                | CommandKind::CreateComponent
                | CommandKind::CreateDeploymentScope
        )
    }

    pub fn is_delete(&self) -> bool {
        matches!(
            self,
            CommandKind::DeleteProject
                | CommandKind::DeleteProjectUser
                | CommandKind::DeleteComponent
                | CommandKind::DeleteDeploymentScope
        )
    }

    pub fn all() -> &'static [CommandKind] {
        &[
            CommandKind::CreateProject,
            CommandKind::UpdateProject,
            CommandKind::DeleteProject,
            CommandKind::CreateProjectUser,
            CommandKind::UpdateProjectUser,
            CommandKind::DeleteProjectUser,
            CommandKind::CreateComponent,
            CommandKind::UpdateComponent,
            CommandKind::DeleteComponent,
            CommandKind::CreateDeploymentScope,
            CommandKind::DeleteDeploymentScope,
        ]
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CommandKind {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommandKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CommandError::validation(format!("unknown command kind: {s}")))
    }
}

/// An immutable command submitted to the engine.
///
/// The `command_id` doubles as the orchestration instance id, so redelivery of
/// the same command attaches to the original instance instead of starting a
/// second one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub command_id: Uuid,
    pub kind: CommandKind,
    /// Entity snapshot the command acts on (a project, user, component, or
    /// deployment scope serialized to JSON).
    pub payload: Value,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub project_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub organization_id: Option<Uuid>,
    pub requested_by: String,
    pub correlation_id: Uuid,
    pub submitted_at: DateTime<Utc>,
}

impl Command {
    pub fn new(kind: CommandKind, payload: Value) -> Self {
        Self {
            command_id: Uuid::new_v4(),
            kind,
            payload,
            project_id: None,
            organization_id: None,
            requested_by: crate::constants::system::DEFAULT_REQUESTED_BY.to_string(),
            correlation_id: Uuid::new_v4(),
            submitted_at: Utc::now(),
        }
    }

    pub fn with_command_id(mut self, command_id: Uuid) -> Self {
        self.command_id = command_id;
        self
    }

    pub fn with_project_id(mut self, project_id: Uuid) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn with_organization_id(mut self, organization_id: Uuid) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    pub fn with_requested_by(mut self, requested_by: impl Into<String>) -> Self {
        self.requested_by = requested_by.into();
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    /// Deserialize the payload into the entity type the workflow expects.
    /// A malformed payload is a validation failure, surfaced before any lock
    /// is taken or mutation attempted.
    pub fn entity_payload<T: DeserializeOwned>(&self) -> Result<T, CommandError> {
        serde_json::from_value(self.payload.clone()).map_err(|e| {
            CommandError::validation(format!(
                "payload for {} is not a valid {}: {e}",
                self.kind,
                self.kind.entity()
            ))
        })
    }
}

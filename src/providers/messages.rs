//! # Provider Channel Messages
//!
//! The one-request / one-response shapes exchanged with providers. Outbound, a
//! [`ProviderCommand`] tells a provider what happened and to what entity;
//! inbound, a [`ProviderResult`] reports how that provider fared. Both shapes
//! are recorded verbatim in orchestration history, so they must serialize
//! stably.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::commands::{Command, CommandError, CommandKind};

/// Lifecycle events providers subscribe to. One event exists per command
/// outcome; the mapping from [`CommandKind`] is total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderEvent {
    ProjectCreated,
    ProjectUpdated,
    ProjectDeleted,
    ProjectUserCreated,
    ProjectUserUpdated,
    ProjectUserDeleted,
    ComponentCreated,
    ComponentUpdated,
    ComponentDeleted,
    DeploymentScopeCreated,
    DeploymentScopeDeleted,
}

impl ProviderEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderEvent::ProjectCreated => "project.created",
            ProviderEvent::ProjectUpdated => "project.updated",
            ProviderEvent::ProjectDeleted => "project.deleted",
            ProviderEvent::ProjectUserCreated => "project_user.created",
            ProviderEvent::ProjectUserUpdated => "project_user.updated",
            ProviderEvent::ProjectUserDeleted => "project_user.deleted",
            ProviderEvent::ComponentCreated => "component.created",
            ProviderEvent::ComponentUpdated => "component.updated",
            ProviderEvent::ComponentDeleted => "component.deleted",
            ProviderEvent::DeploymentScopeCreated => "deployment_scope.created",
            ProviderEvent::DeploymentScopeDeleted => "deployment_scope.deleted",
        }
    }

    /// The event announced when a command of the given kind applies.
    pub fn for_command(kind: CommandKind) -> Self {
        match kind {
            CommandKind::CreateProject => ProviderEvent::ProjectCreated,
            CommandKind::UpdateProject => ProviderEvent::ProjectUpdated,
            CommandKind::DeleteProject => ProviderEvent::ProjectDeleted,
            CommandKind::CreateProjectUser => ProviderEvent::ProjectUserCreated,
            CommandKind::UpdateProjectUser => ProviderEvent::ProjectUserUpdated,
            CommandKind::DeleteProjectUser => ProviderEvent::ProjectUserDeleted,
            CommandKind::CreateComponent => ProviderEvent::ComponentCreated,
            CommandKind::UpdateComponent => ProviderEvent::ComponentUpdated,
            CommandKind::DeleteComponent => ProviderEvent::ComponentDeleted,
            CommandKind::CreateDeploymentScope => ProviderEvent::DeploymentScopeCreated,
            CommandKind::DeleteDeploymentScope => ProviderEvent::DeploymentScopeDeleted,
        }
    }
}

impl fmt::Display for ProviderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outbound command sent to one provider: the internal command translated to
/// the external shape (event + entity snapshot + correlation metadata).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderCommand {
    pub command_id: Uuid,
    pub event: ProviderEvent,
    /// Snapshot of the entity after the mutation (or the deleted entity).
    pub payload: Value,
    pub requested_by: String,
    pub correlation_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub project_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub organization_id: Option<Uuid>,
}

impl ProviderCommand {
    /// Build the outbound command for an entity snapshot. Serialization of the
    /// snapshot is the only way this can fail.
    pub fn for_entity<T: Serialize>(
        command: &Command,
        event: ProviderEvent,
        entity: &T,
    ) -> Result<Self, CommandError> {
        let payload = serde_json::to_value(entity).map_err(|e| {
            CommandError::internal(format!("provider payload did not serialize: {e}"))
        })?;
        Ok(Self {
            command_id: command.command_id,
            event,
            payload,
            requested_by: command.requested_by.clone(),
            correlation_id: command.correlation_id,
            project_id: command.project_id,
            organization_id: command.organization_id,
        })
    }
}

/// What a provider hands back from its `handle` call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProviderResponse {
    #[serde(default)]
    pub errors: Vec<CommandError>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub payload: Option<Value>,
}

impl ProviderResponse {
    pub fn success() -> Self {
        Self::default()
    }

    pub fn with_payload(payload: Value) -> Self {
        Self {
            errors: Vec::new(),
            payload: Some(payload),
        }
    }

    pub fn failed(error: CommandError) -> Self {
        Self {
            errors: vec![error],
            payload: None,
        }
    }
}

/// One provider's slot in the dispatch result map. A provider that never
/// responded still gets a slot, with the timeout or registration failure as
/// its error; a slow provider can cost its own slot but never the dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResult {
    pub provider: String,
    #[serde(default)]
    pub errors: Vec<CommandError>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub payload: Option<Value>,
}

impl ProviderResult {
    pub fn from_response(provider: &str, response: ProviderResponse) -> Self {
        Self {
            provider: provider.to_string(),
            errors: response.errors,
            payload: response.payload,
        }
    }

    pub fn timed_out(provider: &str, timeout_ms: u64) -> Self {
        Self {
            provider: provider.to_string(),
            errors: vec![CommandError::provider(format!(
                "provider {provider} did not acknowledge within {timeout_ms}ms"
            ))
            .with_source(provider)],
            payload: None,
        }
    }

    pub fn unregistered(provider: &str) -> Self {
        Self {
            provider: provider.to_string(),
            errors: vec![CommandError::provider(format!(
                "provider {provider} is not registered"
            ))
            .with_source(provider)],
            payload: None,
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

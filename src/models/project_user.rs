//! Project membership entry: a principal granted a role on one project.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{require_name, require_non_empty, DocumentKey, LockableDocument};
use crate::commands::CommandError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectRole {
    Owner,
    Contributor,
    Reader,
}

impl ProjectRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Owner => "owner",
            ProjectRole::Contributor => "contributor",
            ProjectRole::Reader => "reader",
        }
    }

    pub fn can_mutate(&self) -> bool {
        matches!(self, ProjectRole::Owner | ProjectRole::Contributor)
    }
}

impl fmt::Display for ProjectRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectUser {
    /// Nil when the caller wants the engine to assign one.
    #[serde(default)]
    pub id: Uuid,
    pub project_id: Uuid,
    /// Identity-provider principal (object id, UPN, or service principal id).
    pub principal_id: String,
    pub display_name: String,
    pub role: ProjectRole,
}

impl ProjectUser {
    pub fn new(
        project_id: Uuid,
        principal_id: impl Into<String>,
        display_name: impl Into<String>,
        role: ProjectRole,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            principal_id: principal_id.into(),
            display_name: display_name.into(),
            role,
        }
    }

    pub fn validate(&self) -> Result<(), CommandError> {
        require_non_empty("principal id", &self.principal_id)?;
        require_name("display name", &self.display_name)?;
        if self.project_id.is_nil() {
            return Err(CommandError::validation(
                "project user must belong to a project",
            ));
        }
        Ok(())
    }

    pub fn key_for(project_id: Uuid, id: Uuid) -> DocumentKey {
        DocumentKey::new(project_id.to_string(), id.to_string())
    }
}

impl LockableDocument for ProjectUser {
    fn document_key(&self) -> DocumentKey {
        ProjectUser::key_for(self.project_id, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_snake_case() {
        let value = serde_json::to_value(ProjectRole::Contributor).unwrap();
        assert_eq!(value, "contributor");
    }

    #[test]
    fn owner_and_contributor_can_mutate() {
        assert!(ProjectRole::Owner.can_mutate());
        assert!(ProjectRole::Contributor.can_mutate());
        assert!(!ProjectRole::Reader.can_mutate());
    }

    #[test]
    fn missing_principal_fails_validation() {
        let user = ProjectUser::new(Uuid::new_v4(), "", "Alice", ProjectRole::Reader);
        assert!(user.validate().is_err());
    }

    #[test]
    fn document_key_partitions_by_project() {
        let user = ProjectUser::new(Uuid::new_v4(), "aad-1", "Alice", ProjectRole::Owner);
        assert_eq!(user.document_key().partition, user.project_id.to_string());
    }
}

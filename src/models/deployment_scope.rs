//! Deployment scope: a registered deployment target (environment + region)
//! for one project. Scopes are created and deleted, never updated in place.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{require_name, require_non_empty, DocumentKey, LockableDocument};
use crate::commands::CommandError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeEnvironment {
    Development,
    Staging,
    Production,
}

impl ScopeEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeEnvironment::Development => "development",
            ScopeEnvironment::Staging => "staging",
            ScopeEnvironment::Production => "production",
        }
    }
}

impl fmt::Display for ScopeEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentScope {
    /// Nil when the caller wants the engine to assign one.
    #[serde(default)]
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub environment: ScopeEnvironment,
    pub region: String,
}

impl DeploymentScope {
    pub fn new(
        project_id: Uuid,
        name: impl Into<String>,
        environment: ScopeEnvironment,
        region: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            name: name.into(),
            environment,
            region: region.into(),
        }
    }

    pub fn validate(&self) -> Result<(), CommandError> {
        require_name("scope name", &self.name)?;
        require_non_empty("region", &self.region)?;
        if self.project_id.is_nil() {
            return Err(CommandError::validation(
                "deployment scope must belong to a project",
            ));
        }
        Ok(())
    }

    pub fn key_for(project_id: Uuid, id: Uuid) -> DocumentKey {
        DocumentKey::new(project_id.to_string(), id.to_string())
    }
}

impl LockableDocument for DeploymentScope {
    fn document_key(&self) -> DocumentKey {
        DeploymentScope::key_for(self.project_id, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_with_region_validates() {
        let scope = DeploymentScope::new(
            Uuid::new_v4(),
            "prod-west",
            ScopeEnvironment::Production,
            "westus2",
        );
        assert!(scope.validate().is_ok());
    }

    #[test]
    fn empty_region_is_rejected() {
        let scope =
            DeploymentScope::new(Uuid::new_v4(), "prod-west", ScopeEnvironment::Production, "");
        assert!(scope.validate().is_err());
    }

    #[test]
    fn environment_serializes_snake_case() {
        let value = serde_json::to_value(ScopeEnvironment::Staging).unwrap();
        assert_eq!(value, "staging");
    }
}

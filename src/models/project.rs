//! # Project
//!
//! The root entity of the control plane. A project lives inside an
//! organization; its document partition is the organization id, so all projects
//! of one organization share a partition while each project locks
//! independently.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{require_name, DocumentKey, LockableDocument};
use crate::commands::CommandError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Nil when the caller wants the engine to assign one.
    #[serde(default)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    /// Free-form labels. Stored sorted so snapshots serialize identically.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl Project {
    pub fn new(organization_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id,
            name: name.into(),
            description: None,
            tags: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn validate(&self) -> Result<(), CommandError> {
        require_name("project name", &self.name)?;
        if self.organization_id.is_nil() {
            return Err(CommandError::validation(
                "project must belong to an organization",
            ));
        }
        Ok(())
    }

    /// Storage address of the project with the given identity.
    pub fn key_for(organization_id: Uuid, id: Uuid) -> DocumentKey {
        DocumentKey::new(organization_id.to_string(), id.to_string())
    }
}

impl LockableDocument for Project {
    fn document_key(&self) -> DocumentKey {
        Project::key_for(self.organization_id, self.id)
    }
}

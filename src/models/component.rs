//! Component: a deployable unit instantiated from a template inside a project.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{require_name, require_non_empty, DocumentKey, LockableDocument};
use crate::commands::CommandError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Nil when the caller wants the engine to assign one.
    #[serde(default)]
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    /// Reference to the template this component was instantiated from.
    pub template_ref: String,
    /// Template parameter values captured at creation time.
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl Component {
    pub fn new(project_id: Uuid, name: impl Into<String>, template_ref: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            name: name.into(),
            template_ref: template_ref.into(),
            parameters: Map::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    pub fn validate(&self) -> Result<(), CommandError> {
        require_name("component name", &self.name)?;
        require_non_empty("template reference", &self.template_ref)?;
        if self.project_id.is_nil() {
            return Err(CommandError::validation(
                "component must belong to a project",
            ));
        }
        Ok(())
    }

    pub fn key_for(project_id: Uuid, id: Uuid) -> DocumentKey {
        DocumentKey::new(project_id.to_string(), id.to_string())
    }
}

impl LockableDocument for Component {
    fn document_key(&self) -> DocumentKey {
        Component::key_for(self.project_id, self.id)
    }
}

//! # Entity Models
//!
//! The lockable documents the control plane manages: projects, project users,
//! components, and deployment scopes. Every entity knows its own
//! [`DocumentKey`] (partition + id), which is both its storage address and the
//! unit of mutual exclusion for the document lock protocol.

pub mod component;
pub mod deployment_scope;
pub mod project;
pub mod project_user;

pub use component::Component;
pub use deployment_scope::{DeploymentScope, ScopeEnvironment};
pub use project::Project;
pub use project_user::{ProjectRole, ProjectUser};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::commands::CommandError;

/// Maximum length for entity display names.
pub const MAX_NAME_LEN: usize = 63;

/// Partition key + document id pair addressing exactly one document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentKey {
    pub partition: String,
    pub id: String,
}

impl DocumentKey {
    pub fn new(partition: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.partition, self.id)
    }
}

/// A document that participates in the locking protocol.
pub trait LockableDocument {
    /// The storage address of this document; also the lock key.
    fn document_key(&self) -> DocumentKey;
}

pub(crate) fn require_non_empty(field: &str, value: &str) -> Result<(), CommandError> {
    if value.trim().is_empty() {
        return Err(CommandError::validation(format!("{field} must not be empty")));
    }
    Ok(())
}

pub(crate) fn require_name(field: &str, value: &str) -> Result<(), CommandError> {
    require_non_empty(field, value)?;
    if value.len() > MAX_NAME_LEN {
        return Err(CommandError::validation(format!(
            "{field} exceeds {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

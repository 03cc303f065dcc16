//! # Orchestration Registry
//!
//! Maps each command kind to the single workflow that handles it. The engine
//! resolves here once per submission; everything after that is driven by the
//! workflow itself. Registration is expected at startup, but the map is
//! behind a lock so embedders can swap workflows in tests.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use super::workflows;
use crate::commands::CommandKind;
use crate::runtime::OrchestrationFn;

#[derive(Clone, Default)]
pub struct OrchestrationRegistry {
    workflows: Arc<RwLock<HashMap<CommandKind, OrchestrationFn>>>,
}

impl OrchestrationRegistry {
    /// Empty registry; every submission fails until workflows are installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in workflow for every command kind.
    pub async fn with_default_workflows() -> Self {
        let registry = Self::new();
        for kind in CommandKind::all() {
            registry.register(*kind, workflows::workflow_for(*kind)).await;
        }
        info!(
            workflows = CommandKind::all().len(),
            "🔧 ORCHESTRATION_REGISTRY: Installed default workflows"
        );
        registry
    }

    /// Install the workflow for `kind`, replacing any existing one.
    pub async fn register(&self, kind: CommandKind, workflow: OrchestrationFn) {
        let mut workflows = self.workflows.write().await;
        if workflows.insert(kind, workflow).is_some() {
            warn!(command_kind = %kind, "🔁 ORCHESTRATION_REGISTRY: Replaced existing workflow");
        }
    }

    pub async fn resolve(&self, kind: CommandKind) -> Option<OrchestrationFn> {
        self.workflows.read().await.get(&kind).cloned()
    }

    pub async fn registered_kinds(&self) -> Vec<CommandKind> {
        let mut kinds: Vec<CommandKind> = self.workflows.read().await.keys().copied().collect();
        kinds.sort_by_key(|k| k.as_str());
        kinds
    }

    pub async fn len(&self) -> usize {
        self.workflows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.workflows.read().await.is_empty()
    }
}

impl fmt::Debug for OrchestrationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrchestrationRegistry").finish_non_exhaustive()
    }
}

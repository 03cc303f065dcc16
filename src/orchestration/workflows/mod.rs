//! # Command Workflows
//!
//! One hand-written workflow per command kind, all sharing the same shape:
//!
//! 1. validate the payload (no lock, no mutation on bad input)
//! 2. acquire the document lock (creates use the unlocked add instead)
//! 3. mutate through a repository activity; failure here never dispatches
//! 4. fan out to providers and aggregate every slot's errors
//! 5. release the lock on every path and finalize the result exactly once
//!
//! Provider errors mark the command failed even though the mutation already
//! persisted; the stored entity and the acknowledgement are allowed to diverge
//! and follow-up commands reconcile them.

mod component;
mod deployment_scope;
mod project;
mod project_user;

use std::sync::Arc;

use crate::commands::{CommandError, CommandKind, CommandResult};
use crate::runtime::OrchestrationFn;

/// The built-in workflow for `kind`.
pub fn workflow_for(kind: CommandKind) -> OrchestrationFn {
    match kind {
        CommandKind::CreateProject => Arc::new(|ctx, cmd| Box::pin(project::create(ctx, cmd))),
        CommandKind::UpdateProject => Arc::new(|ctx, cmd| Box::pin(project::update(ctx, cmd))),
        CommandKind::DeleteProject => Arc::new(|ctx, cmd| Box::pin(project::delete(ctx, cmd))),
        CommandKind::CreateProjectUser => {
            Arc::new(|ctx, cmd| Box::pin(project_user::create(ctx, cmd)))
        }
        CommandKind::UpdateProjectUser => {
            Arc::new(|ctx, cmd| Box::pin(project_user::update(ctx, cmd)))
        }
        CommandKind::DeleteProjectUser => {
            Arc::new(|ctx, cmd| Box::pin(project_user::delete(ctx, cmd)))
        }
        CommandKind::CreateComponent => Arc::new(|ctx, cmd| Box::pin(component::create(ctx, cmd))),
        CommandKind::UpdateComponent => Arc::new(|ctx, cmd| Box::pin(component::update(ctx, cmd))),
        CommandKind::DeleteComponent => Arc::new(|ctx, cmd| Box::pin(component::delete(ctx, cmd))),
        CommandKind::CreateDeploymentScope => {
            Arc::new(|ctx, cmd| Box::pin(deployment_scope::create(ctx, cmd)))
        }
        CommandKind::DeleteDeploymentScope => {
            Arc::new(|ctx, cmd| Box::pin(deployment_scope::delete(ctx, cmd)))
        }
    }
}

/// Record `error` and finalize. The single exit helper for short-circuit
/// paths; any held lock guard releases on the way out of the caller's scope.
pub(crate) fn fail(mut result: CommandResult, error: CommandError) -> CommandResult {
    result.record_error(error);
    result.finalized()
}

//! # Project Workflows
//!
//! Lifecycle operations for the root entity. Projects partition by
//! organization, so two projects in the same organization lock independently
//! while two commands against one project serialize on its document lock.

use serde::Deserialize;
use uuid::Uuid;

use super::fail;
use crate::commands::{Command, CommandError, CommandResult};
use crate::constants::status;
use crate::models::{LockableDocument, Project};
use crate::orchestration::DocumentLock;
use crate::providers::{ProviderCommand, ProviderDispatcher, ProviderEvent};
use crate::repository::DocumentClient;
use crate::runtime::OrchestrationContext;

/// Create a project. No lock is taken: the document cannot exist yet, and the
/// store's uniqueness check arbitrates racing creates, so a duplicate id
/// surfaces as a recorded conflict with exactly one persisted entity.
pub(super) async fn create(ctx: OrchestrationContext, command: Command) -> CommandResult {
    let mut result = CommandResult::new(command.command_id);
    ctx.set_status(status::PROCESSING);

    let mut project: Project = match command.entity_payload() {
        Ok(project) => project,
        Err(error) => return fail(result, error),
    };
    if project.id.is_nil() {
        project.id = match ctx.new_uuid().await {
            Ok(id) => id,
            Err(error) => return fail(result, error),
        };
    }
    if let Err(error) = project.validate() {
        return fail(result, error);
    }

    ctx.set_status(status::PERSISTING);
    let client = DocumentClient::new(&ctx);
    if let Err(error) = client.add_unlocked(&project).await {
        return fail(result, error);
    }

    ctx.set_status(status::DISPATCHING);
    let outbound =
        match ProviderCommand::for_entity(&command, ProviderEvent::ProjectCreated, &project) {
            Ok(outbound) => outbound,
            Err(error) => return fail(result, error),
        };
    match ProviderDispatcher::broadcast(&ctx, &outbound).await {
        Ok(slots) => result.absorb_provider_results(&slots),
        Err(error) => result.record_error(error),
    }

    ctx.set_status(status::FINALIZING);
    result.set_result(&project);
    result.finalized()
}

/// Update a project from a full snapshot. The lock is held from before the
/// read until after provider dispatch, so a concurrent update sees this one's
/// effect, never an interleaving.
pub(super) async fn update(ctx: OrchestrationContext, command: Command) -> CommandResult {
    let mut result = CommandResult::new(command.command_id);
    ctx.set_status(status::PROCESSING);

    let project: Project = match command.entity_payload() {
        Ok(project) => project,
        Err(error) => return fail(result, error),
    };
    if project.id.is_nil() {
        return fail(
            result,
            CommandError::validation("project id is required for update"),
        );
    }
    if let Err(error) = project.validate() {
        return fail(result, error);
    }

    ctx.set_status(status::ACQUIRING_LOCK);
    let key = project.document_key();
    let guard = match DocumentLock::acquire(&ctx, &key).await {
        Ok(guard) => guard,
        Err(error) => return fail(result, error),
    };

    let client = DocumentClient::new(&ctx);
    match client.get::<Project>(&key).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return fail(
                result,
                CommandError::not_found(format!("project {} does not exist", project.id)),
            )
        }
        Err(error) => return fail(result, error),
    }

    ctx.set_status(status::PERSISTING);
    if let Err(error) = client.set_locked(&guard, &project).await {
        return fail(result, error);
    }

    ctx.set_status(status::DISPATCHING);
    let outbound =
        match ProviderCommand::for_entity(&command, ProviderEvent::ProjectUpdated, &project) {
            Ok(outbound) => outbound,
            Err(error) => return fail(result, error),
        };
    match ProviderDispatcher::broadcast(&ctx, &outbound).await {
        Ok(slots) => result.absorb_provider_results(&slots),
        Err(error) => result.record_error(error),
    }

    drop(guard);
    ctx.set_status(status::FINALIZING);
    result.set_result(&project);
    result.finalized()
}

/// Identity needed to address a project; deletes accept either this slim
/// shape or a full snapshot (extra fields are ignored).
#[derive(Debug, Deserialize)]
struct ProjectRef {
    organization_id: Uuid,
    id: Uuid,
}

/// Delete a project. A missing target is a recorded not-found failure with no
/// provider dispatch; a found one is removed and announced with its final
/// snapshot as the payload.
pub(super) async fn delete(ctx: OrchestrationContext, command: Command) -> CommandResult {
    let mut result = CommandResult::new(command.command_id);
    ctx.set_status(status::PROCESSING);

    let target: ProjectRef = match command.entity_payload() {
        Ok(target) => target,
        Err(error) => return fail(result, error),
    };
    if target.id.is_nil() || target.organization_id.is_nil() {
        return fail(
            result,
            CommandError::validation("project id and organization id are required for delete"),
        );
    }

    ctx.set_status(status::ACQUIRING_LOCK);
    let key = Project::key_for(target.organization_id, target.id);
    let guard = match DocumentLock::acquire(&ctx, &key).await {
        Ok(guard) => guard,
        Err(error) => return fail(result, error),
    };

    let client = DocumentClient::new(&ctx);
    let existing: Project = match client.get(&key).await {
        Ok(Some(existing)) => existing,
        Ok(None) => {
            return fail(
                result,
                CommandError::not_found(format!("project {} does not exist", target.id)),
            )
        }
        Err(error) => return fail(result, error),
    };

    ctx.set_status(status::PERSISTING);
    if let Err(error) = client.remove_locked(&guard, &key).await {
        return fail(result, error);
    }

    ctx.set_status(status::DISPATCHING);
    let outbound =
        match ProviderCommand::for_entity(&command, ProviderEvent::ProjectDeleted, &existing) {
            Ok(outbound) => outbound,
            Err(error) => return fail(result, error),
        };
    match ProviderDispatcher::broadcast(&ctx, &outbound).await {
        Ok(slots) => result.absorb_provider_results(&slots),
        Err(error) => result.record_error(error),
    }

    drop(guard);
    ctx.set_status(status::FINALIZING);
    result.set_result(&existing);
    result.finalized()
}

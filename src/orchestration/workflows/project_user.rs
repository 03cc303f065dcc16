//! Project membership workflows. Partitioned by project id.

use serde::Deserialize;
use uuid::Uuid;

use super::fail;
use crate::commands::{Command, CommandError, CommandResult};
use crate::constants::status;
use crate::models::{LockableDocument, ProjectUser};
use crate::orchestration::DocumentLock;
use crate::providers::{ProviderCommand, ProviderDispatcher, ProviderEvent};
use crate::repository::DocumentClient;
use crate::runtime::OrchestrationContext;

pub(super) async fn create(ctx: OrchestrationContext, command: Command) -> CommandResult {
    let mut result = CommandResult::new(command.command_id);
    ctx.set_status(status::PROCESSING);

    let mut user: ProjectUser = match command.entity_payload() {
        Ok(user) => user,
        Err(error) => return fail(result, error),
    };
    if user.id.is_nil() {
        user.id = match ctx.new_uuid().await {
            Ok(id) => id,
            Err(error) => return fail(result, error),
        };
    }
    if let Err(error) = user.validate() {
        return fail(result, error);
    }

    ctx.set_status(status::PERSISTING);
    let client = DocumentClient::new(&ctx);
    if let Err(error) = client.add_unlocked(&user).await {
        return fail(result, error);
    }

    ctx.set_status(status::DISPATCHING);
    let outbound =
        match ProviderCommand::for_entity(&command, ProviderEvent::ProjectUserCreated, &user) {
            Ok(outbound) => outbound,
            Err(error) => return fail(result, error),
        };
    match ProviderDispatcher::broadcast(&ctx, &outbound).await {
        Ok(slots) => result.absorb_provider_results(&slots),
        Err(error) => result.record_error(error),
    }

    ctx.set_status(status::FINALIZING);
    result.set_result(&user);
    result.finalized()
}

pub(super) async fn update(ctx: OrchestrationContext, command: Command) -> CommandResult {
    let mut result = CommandResult::new(command.command_id);
    ctx.set_status(status::PROCESSING);

    let user: ProjectUser = match command.entity_payload() {
        Ok(user) => user,
        Err(error) => return fail(result, error),
    };
    if user.id.is_nil() {
        return fail(
            result,
            CommandError::validation("project user id is required for update"),
        );
    }
    if let Err(error) = user.validate() {
        return fail(result, error);
    }

    ctx.set_status(status::ACQUIRING_LOCK);
    let key = user.document_key();
    let guard = match DocumentLock::acquire(&ctx, &key).await {
        Ok(guard) => guard,
        Err(error) => return fail(result, error),
    };

    let client = DocumentClient::new(&ctx);
    let existing: ProjectUser = match client.get(&key).await {
        Ok(Some(existing)) => existing,
        Ok(None) => {
            return fail(
                result,
                CommandError::not_found(format!("project user {} does not exist", user.id)),
            )
        }
        Err(error) => return fail(result, error),
    };
    // Membership is bound to a principal; rebinding needs a delete + create.
    if existing.principal_id != user.principal_id {
        return fail(
            result,
            CommandError::validation("principal of an existing membership cannot be changed"),
        );
    }

    ctx.set_status(status::PERSISTING);
    if let Err(error) = client.set_locked(&guard, &user).await {
        return fail(result, error);
    }

    ctx.set_status(status::DISPATCHING);
    let outbound =
        match ProviderCommand::for_entity(&command, ProviderEvent::ProjectUserUpdated, &user) {
            Ok(outbound) => outbound,
            Err(error) => return fail(result, error),
        };
    match ProviderDispatcher::broadcast(&ctx, &outbound).await {
        Ok(slots) => result.absorb_provider_results(&slots),
        Err(error) => result.record_error(error),
    }

    drop(guard);
    ctx.set_status(status::FINALIZING);
    result.set_result(&user);
    result.finalized()
}

#[derive(Debug, Deserialize)]
struct ProjectUserRef {
    project_id: Uuid,
    id: Uuid,
}

pub(super) async fn delete(ctx: OrchestrationContext, command: Command) -> CommandResult {
    let mut result = CommandResult::new(command.command_id);
    ctx.set_status(status::PROCESSING);

    let target: ProjectUserRef = match command.entity_payload() {
        Ok(target) => target,
        Err(error) => return fail(result, error),
    };
    if target.id.is_nil() || target.project_id.is_nil() {
        return fail(
            result,
            CommandError::validation("project user id and project id are required for delete"),
        );
    }

    ctx.set_status(status::ACQUIRING_LOCK);
    let key = ProjectUser::key_for(target.project_id, target.id);
    let guard = match DocumentLock::acquire(&ctx, &key).await {
        Ok(guard) => guard,
        Err(error) => return fail(result, error),
    };

    let client = DocumentClient::new(&ctx);
    let existing: ProjectUser = match client.get(&key).await {
        Ok(Some(existing)) => existing,
        Ok(None) => {
            return fail(
                result,
                CommandError::not_found(format!("project user {} does not exist", target.id)),
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
        match ProviderCommand::for_entity(&command, ProviderEvent::ProjectUserDeleted, &existing) {
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

//! Deployment scope workflows. Scopes are immutable once registered, so the
//! lifecycle is create and delete only.

use serde::Deserialize;
use uuid::Uuid;

use super::fail;
use crate::commands::{Command, CommandError, CommandResult};
use crate::constants::status;
use crate::models::DeploymentScope;
use crate::orchestration::DocumentLock;
use crate::providers::{ProviderCommand, ProviderDispatcher, ProviderEvent};
use crate::repository::DocumentClient;
use crate::runtime::OrchestrationContext;

pub(super) async fn create(ctx: OrchestrationContext, command: Command) -> CommandResult {
    let mut result = CommandResult::new(command.command_id);
    ctx.set_status(status::PROCESSING);

    let mut scope: DeploymentScope = match command.entity_payload() {
        Ok(scope) => scope,
        Err(error) => return fail(result, error),
    };
    if scope.id.is_nil() {
        scope.id = match ctx.new_uuid().await {
            Ok(id) => id,
            Err(error) => return fail(result, error),
        };
    }
    if let Err(error) = scope.validate() {
        return fail(result, error);
    }

    ctx.set_status(status::PERSISTING);
    let client = DocumentClient::new(&ctx);
    if let Err(error) = client.add_unlocked(&scope).await {
        return fail(result, error);
    }

    ctx.set_status(status::DISPATCHING);
    let outbound = match ProviderCommand::for_entity(
        &command,
        ProviderEvent::DeploymentScopeCreated,
        &scope,
    ) {
        Ok(outbound) => outbound,
        Err(error) => return fail(result, error),
    };
    match ProviderDispatcher::broadcast(&ctx, &outbound).await {
        Ok(slots) => result.absorb_provider_results(&slots),
        Err(error) => result.record_error(error),
    }

    ctx.set_status(status::FINALIZING);
    result.set_result(&scope);
    result.finalized()
}

#[derive(Debug, Deserialize)]
struct DeploymentScopeRef {
    project_id: Uuid,
    id: Uuid,
}

pub(super) async fn delete(ctx: OrchestrationContext, command: Command) -> CommandResult {
    let mut result = CommandResult::new(command.command_id);
    ctx.set_status(status::PROCESSING);

    let target: DeploymentScopeRef = match command.entity_payload() {
        Ok(target) => target,
        Err(error) => return fail(result, error),
    };
    if target.id.is_nil() || target.project_id.is_nil() {
        return fail(
            result,
            CommandError::validation("deployment scope id and project id are required for delete"),
        );
    }

    ctx.set_status(status::ACQUIRING_LOCK);
    let key = DeploymentScope::key_for(target.project_id, target.id);
    let guard = match DocumentLock::acquire(&ctx, &key).await {
        Ok(guard) => guard,
        Err(error) => return fail(result, error),
    };

    let client = DocumentClient::new(&ctx);
    let existing: DeploymentScope = match client.get(&key).await {
        Ok(Some(existing)) => existing,
        Ok(None) => {
            return fail(
                result,
                CommandError::not_found(format!("deployment scope {} does not exist", target.id)),
            )
        }
        Err(error) => return fail(result, error),
    };

    ctx.set_status(status::PERSISTING);
    if let Err(error) = client.remove_locked(&guard, &key).await {
        return fail(result, error);
    }

    ctx.set_status(status::DISPATCHING);
    let outbound = match ProviderCommand::for_entity(
        &command,
        ProviderEvent::DeploymentScopeDeleted,
        &existing,
    ) {
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

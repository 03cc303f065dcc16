//! Component workflows. Partitioned by project id; the template reference is
//! fixed at creation.

use serde::Deserialize;
use uuid::Uuid;

use super::fail;
use crate::commands::{Command, CommandError, CommandResult};
use crate::constants::status;
use crate::models::{Component, LockableDocument};
use crate::orchestration::DocumentLock;
use crate::providers::{ProviderCommand, ProviderDispatcher, ProviderEvent};
use crate::repository::DocumentClient;
use crate::runtime::OrchestrationContext;

pub(super) async fn create(ctx: OrchestrationContext, command: Command) -> CommandResult {
    let mut result = CommandResult::new(command.command_id);
    ctx.set_status(status::PROCESSING);

    let mut component: Component = match command.entity_payload() {
        Ok(component) => component,
        Err(error) => return fail(result, error),
    };
    if component.id.is_nil() {
        component.id = match ctx.new_uuid().await {
            Ok(id) => id,
            Err(error) => return fail(result, error),
        };
    }
    if let Err(error) = component.validate() {
        return fail(result, error);
    }

    ctx.set_status(status::PERSISTING);
    let client = DocumentClient::new(&ctx);
    if let Err(error) = client.add_unlocked(&component).await {
        return fail(result, error);
    }

    ctx.set_status(status::DISPATCHING);
    let outbound =
        match ProviderCommand::for_entity(&command, ProviderEvent::ComponentCreated, &component) {
            Ok(outbound) => outbound,
            Err(error) => return fail(result, error),
        };
    match ProviderDispatcher::broadcast(&ctx, &outbound).await {
        Ok(slots) => result.absorb_provider_results(&slots),
        Err(error) => result.record_error(error),
    }

    ctx.set_status(status::FINALIZING);
    result.set_result(&component);
    result.finalized()
}

pub(super) async fn update(ctx: OrchestrationContext, command: Command) -> CommandResult {
    let mut result = CommandResult::new(command.command_id);
    ctx.set_status(status::PROCESSING);

    let component: Component = match command.entity_payload() {
        Ok(component) => component,
        Err(error) => return fail(result, error),
    };
    if component.id.is_nil() {
        return fail(
            result,
            CommandError::validation("component id is required for update"),
        );
    }
    if let Err(error) = component.validate() {
        return fail(result, error);
    }

    ctx.set_status(status::ACQUIRING_LOCK);
    let key = component.document_key();
    let guard = match DocumentLock::acquire(&ctx, &key).await {
        Ok(guard) => guard,
        Err(error) => return fail(result, error),
    };

    let client = DocumentClient::new(&ctx);
    let existing: Component = match client.get(&key).await {
        Ok(Some(existing)) => existing,
        Ok(None) => {
            return fail(
                result,
                CommandError::not_found(format!("component {} does not exist", component.id)),
            )
        }
        Err(error) => return fail(result, error),
    };
    if existing.template_ref != component.template_ref {
        return fail(
            result,
            CommandError::validation(
                "template reference of an existing component cannot be changed",
            ),
        );
    }

    ctx.set_status(status::PERSISTING);
    if let Err(error) = client.set_locked(&guard, &component).await {
        return fail(result, error);
    }

    ctx.set_status(status::DISPATCHING);
    let outbound =
        match ProviderCommand::for_entity(&command, ProviderEvent::ComponentUpdated, &component) {
            Ok(outbound) => outbound,
            Err(error) => return fail(result, error),
        };
    match ProviderDispatcher::broadcast(&ctx, &outbound).await {
        Ok(slots) => result.absorb_provider_results(&slots),
        Err(error) => result.record_error(error),
    }

    drop(guard);
    ctx.set_status(status::FINALIZING);
    result.set_result(&component);
    result.finalized()
}

#[derive(Debug, Deserialize)]
struct ComponentRef {
    project_id: Uuid,
    id: Uuid,
}

pub(super) async fn delete(ctx: OrchestrationContext, command: Command) -> CommandResult {
    let mut result = CommandResult::new(command.command_id);
    ctx.set_status(status::PROCESSING);

    let target: ComponentRef = match command.entity_payload() {
        Ok(target) => target,
        Err(error) => return fail(result, error),
    };
    if target.id.is_nil() || target.project_id.is_nil() {
        return fail(
            result,
            CommandError::validation("component id and project id are required for delete"),
        );
    }

    ctx.set_status(status::ACQUIRING_LOCK);
    let key = Component::key_for(target.project_id, target.id);
    let guard = match DocumentLock::acquire(&ctx, &key).await {
        Ok(guard) => guard,
        Err(error) => return fail(result, error),
    };

    let client = DocumentClient::new(&ctx);
    let existing: Component = match client.get(&key).await {
        Ok(Some(existing)) => existing,
        Ok(None) => {
            return fail(
                result,
                CommandError::not_found(format!("component {} does not exist", target.id)),
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
        match ProviderCommand::for_entity(&command, ProviderEvent::ComponentDeleted, &existing) {
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

//! # Provider Dispatcher
//!
//! Fans one command out to every subscribed provider and aggregates their
//! answers into per-provider slots. The subscriber set is resolved through a
//! recorded activity, so the providers a command saw are pinned in history and
//! replay never consults the live registry. Dispatch order is the sorted
//! provider name order; duplicates collapse to one send.

use std::collections::BTreeMap;

use futures::future::join_all;

use super::messages::{ProviderCommand, ProviderResult};
use crate::commands::CommandError;
use crate::constants::activities as activity_names;
use crate::orchestration::RetryInvoker;
use crate::runtime::OrchestrationContext;

pub struct ProviderDispatcher;

impl ProviderDispatcher {
    /// Send `command` to every provider subscribed to its event. An empty
    /// subscriber set is a successful no-op.
    pub async fn broadcast(
        ctx: &OrchestrationContext,
        command: &ProviderCommand,
    ) -> Result<BTreeMap<String, ProviderResult>, CommandError> {
        let targets: Vec<String> = RetryInvoker::none()
            .invoke(ctx, activity_names::RESOLVE_PROVIDER_TARGETS, &command.event)
            .await?;
        Self::dispatch(ctx, command, &targets).await
    }

    /// Send `command` to an explicit target list. Each target gets the full
    /// acknowledgement window concurrently; a slot that times out carries a
    /// provider error, it never sinks the other slots.
    pub async fn dispatch(
        ctx: &OrchestrationContext,
        command: &ProviderCommand,
        targets: &[String],
    ) -> Result<BTreeMap<String, ProviderResult>, CommandError> {
        let mut providers: Vec<&String> = targets.iter().collect();
        providers.sort();
        providers.dedup();
        if providers.is_empty() {
            return Ok(BTreeMap::new());
        }

        // Constructing the futures in sorted order fixes their sequence ids.
        let sends: Vec<_> = providers
            .iter()
            .map(|provider| ctx.send_provider_command(provider, command.clone()))
            .collect();
        let outcomes = join_all(sends).await;

        let mut slots = BTreeMap::new();
        for (provider, outcome) in providers.into_iter().zip(outcomes) {
            slots.insert(provider.clone(), outcome?);
        }
        Ok(slots)
    }
}

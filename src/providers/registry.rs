//! # Provider Registry
//!
//! Thread-safe registration and lookup of providers. Target resolution for a
//! lifecycle event returns a sorted name list so fan-out order (and with it the
//! orchestration's recorded schedule) is identical on every replay.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use stratus_core::providers::{
//!     CommandProvider, ProviderCommand, ProviderEvent, ProviderRegistry, ProviderResponse,
//! };
//!
//! struct RepositoryProvider;
//!
//! #[async_trait]
//! impl CommandProvider for RepositoryProvider {
//!     fn name(&self) -> &str {
//!         "source-control"
//!     }
//!
//!     fn subscriptions(&self) -> Vec<ProviderEvent> {
//!         vec![ProviderEvent::ProjectCreated, ProviderEvent::ProjectDeleted]
//!     }
//!
//!     async fn handle(&self, _command: ProviderCommand) -> ProviderResponse {
//!         ProviderResponse::success()
//!     }
//! }
//!
//! let registry = ProviderRegistry::new();
//! tokio_test::block_on(async {
//!     registry.register(Arc::new(RepositoryProvider)).await.unwrap();
//!     let targets = registry.targets_for(ProviderEvent::ProjectCreated).await;
//!     assert_eq!(targets, vec!["source-control".to_string()]);
//! });
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::messages::{ProviderCommand, ProviderEvent, ProviderResponse};

/// A downstream collaborator that reacts to entity lifecycle events.
///
/// Implementations are expected to be self-contained: `handle` receives the
/// full outbound command and returns a response reporting any errors. The
/// dispatcher enforces the acknowledgement deadline, not the provider.
#[async_trait]
pub trait CommandProvider: Send + Sync {
    /// Stable provider identity used as the aggregation key.
    fn name(&self) -> &str;

    /// Events this provider wants to be told about.
    fn subscriptions(&self) -> Vec<ProviderEvent>;

    async fn handle(&self, command: ProviderCommand) -> ProviderResponse;
}

#[derive(Debug, Error)]
pub enum ProviderRegistryError {
    #[error("Provider already registered: {name}")]
    Duplicate { name: String },
}

/// Registry of providers keyed by name.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Arc<RwLock<HashMap<String, Arc<dyn CommandProvider>>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider. Duplicate names are rejected rather than silently
    /// replaced; a name collision is a wiring bug.
    pub async fn register(
        &self,
        provider: Arc<dyn CommandProvider>,
    ) -> Result<(), ProviderRegistryError> {
        let name = provider.name().to_string();
        let mut providers = self.providers.write().await;
        if providers.contains_key(&name) {
            return Err(ProviderRegistryError::Duplicate { name });
        }
        info!(
            provider = %name,
            subscriptions = provider.subscriptions().len(),
            "🔌 PROVIDER_REGISTRY: Registered provider"
        );
        providers.insert(name, provider);
        Ok(())
    }

    pub async fn resolve(&self, name: &str) -> Option<Arc<dyn CommandProvider>> {
        self.providers.read().await.get(name).cloned()
    }

    /// Names of every provider subscribed to `event`, sorted for deterministic
    /// fan-out order.
    pub async fn targets_for(&self, event: ProviderEvent) -> Vec<String> {
        let providers = self.providers.read().await;
        let mut targets: Vec<String> = providers
            .values()
            .filter(|p| p.subscriptions().contains(&event))
            .map(|p| p.name().to_string())
            .collect();
        targets.sort();
        debug!(
            event = %event,
            targets = ?targets,
            "🔌 PROVIDER_REGISTRY: Resolved dispatch targets"
        );
        targets
    }

    pub async fn len(&self) -> usize {
        self.providers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.providers.read().await.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry").finish_non_exhaustive()
    }
}

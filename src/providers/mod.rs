//! # Providers
//!
//! External systems that mirror entity changes. Each provider implements
//! [`CommandProvider`], declares the lifecycle events it cares about, and
//! receives one [`ProviderCommand`] per applicable command. The dispatcher
//! fans a command out to every subscriber and aggregates per-provider slots;
//! provider failures degrade the command result, never the engine.

pub mod dispatcher;
pub mod messages;
pub mod registry;

pub use dispatcher::ProviderDispatcher;
pub use messages::{ProviderCommand, ProviderEvent, ProviderResponse, ProviderResult};
pub use registry::{CommandProvider, ProviderRegistry, ProviderRegistryError};

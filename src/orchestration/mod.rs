//! # Orchestration
//!
//! The command side of the crate: the engine that drives replayed workflow
//! turns, the registry mapping command kinds to workflow functions, the typed
//! workflows themselves, and the document lock guard they use for exclusive
//! access.
//!
//! ## Core Components
//!
//! - **CommandEngine**: Owns the registries, lock manager, history store, and
//!   event publisher; runs one replay loop per command
//! - **OrchestrationRegistry**: Command kind → workflow function lookup
//! - **DocumentLock**: RAII guard for per-document exclusive access
//! - **RetryInvoker**: Typed activity invocation with a chosen retry policy
//! - **workflows**: The built-in create/update/delete workflow per entity

pub mod document_lock;
pub mod engine;
pub mod registry;
pub mod retry;
pub mod workflows;

pub use document_lock::{DocumentLock, DocumentLockGuard};
pub use engine::{CommandEngine, CommandEngineBuilder, EngineError};
pub use registry::OrchestrationRegistry;
pub use retry::RetryInvoker;

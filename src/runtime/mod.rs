//! # Deterministic Replay Runtime
//!
//! Execution substrate for command workflows. A workflow never runs "once":
//! it is re-executed from the top each time new completions arrive, against
//! the history recorded so far, and only the tail it has not seen before
//! produces new side effects.
//!
//! ## Pieces
//!
//! - `history`: the append-only event vocabulary per command instance
//! - `store`: durable history storage behind the `HistoryStore` trait
//! - `context`: the capability object workflows call, plus the replay core
//!   that matches calls against recorded events
//! - `executor`: runs a single turn (fresh future, one poll, noop waker)
//! - `locks`: FIFO per-document lock table with waiter timeouts
//! - `activities`: registered host functions, their error taxonomy, and the
//!   bounded retry loop that wraps every invocation
//!
//! ## Guarantees
//!
//! - At-most-once: a schedule id already present in history is never
//!   dispatched again, so a crash between commit and dispatch re-dispatches,
//!   while a crash after completion replays the recorded result.
//! - Call-order determinism: sequence ids depend only on the workflow's own
//!   call order, so the same command and history always reproduce the same
//!   ids. Divergence is detected and fails the command rather than silently
//!   corrupting it.

pub mod activities;
pub(crate) mod context;
pub(crate) mod executor;
pub mod history;
pub(crate) mod locks;
pub mod store;

pub use activities::{
    run_with_retry, ActivityError, ActivityHandler, ActivityRegistry, ActivityResult,
    ErrorCategory, RetryPolicy,
};
pub use context::{ActivityFuture, OrchestrationContext, RuntimeDefaults};
pub use executor::OrchestrationFn;
pub use history::{EventId, HistoryEvent};
pub use store::{HistoryStore, InMemoryHistoryStore, InstanceId, StoreError};

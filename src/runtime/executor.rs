//! # Turn Executor
//!
//! Runs one replay turn: build a fresh workflow future over the committed
//! history, poll it exactly once with a noop waker, and hand back whatever the
//! turn produced. Leaf futures never register wakers; they either resolve
//! synchronously from history or stay pending, so a single poll always drives
//! the workflow as far as the recorded completions allow.

use futures::future::BoxFuture;
use futures::task::noop_waker_ref;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;

use super::context::{CoreHandle, HostAction, OrchestrationContext, ReplayCore, RuntimeDefaults};
use super::history::HistoryEvent;
use super::store::InstanceId;
use crate::commands::{Command, CommandResult};

/// A registered workflow body. Must be deterministic: same command plus same
/// history always yields the same sequence of context calls.
pub type OrchestrationFn =
    Arc<dyn Fn(OrchestrationContext, Command) -> BoxFuture<'static, CommandResult> + Send + Sync>;

/// Why a turn could not produce a trustworthy outcome.
#[derive(Debug, Clone)]
pub(crate) enum TurnFault {
    /// The workflow's calls diverged from recorded history.
    Nondeterministic(String),
    /// The workflow body panicked mid-poll.
    Panicked(String),
}

impl TurnFault {
    pub(crate) fn reason(&self) -> &str {
        match self {
            TurnFault::Nondeterministic(reason) => reason,
            TurnFault::Panicked(reason) => reason,
        }
    }
}

#[derive(Debug)]
pub(crate) struct TurnOutcome {
    pub(crate) delta: Vec<HistoryEvent>,
    pub(crate) actions: Vec<HostAction>,
    pub(crate) result: Option<CommandResult>,
    pub(crate) fault: Option<TurnFault>,
}

/// Execute one turn of `workflow` against `committed` history.
///
/// On `Poll::Ready` the finished future has already dropped its locals, so
/// any still-held lock guards have recorded their releases into the delta.
/// On `Poll::Pending` the core is flipped into teardown mode before the
/// suspended future is dropped, so those same guard drops record nothing.
pub(crate) fn execute_turn(
    workflow: &OrchestrationFn,
    command: &Command,
    committed: &[HistoryEvent],
    instance: InstanceId,
    defaults: &RuntimeDefaults,
) -> TurnOutcome {
    let core: CoreHandle = Arc::new(Mutex::new(ReplayCore::new(committed)));
    let ctx = OrchestrationContext::new(Arc::clone(&core), instance, defaults.clone());

    let mut future = workflow(ctx, command.clone());
    let waker = noop_waker_ref();
    let mut cx = Context::from_waker(waker);

    let poll = panic::catch_unwind(AssertUnwindSafe(|| future.as_mut().poll(&mut cx)));

    let (result, panicked) = match poll {
        Ok(Poll::Ready(result)) => {
            drop(future);
            (Some(result), None)
        }
        Ok(Poll::Pending) => {
            // Abandoning this turn: silence guard drops before the future goes.
            core.lock().begin_teardown();
            drop(future);
            (None, None)
        }
        Err(payload) => {
            // The unwind already dropped the workflow's locals in live mode,
            // so guard releases from the panicking turn are in the delta.
            drop(future);
            (None, Some(panic_message(payload)))
        }
    };

    let mut core = core.lock();
    let fault = match (core.nondeterminism(), panicked) {
        (Some(reason), _) => Some(TurnFault::Nondeterministic(reason)),
        (None, Some(reason)) => Some(TurnFault::Panicked(reason)),
        (None, None) => None,
    };
    TurnOutcome {
        delta: core.take_delta(),
        actions: core.take_actions(),
        result,
        fault,
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("workflow panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("workflow panicked: {message}")
    } else {
        "workflow panicked".to_string()
    }
}

//! # Orchestration History
//!
//! The append-only event log that makes workflow execution durable. Every
//! suspension point — activity invocation, lock acquisition, provider send —
//! records a schedule event with a monotone sequence id assigned in the
//! workflow's own call order, and later exactly one completion event carrying
//! the same id. Replay matches completions by id, never by arrival position,
//! so out-of-order provider responses replay identically.
//!
//! Schedule events carry enough payload (activity input, retry policy, lock
//! key, outbound provider command) that a resumed host can re-issue any action
//! whose completion was never recorded, without a side channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::activities::RetryPolicy;
use crate::commands::{Command, CommandError, CommandResult};
use crate::providers::{ProviderCommand, ProviderResult};

/// Per-instance monotone sequence id correlating schedules with completions.
pub type EventId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HistoryEvent {
    /// First event of every instance; carries the full command so a stored
    /// history is sufficient to resume.
    OrchestrationStarted {
        command: Command,
        started_at: DateTime<Utc>,
    },
    ActivityScheduled {
        id: EventId,
        activity: String,
        input: Value,
        retry: RetryPolicy,
    },
    ActivityCompleted {
        id: EventId,
        result: Value,
    },
    ActivityFailed {
        id: EventId,
        error: CommandError,
    },
    LockRequested {
        id: EventId,
        partition: String,
        document_id: String,
        timeout_ms: Option<u64>,
    },
    LockAcquired {
        id: EventId,
    },
    LockTimedOut {
        id: EventId,
        waited_ms: u64,
    },
    /// Recorded when a lock guard leaves scope. Applied by the host as the
    /// release side effect when the event is first committed.
    LockReleased {
        id: EventId,
        acquisition_id: EventId,
        partition: String,
        document_id: String,
    },
    ProviderCommandSent {
        id: EventId,
        provider: String,
        command: ProviderCommand,
        timeout_ms: u64,
    },
    ProviderResultReceived {
        id: EventId,
        result: ProviderResult,
    },
    ProviderTimedOut {
        id: EventId,
        timeout_ms: u64,
    },
    StatusSet {
        status: String,
    },
    OrchestrationCompleted {
        result: CommandResult,
        completed_at: DateTime<Utc>,
    },
}

impl HistoryEvent {
    /// Sequence id of a schedule event (an await point being opened).
    pub fn schedule_id(&self) -> Option<EventId> {
        match self {
            HistoryEvent::ActivityScheduled { id, .. }
            | HistoryEvent::LockRequested { id, .. }
            | HistoryEvent::ProviderCommandSent { id, .. } => Some(*id),
            _ => None,
        }
    }

    /// Sequence id of a completion event (an await point being resolved).
    pub fn completion_id(&self) -> Option<EventId> {
        match self {
            HistoryEvent::ActivityCompleted { id, .. }
            | HistoryEvent::ActivityFailed { id, .. }
            | HistoryEvent::LockAcquired { id }
            | HistoryEvent::LockTimedOut { id, .. }
            | HistoryEvent::ProviderResultReceived { id, .. }
            | HistoryEvent::ProviderTimedOut { id, .. } => Some(*id),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, HistoryEvent::OrchestrationCompleted { .. })
    }

    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            HistoryEvent::OrchestrationStarted { .. } => "orchestration_started",
            HistoryEvent::ActivityScheduled { .. } => "activity_scheduled",
            HistoryEvent::ActivityCompleted { .. } => "activity_completed",
            HistoryEvent::ActivityFailed { .. } => "activity_failed",
            HistoryEvent::LockRequested { .. } => "lock_requested",
            HistoryEvent::LockAcquired { .. } => "lock_acquired",
            HistoryEvent::LockTimedOut { .. } => "lock_timed_out",
            HistoryEvent::LockReleased { .. } => "lock_released",
            HistoryEvent::ProviderCommandSent { .. } => "provider_command_sent",
            HistoryEvent::ProviderResultReceived { .. } => "provider_result_received",
            HistoryEvent::ProviderTimedOut { .. } => "provider_timed_out",
            HistoryEvent::StatusSet { .. } => "status_set",
            HistoryEvent::OrchestrationCompleted { .. } => "orchestration_completed",
        }
    }
}

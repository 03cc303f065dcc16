//! # Activities
//!
//! Activities are the only place side effects happen: repository calls, clock
//! reads, uuid generation, provider target resolution. The orchestration side
//! schedules them by name; the host side looks the handler up here, applies
//! the bounded retry policy, and records exactly one completion event.
//!
//! ## Error classification
//!
//! Handlers fail with an [`ActivityError`] carrying an [`ErrorCategory`]. Only
//! transient and timeout categories are retried; conflicts and permanent
//! failures surface immediately. Whatever survives the retry budget is
//! converted to a serializable `CommandError` so the workflow sees the
//! original kind and message after replay.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::warn;

use crate::commands::{CommandError, CommandErrorKind};
use crate::repository::RepositoryError;

/// Failure classification driving the retry decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Infrastructure hiccup; retrying with backoff is worthwhile.
    Transient,
    /// The operation ran out of time; retrying is worthwhile.
    Timeout,
    /// The store rejected the write as a duplicate; retrying cannot help.
    Conflict,
    /// A bug or bad input; retrying cannot help.
    Permanent,
}

impl ErrorCategory {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCategory::Transient | ErrorCategory::Timeout)
    }
}

/// Error returned by an activity handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{category:?} activity failure: {message}")]
pub struct ActivityError {
    pub category: ErrorCategory,
    /// The command error kind this failure maps to once retries are exhausted.
    pub kind: CommandErrorKind,
    pub message: String,
}

impl ActivityError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            category: ErrorCategory::Transient,
            kind: CommandErrorKind::Mutation,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            category: ErrorCategory::Timeout,
            kind: CommandErrorKind::Mutation,
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            category: ErrorCategory::Conflict,
            kind: CommandErrorKind::Conflict,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            category: ErrorCategory::Permanent,
            kind: CommandErrorKind::Internal,
            message: message.into(),
        }
    }

    pub fn with_kind(mut self, kind: CommandErrorKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }

    /// The error the workflow receives once the retry budget is spent.
    pub fn into_command_error(self, activity: &str) -> CommandError {
        CommandError::new(self.kind, self.message).with_source(activity)
    }
}

impl From<RepositoryError> for ActivityError {
    fn from(error: RepositoryError) -> Self {
        match &error {
            RepositoryError::Conflict { .. } => ActivityError::conflict(error.to_string()),
            RepositoryError::Unavailable { .. } => ActivityError::transient(error.to_string()),
            RepositoryError::Serialization { .. } => {
                ActivityError::permanent(error.to_string()).with_kind(CommandErrorKind::Mutation)
            }
        }
    }
}

impl From<serde_json::Error> for ActivityError {
    fn from(error: serde_json::Error) -> Self {
        ActivityError::permanent(format!("activity payload did not (de)serialize: {error}"))
    }
}

/// Bounded retry policy applied by the host-side activity worker.
///
/// The policy travels inside the `ActivityScheduled` history event, so a
/// resumed instance retries with the policy chosen when the activity was first
/// scheduled, independent of current configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
            max_delay_ms: 0,
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }

    /// Delay before the next attempt, given how many attempts have failed.
    /// Exponential in the failure count, capped, with optional jitter in the
    /// upper half of the window.
    pub fn delay_for_attempt(&self, failed_attempts: u32) -> Duration {
        if failed_attempts == 0 {
            return Duration::ZERO;
        }
        let exponent = failed_attempts.saturating_sub(1).min(63);
        let raw = self.base_delay_ms as f64 * self.backoff_multiplier.powi(exponent as i32);
        let capped = raw.min(self.max_delay_ms as f64);
        let with_jitter = if self.jitter {
            capped * (0.5 + fastrand::f64() * 0.5)
        } else {
            capped
        };
        Duration::from_millis(with_jitter as u64)
    }
}

pub type ActivityResult = std::result::Result<Value, ActivityError>;

/// Type-erased activity handler: JSON in, JSON out.
pub type ActivityHandler = Arc<dyn Fn(Value) -> BoxFuture<'static, ActivityResult> + Send + Sync>;

/// Name → handler registry. Registration happens at engine construction (and
/// from tests installing probes); lookups happen on every dispatch.
#[derive(Clone, Default)]
pub struct ActivityRegistry {
    handlers: Arc<RwLock<HashMap<String, ActivityHandler>>>,
}

impl ActivityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any existing one with the same name.
    /// Replacement is deliberate: tests override built-ins with probes.
    pub async fn register<F, Fut>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ActivityResult> + Send + 'static,
    {
        let name = name.into();
        let wrapped: ActivityHandler = Arc::new(move |input| handler(input).boxed());
        let mut handlers = self.handlers.write().await;
        if handlers.insert(name.clone(), wrapped).is_some() {
            warn!(activity = %name, "🔁 ACTIVITY_REGISTRY: Replaced existing handler");
        }
    }

    pub async fn resolve(&self, name: &str) -> Option<ActivityHandler> {
        self.handlers.read().await.get(name).cloned()
    }

    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for ActivityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityRegistry").finish_non_exhaustive()
    }
}

/// Run one scheduled activity applying its retry policy. Returns the final
/// value or the command error to record as the activity's failure event.
pub async fn run_with_retry(
    handler: ActivityHandler,
    input: Value,
    policy: &RetryPolicy,
    activity: &str,
) -> Result<Value, CommandError> {
    let mut failed_attempts = 0u32;
    loop {
        match handler(input.clone()).await {
            Ok(value) => return Ok(value),
            Err(error) => {
                failed_attempts += 1;
                if error.is_retryable() && failed_attempts < policy.max_attempts {
                    let delay = policy.delay_for_attempt(failed_attempts);
                    warn!(
                        activity = %activity,
                        attempt = failed_attempts,
                        max_attempts = policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "🔁 ACTIVITY: Retrying after failure"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Err(error.into_command_error(activity));
            }
        }
    }
}

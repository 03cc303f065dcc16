//! # Retry Invoker
//!
//! Typed activity invocation with an attached retry policy. The policy is
//! recorded in the schedule event itself, so a resumed instance retries with
//! the policy in force when the work was first scheduled, not whatever the
//! engine is configured with today.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::commands::CommandError;
use crate::runtime::{OrchestrationContext, RetryPolicy};

#[derive(Debug, Clone)]
pub struct RetryInvoker {
    policy: RetryPolicy,
}

impl RetryInvoker {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Invoker carrying the engine's default policy.
    pub fn standard(ctx: &OrchestrationContext) -> Self {
        Self {
            policy: ctx.default_retry(),
        }
    }

    /// Single-attempt invoker for work that must not be retried.
    pub fn none() -> Self {
        Self {
            policy: RetryPolicy::none(),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Invoke `activity` with a serialized `input`, decoding the recorded
    /// result into `O`. Exhausted retries surface as the activity's mapped
    /// command error.
    pub async fn invoke<I, O>(
        &self,
        ctx: &OrchestrationContext,
        activity: &str,
        input: &I,
    ) -> Result<O, CommandError>
    where
        I: Serialize,
        O: DeserializeOwned,
    {
        let input = serde_json::to_value(input)
            .map_err(|e| CommandError::internal(format!("activity input serialization: {e}")))?;
        let value = ctx
            .schedule_activity(activity, input, self.policy.clone())
            .await?;
        serde_json::from_value(value).map_err(|e| {
            CommandError::internal(format!("activity {activity} returned an unexpected shape: {e}"))
        })
    }
}

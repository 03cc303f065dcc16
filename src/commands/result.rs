//! # Command Results
//!
//! One [`CommandResult`] exists per command, created when the orchestration
//! starts and finalized exactly once on every exit path. Errors are append-only:
//! aggregation folds provider failures into the same list the mutation and lock
//! phases write to, so the caller receives the complete failure picture in the
//! order it happened.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::error::CommandError;
use crate::providers::ProviderResult;

/// Lifecycle status of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandStatus {
    InProgress,
    Succeeded,
    Failed,
}

impl CommandStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CommandStatus::Succeeded | CommandStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandStatus::InProgress => "in_progress",
            CommandStatus::Succeeded => "succeeded",
            CommandStatus::Failed => "failed",
        }
    }
}

/// The outcome of one command.
///
/// `result` carries the final payload: the mutated entity on success, and also
/// after a successful mutation whose provider dispatch failed (the persisted
/// state is real even when the command as a whole reports `Failed`). It stays
/// `None` when no mutation was applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub command_id: Uuid,
    pub status: CommandStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub errors: Vec<CommandError>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status_message: Option<String>,
}

impl CommandResult {
    /// Create the result shell at orchestration start.
    pub fn new(command_id: Uuid) -> Self {
        Self {
            command_id,
            status: CommandStatus::InProgress,
            result: None,
            errors: Vec::new(),
            status_message: None,
        }
    }

    /// Append an error. Errors are never removed or rewritten.
    pub fn record_error(&mut self, error: CommandError) {
        self.errors.push(error);
    }

    pub fn record_errors(&mut self, errors: impl IntoIterator<Item = CommandError>) {
        self.errors.extend(errors);
    }

    /// Fold every provider's errors into this result, in provider-name order.
    /// Providers that responded cleanly contribute nothing; a provider's own
    /// origin label is preserved when it set one.
    pub fn absorb_provider_results(&mut self, results: &BTreeMap<String, ProviderResult>) {
        for (provider, result) in results {
            for error in &result.errors {
                self.errors.push(error.clone().or_source(provider));
            }
        }
    }

    /// Set the final payload. Serialization failures are recorded as internal
    /// errors rather than propagated, so the result object stays well-formed.
    pub fn set_result<T: Serialize>(&mut self, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => self.result = Some(value),
            Err(e) => self.record_error(CommandError::internal(format!(
                "result payload did not serialize: {e}"
            ))),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, CommandStatus::Succeeded)
    }

    pub fn first_error(&self) -> Option<&CommandError> {
        self.errors.first()
    }

    /// Derive the terminal status and status text from the recorded errors.
    /// Idempotent: finalizing an already-terminal result changes nothing, which
    /// keeps the exactly-once contract even if a caller finalizes defensively.
    #[must_use]
    pub fn finalized(mut self) -> Self {
        if self.status.is_terminal() {
            return self;
        }
        if self.errors.is_empty() {
            self.status = CommandStatus::Succeeded;
            self.status_message = Some("completed successfully".to_string());
        } else {
            self.status = CommandStatus::Failed;
            self.status_message = Some(format!(
                "completed with {} error(s); first: {}",
                self.errors.len(),
                self.errors[0]
            ));
        }
        self
    }
}

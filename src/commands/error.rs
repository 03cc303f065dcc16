//! # Command Error Types
//!
//! Structured errors for command processing. Every error that can surface in a
//! `CommandResult` is a [`CommandError`]: a classified kind plus a human-readable
//! message, fully serializable so it survives the workflow history and replay.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a command processing failure.
///
/// The kind determines how callers interpret the failure: validation and
/// not-found errors are caller-correctable, lock timeouts are contention,
/// mutation errors mean the store rejected or kept failing, provider errors
/// mean a downstream collaborator did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandErrorKind {
    Validation,
    NotFound,
    Conflict,
    LockTimeout,
    Mutation,
    Provider,
    Internal,
}

impl CommandErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandErrorKind::Validation => "validation",
            CommandErrorKind::NotFound => "not_found",
            CommandErrorKind::Conflict => "conflict",
            CommandErrorKind::LockTimeout => "lock_timeout",
            CommandErrorKind::Mutation => "mutation",
            CommandErrorKind::Provider => "provider",
            CommandErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for CommandErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single command processing error.
///
/// Errors are append-only once recorded on a `CommandResult`; they are never
/// collapsed or rewritten, so the caller sees the complete failure picture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandError {
    pub kind: CommandErrorKind,
    pub message: String,
    /// Where the error originated (an activity name, a provider name).
    ///
    /// This is a plain label, not a nested error, so `Display`/`Error` are
    /// implemented by hand: thiserror's derive would treat a field named
    /// `source` as the error's `source()`, which `Option<String>` cannot be.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source: Option<String>,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for CommandError {}

impl CommandError {
    pub fn new(kind: CommandErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(CommandErrorKind::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(CommandErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(CommandErrorKind::Conflict, message)
    }

    pub fn lock_timeout(message: impl Into<String>) -> Self {
        Self::new(CommandErrorKind::LockTimeout, message)
    }

    pub fn mutation(message: impl Into<String>) -> Self {
        Self::new(CommandErrorKind::Mutation, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(CommandErrorKind::Provider, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(CommandErrorKind::Internal, message)
    }

    /// Attach an origin label to this error.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach an origin label only if none is set yet. Used during provider
    /// result aggregation so provider-authored errors keep their own origin.
    pub fn or_source(mut self, source: &str) -> Self {
        if self.source.is_none() {
            self.source = Some(source.to_string());
        }
        self
    }

    pub fn is_validation(&self) -> bool {
        matches!(self.kind, CommandErrorKind::Validation)
    }

    pub fn is_provider(&self) -> bool {
        matches!(self.kind, CommandErrorKind::Provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let error = CommandError::not_found("project 42 does not exist");
        assert_eq!(error.to_string(), "not_found: project 42 does not exist");
    }

    #[test]
    fn serializes_with_snake_case_kind() {
        let error = CommandError::lock_timeout("waited 5000ms");
        let value = serde_json::to_value(&error).unwrap();
        assert_eq!(value["kind"], "lock_timeout");
        assert_eq!(value["message"], "waited 5000ms");
        assert!(value.get("source").is_none());
    }

    #[test]
    fn round_trips_through_json() {
        let error = CommandError::provider("provision failed").with_source("github");
        let json = serde_json::to_string(&error).unwrap();
        let back: CommandError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, error);
    }

    #[test]
    fn or_source_preserves_existing_origin() {
        let tagged = CommandError::provider("boom").with_source("origin-a");
        assert_eq!(
            tagged.or_source("origin-b").source.as_deref(),
            Some("origin-a")
        );

        let untagged = CommandError::provider("boom");
        assert_eq!(
            untagged.or_source("origin-b").source.as_deref(),
            Some("origin-b")
        );
    }
}

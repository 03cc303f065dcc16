//! # Command Data Model
//!
//! Immutable command envelopes, their structured errors, and the per-command
//! result that carries the outcome back across the submission boundary.

pub mod command;
pub mod error;
pub mod result;

pub use command::{Command, CommandKind};
pub use error::{CommandError, CommandErrorKind};
pub use result::{CommandResult, CommandStatus};

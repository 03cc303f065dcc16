//! # System Constants
//!
//! Names that cross the engine's seams: published event names, activity
//! identifiers recorded in history, and the status phase labels workflows
//! report. They are constants rather than string literals because history is
//! durable; renaming one is a compatibility break for every stored instance.

/// Engine lifecycle events published to subscribers.
pub mod events {
    pub const COMMAND_RECEIVED: &str = "command.received";
    pub const COMMAND_STATUS_CHANGED: &str = "command.status_changed";
    pub const COMMAND_COMPLETED: &str = "command.completed";
    pub const COMMAND_FAILED: &str = "command.failed";
    pub const COMMAND_RESUMED: &str = "command.resumed";
}

/// Activity identifiers recorded in instance history.
pub mod activities {
    pub const REPOSITORY_GET: &str = "repository.get";
    pub const REPOSITORY_ADD: &str = "repository.add";
    pub const REPOSITORY_SET: &str = "repository.set";
    pub const REPOSITORY_REMOVE: &str = "repository.remove";
    pub const UTC_NOW: &str = "system.utc_now";
    pub const NEW_UUID: &str = "system.new_uuid";
    pub const RESOLVE_PROVIDER_TARGETS: &str = "providers.resolve_targets";
}

/// Phase labels workflows report through custom status.
pub mod status {
    pub const PROCESSING: &str = "processing";
    pub const ACQUIRING_LOCK: &str = "acquiring_lock";
    pub const PERSISTING: &str = "persisting";
    pub const DISPATCHING: &str = "dispatching";
    pub const FINALIZING: &str = "finalizing";
}

/// System-wide constants.
pub mod system {
    /// Attributed requester when a command does not carry one.
    pub const DEFAULT_REQUESTED_BY: &str = "system";

    /// Version compatibility marker.
    pub const STRATUS_CORE_VERSION: &str = "0.1.0";
}

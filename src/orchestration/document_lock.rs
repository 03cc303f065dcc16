//! # Document Lock
//!
//! Scoped exclusive access to one document, RAII style. Acquisition is a
//! recorded point in history; release rides the guard's `Drop`, so every exit
//! path out of a workflow scope, early return and error alike, gives the lock
//! back. A guard dropped because the executor is abandoning a suspended turn
//! records nothing and is replayed back into existence on the next turn.

use std::time::Duration;

use crate::commands::CommandError;
use crate::models::DocumentKey;
use crate::runtime::context::CoreHandle;
use crate::runtime::{EventId, OrchestrationContext};

/// Entry point for exclusive document access.
pub struct DocumentLock;

impl DocumentLock {
    /// Acquire the lock for `key`, waiting up to the engine's configured
    /// bound. Waiters are served in arrival order.
    pub async fn acquire(
        ctx: &OrchestrationContext,
        key: &DocumentKey,
    ) -> Result<DocumentLockGuard, CommandError> {
        Self::acquire_with_timeout(ctx, key, ctx.default_lock_timeout()).await
    }

    /// Acquire with an explicit wait bound; `None` waits indefinitely.
    /// An expired wait fails with [`crate::commands::CommandErrorKind::LockTimeout`].
    pub async fn acquire_with_timeout(
        ctx: &OrchestrationContext,
        key: &DocumentKey,
        timeout: Option<Duration>,
    ) -> Result<DocumentLockGuard, CommandError> {
        let acquisition_id = ctx.request_lock(key, timeout).await?;
        Ok(DocumentLockGuard {
            core: ctx.core_handle(),
            acquisition_id,
            key: key.clone(),
        })
    }
}

/// Held lock on one document. Write helpers demand it as proof of exclusion.
#[derive(Debug)]
pub struct DocumentLockGuard {
    core: CoreHandle,
    acquisition_id: EventId,
    key: DocumentKey,
}

impl DocumentLockGuard {
    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    /// Whether this guard protects `key`.
    pub fn covers(&self, key: &DocumentKey) -> bool {
        self.key == *key
    }
}

impl Drop for DocumentLockGuard {
    fn drop(&mut self) {
        self.core
            .lock()
            .record_release(self.acquisition_id, &self.key);
    }
}

//! # Lock Manager
//!
//! Host-side exclusive locks keyed by document (partition + id). Waiters are
//! granted in FIFO order; a request from the instance that already holds the
//! key is re-granted immediately, which is what keeps crash-replay from
//! deadlocking on its own lock. Every acquire request produces exactly one
//! completion event: `LockAcquired` or `LockTimedOut`, never both.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::history::{EventId, HistoryEvent};
use super::store::InstanceId;
use crate::models::DocumentKey;

#[derive(Debug)]
struct Waiter {
    instance: InstanceId,
    request_id: EventId,
    reply: mpsc::UnboundedSender<HistoryEvent>,
    enqueued_at: Instant,
}

#[derive(Debug, Default)]
struct LockEntry {
    holder: Option<InstanceId>,
    waiters: VecDeque<Waiter>,
}

#[derive(Debug, Clone, Default)]
pub struct LockManager {
    tables: Arc<Mutex<HashMap<DocumentKey, LockEntry>>>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the lock for `instance`. The grant or timeout is delivered as a
    /// history event on `reply`. `timeout: None` waits indefinitely.
    pub fn acquire(
        &self,
        instance: InstanceId,
        key: DocumentKey,
        request_id: EventId,
        reply: mpsc::UnboundedSender<HistoryEvent>,
        timeout: Option<Duration>,
    ) {
        let mut tables = self.tables.lock();
        let entry = tables.entry(key.clone()).or_default();

        match entry.holder {
            None => {
                entry.holder = Some(instance);
                debug!(key = %key, instance = %instance, "🔒 LOCK: Granted (free)");
                let _ = reply.send(HistoryEvent::LockAcquired { id: request_id });
            }
            Some(holder) if holder == instance => {
                // Idempotent re-grant for the same instance (replay, resume).
                debug!(key = %key, instance = %instance, "🔒 LOCK: Re-granted to holder");
                let _ = reply.send(HistoryEvent::LockAcquired { id: request_id });
            }
            Some(_) => {
                entry.waiters.push_back(Waiter {
                    instance,
                    request_id,
                    reply,
                    enqueued_at: Instant::now(),
                });
                debug!(
                    key = %key,
                    instance = %instance,
                    queue_depth = entry.waiters.len(),
                    "🔒 LOCK: Queued waiter"
                );
                if let Some(timeout) = timeout {
                    let manager = self.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(timeout).await;
                        manager.expire_waiter(&key, instance, request_id);
                    });
                }
            }
        }
    }

    /// Release the lock held by `instance`. Hands the lock to the next live
    /// waiter. Releasing a lock the instance does not hold is a no-op, so a
    /// replayed release cannot corrupt the table.
    pub fn release(&self, instance: InstanceId, key: &DocumentKey) -> bool {
        let mut tables = self.tables.lock();
        let Some(entry) = tables.get_mut(key) else {
            return false;
        };
        if entry.holder != Some(instance) {
            warn!(key = %key, instance = %instance, "🔓 LOCK: Ignored release from non-holder");
            return false;
        }
        Self::grant_next(entry);
        debug!(key = %key, instance = %instance, "🔓 LOCK: Released");
        if entry.holder.is_none() && entry.waiters.is_empty() {
            tables.remove(key);
        }
        true
    }

    /// Terminal safety net: release every lock `instance` holds and drop its
    /// queued waiters.
    pub fn release_all(&self, instance: InstanceId) {
        let mut tables = self.tables.lock();
        let keys: Vec<DocumentKey> = tables.keys().cloned().collect();
        for key in keys {
            if let Some(entry) = tables.get_mut(&key) {
                entry.waiters.retain(|w| w.instance != instance);
                if entry.holder == Some(instance) {
                    Self::grant_next(entry);
                }
                if entry.holder.is_none() && entry.waiters.is_empty() {
                    tables.remove(&key);
                }
            }
        }
    }

    /// Rebuild holdership from a stored history during resume. Only applies
    /// when the key is free or already held by the same instance.
    pub fn restore_holder(&self, instance: InstanceId, key: DocumentKey) {
        let mut tables = self.tables.lock();
        let entry = tables.entry(key.clone()).or_default();
        match entry.holder {
            None => {
                entry.holder = Some(instance);
                debug!(key = %key, instance = %instance, "🔒 LOCK: Restored holder");
            }
            Some(holder) if holder == instance => {}
            Some(holder) => {
                warn!(
                    key = %key,
                    instance = %instance,
                    holder = %holder,
                    "🔒 LOCK: Cannot restore holder, key is held elsewhere"
                );
            }
        }
    }

    pub fn holder_of(&self, key: &DocumentKey) -> Option<InstanceId> {
        self.tables.lock().get(key).and_then(|entry| entry.holder)
    }

    fn expire_waiter(&self, key: &DocumentKey, instance: InstanceId, request_id: EventId) {
        let mut tables = self.tables.lock();
        let Some(entry) = tables.get_mut(key) else {
            return;
        };
        let Some(position) = entry
            .waiters
            .iter()
            .position(|w| w.instance == instance && w.request_id == request_id)
        else {
            // Already granted or cancelled; the timer loses the race cleanly.
            return;
        };
        if let Some(waiter) = entry.waiters.remove(position) {
            let waited_ms = waiter.enqueued_at.elapsed().as_millis() as u64;
            warn!(
                key = %key,
                instance = %instance,
                waited_ms,
                "⏱️ LOCK: Acquire timed out"
            );
            let _ = waiter.reply.send(HistoryEvent::LockTimedOut {
                id: request_id,
                waited_ms,
            });
        }
        if entry.holder.is_none() && entry.waiters.is_empty() {
            tables.remove(key);
        }
    }

    fn grant_next(entry: &mut LockEntry) {
        loop {
            match entry.waiters.pop_front() {
                Some(waiter) => {
                    let granted = waiter
                        .reply
                        .send(HistoryEvent::LockAcquired {
                            id: waiter.request_id,
                        })
                        .is_ok();
                    if granted {
                        entry.holder = Some(waiter.instance);
                        return;
                    }
                    // Waiter's instance is gone; try the next one.
                }
                None => {
                    entry.holder = None;
                    return;
                }
            }
        }
    }
}

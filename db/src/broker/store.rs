//! Correlation store - the single piece of mutable shared state
//!
//! Maps each request kind to at most one handle (pending or subscription)
//! plus the one-deep open-app backlog slot. Everything else in the broker is
//! either immutable wiring or task-local, so serializing access here
//! serializes the whole system.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;
use tracing::debug;

use super::handle::{PendingHandle, SubscriptionHandle};
use super::messages::RequestKind;

/// A handle occupying a kind's single slot
#[derive(Debug)]
pub enum StoredHandle {
    Pending(PendingHandle),
    Subscription(SubscriptionHandle),
}

impl From<PendingHandle> for StoredHandle {
    fn from(handle: PendingHandle) -> Self {
        StoredHandle::Pending(handle)
    }
}

impl From<SubscriptionHandle> for StoredHandle {
    fn from(handle: SubscriptionHandle) -> Self {
        StoredHandle::Subscription(handle)
    }
}

#[derive(Debug, Default)]
struct Inner {
    slots: HashMap<RequestKind, StoredHandle>,
    backlog: HashMap<RequestKind, Value>,
}

/// Single-slot-per-kind handle table
///
/// All operations hold one global lock, so `take` can never interleave with a
/// `put` for the same kind: a reply for an old query cannot complete a handle
/// installed by a newer query. Constructed once at application start and
/// injected (`Arc`) into the dispatcher and every broadcast receiver.
#[derive(Debug, Default)]
pub struct CorrelationStore {
    inner: Mutex<Inner>,
}

impl CorrelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a handle, overwriting any existing handle for the kind
    ///
    /// Last write wins: the previous occupant, if any, is dropped here and
    /// will never be completed. Callers treat overwritten handles as
    /// abandoned, not failed.
    pub fn put(&self, kind: RequestKind, handle: StoredHandle) {
        let mut inner = self.inner.lock().expect("correlation store poisoned");
        if let Some(previous) = inner.slots.insert(kind, handle) {
            match previous {
                StoredHandle::Pending(old) => {
                    debug!(?kind, request_id = %old.request_id(), age = ?old.age(), "Abandoning pending handle");
                }
                StoredHandle::Subscription(_) => {
                    debug!(?kind, "Superseding subscription");
                }
            }
        }
    }

    /// Atomically return and clear the pending handle for a one-shot kind
    ///
    /// Used exactly once per reply; a second reply for the same kind finds
    /// the slot empty. A subscription occupying the slot is left untouched.
    pub fn take(&self, kind: RequestKind) -> Option<PendingHandle> {
        let mut inner = self.inner.lock().expect("correlation store poisoned");
        match inner.slots.remove(&kind) {
            Some(StoredHandle::Pending(handle)) => Some(handle),
            Some(subscription) => {
                inner.slots.insert(kind, subscription);
                None
            }
            None => None,
        }
    }

    /// Return (without clearing) the subscription handle for a persistent kind
    pub fn peek(&self, kind: RequestKind) -> Option<SubscriptionHandle> {
        let inner = self.inner.lock().expect("correlation store poisoned");
        match inner.slots.get(&kind) {
            Some(StoredHandle::Subscription(handle)) => Some(handle.clone()),
            _ => None,
        }
    }

    /// Cache an unsolicited payload in the kind's one-deep backlog slot
    ///
    /// Only kinds with backlog semantics accept a stash; anything else is
    /// dropped. A second stash overwrites the first.
    pub fn stash_backlog(&self, kind: RequestKind, payload: Value) {
        if !kind.backlogs() {
            debug!(?kind, "Dropping event for non-backlogging kind");
            return;
        }
        let mut inner = self.inner.lock().expect("correlation store poisoned");
        if inner.backlog.insert(kind, payload).is_some() {
            debug!(?kind, "Overwrote backlogged payload");
        }
    }

    /// Atomically return and clear the backlog slot for a kind
    pub fn take_backlog(&self, kind: RequestKind) -> Option<Value> {
        let mut inner = self.inner.lock().expect("correlation store poisoned");
        inner.backlog.remove(&kind)
    }
}

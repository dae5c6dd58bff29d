//! Capability handle for a granted lock.

use super::manager::{self, BrokerState};
use super::types::LockId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// RAII capability handle for a granted lock.
///
/// The lock stays held for as long as the handle is alive. Dropping the
/// handle - explicitly, or because the owning client connection went away -
/// releases the lock and lets the broker re-evaluate the resource's queue.
///
/// A handle holds only a weak back-reference to its broker, so dropping a
/// handle after the broker itself is gone is a harmless no-op.
#[derive(Debug)]
pub struct LockHandle {
    shared: Arc<HandleShared>,
}

/// State shared between a [`LockHandle`] and the broker-side lock entry.
///
/// The broker keeps a `Weak` to this so a preemptive acquisition can
/// invalidate the handle in place without owning it.
#[derive(Debug)]
pub(crate) struct HandleShared {
    broker: Weak<Mutex<BrokerState>>,
    origin: String,
    lock_id: LockId,

    /// Set once the normal release path must no longer run: either the
    /// handle was already released, or the grant was broken by a preemptive
    /// request and the id is already gone from the broker.
    defunct: AtomicBool,

    /// Set when the grant was revoked by a preemptive request.
    broken: AtomicBool,
}

impl HandleShared {
    /// Invalidate the handle without running the release path. The broker
    /// removes the lock itself, so the handle's eventual drop must not
    /// release the id a second time.
    pub(crate) fn break_grant(&self) {
        self.defunct.store(true, Ordering::SeqCst);
        self.broken.store(true, Ordering::SeqCst);
    }
}

impl LockHandle {
    /// Mint a handle for a newly granted lock. Returns the handle together
    /// with the weak back-reference the broker keeps for preemption.
    pub(crate) fn new(
        broker: Weak<Mutex<BrokerState>>,
        origin: String,
        lock_id: LockId,
    ) -> (Self, Weak<HandleShared>) {
        let shared = Arc::new(HandleShared {
            broker,
            origin,
            lock_id,
            defunct: AtomicBool::new(false),
            broken: AtomicBool::new(false),
        });
        let weak = Arc::downgrade(&shared);
        (Self { shared }, weak)
    }

    /// The id of the lock this handle holds.
    pub fn lock_id(&self) -> LockId {
        self.shared.lock_id
    }

    /// The origin the lock was requested under.
    pub fn origin(&self) -> &str {
        &self.shared.origin
    }

    /// True when the grant was forcibly revoked by a preemptive request.
    ///
    /// This is the invalidation signal the broken holder observes; it is
    /// distinct from a normal release, which only ever happens at the
    /// holder's own initiative.
    pub fn is_broken(&self) -> bool {
        self.shared.broken.load(Ordering::SeqCst)
    }

    /// Release the lock before the handle goes out of scope.
    ///
    /// Releasing is idempotent: the broker silently ignores ids it no
    /// longer knows about.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        if self.shared.defunct.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(state) = self.shared.broker.upgrade() {
            manager::release_lock_on(&state, &self.shared.origin, self.shared.lock_id);
        }
    }
}

//! Per-origin lock state: the resource queues and the lock-id index.

use super::lock::{Delivery, Lock};
use super::manager::BrokerState;
use super::queue::ResourceQueue;
use super::types::{LockId, LockInfo, WaitPolicy};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, Weak};

/// All lock state for one origin.
///
/// Routes per-name operations to the right [`ResourceQueue`], creating
/// queues lazily and dropping them when they empty, and keeps the id index
/// used to release a lock without knowing its resource name.
#[derive(Default)]
pub(crate) struct OriginState {
    /// Resource name to that resource's request queue. A `BTreeMap` keeps
    /// snapshots deterministically ordered by name.
    queues: BTreeMap<String, ResourceQueue>,

    /// Lock id to the resource name whose queue holds the lock. Always
    /// mutually consistent with `queues`: every indexed id exists in the
    /// named queue and every queued lock is indexed.
    index: HashMap<LockId, String>,
}

impl OriginState {
    /// Route a `Wait`/`NoWait` request to the named queue, creating the
    /// queue if needed, and index the lock when it enters the queue.
    pub(crate) fn add_request(
        &mut self,
        lock: Lock,
        wait: WaitPolicy,
        broker: &Weak<Mutex<BrokerState>>,
        origin: &str,
        deliveries: &mut Vec<Delivery>,
    ) {
        let name = lock.name().to_string();
        let lock_id = lock.lock_id();
        let queue = self.queues.entry(name.clone()).or_default();
        if queue.add_request(lock, wait, broker, origin, deliveries) {
            self.index.insert(lock_id, name);
        } else if queue.is_empty() {
            // The queue was created just for this refused NoWait request.
            self.queues.remove(&name);
        }
    }

    /// Route a preemptive acquisition to the named queue and fix up the id
    /// index for the broken holders.
    pub(crate) fn preempt_lock(
        &mut self,
        lock: Lock,
        broker: &Weak<Mutex<BrokerState>>,
        origin: &str,
        deliveries: &mut Vec<Delivery>,
    ) -> Vec<(LockId, LockInfo)> {
        let name = lock.name().to_string();
        let lock_id = lock.lock_id();
        let queue = self.queues.entry(name.clone()).or_default();
        let broken = queue.preempt(lock, broker, origin, deliveries);
        for (broken_id, _) in &broken {
            self.index.remove(broken_id);
        }
        self.index.insert(lock_id, name);
        broken
    }

    /// Remove a lock by id, letting its queue grant whatever the removal
    /// unblocked, and drop the queue if it is now empty.
    ///
    /// Returns the removed lock's info, or `None` for an id this origin
    /// does not know (an already-processed release).
    pub(crate) fn erase_lock(
        &mut self,
        lock_id: LockId,
        broker: &Weak<Mutex<BrokerState>>,
        origin: &str,
        deliveries: &mut Vec<Delivery>,
    ) -> Option<LockInfo> {
        let name = self.index.remove(&lock_id)?;
        let queue = self.queues.get_mut(&name)?;
        let removed = queue.remove(lock_id, broker, origin, deliveries);
        debug_assert!(removed.is_some(), "indexed lock missing from its queue");
        if queue.is_empty() {
            self.queues.remove(&name);
        }
        removed
    }

    /// True when this origin holds no locks at all; the broker then
    /// garbage-collects the whole state.
    pub(crate) fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Ordered `(pending, held)` lists across all resource names. No side
    /// effects.
    pub(crate) fn snapshot(&self) -> (Vec<LockInfo>, Vec<LockInfo>) {
        let mut pending = Vec::new();
        let mut held = Vec::new();
        for queue in self.queues.values() {
            queue.snapshot_into(&mut pending, &mut held);
        }
        (pending, held)
    }
}

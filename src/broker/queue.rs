//! Per-resource request queue and the grant/compatibility algorithm.

use super::lock::{Delivery, Lock};
use super::manager::BrokerState;
use super::types::{LockId, LockInfo, LockMode, WaitPolicy};
use std::collections::VecDeque;
use std::sync::{Mutex, Weak};

/// Ordered request queue for one resource name.
///
/// Invariant: granted locks occupy a contiguous prefix at the front of the
/// queue, and more than one entry is granted only when every granted entry
/// is shared. Everything after the first pending entry is pending.
#[derive(Default)]
pub(crate) struct ResourceQueue {
    entries: VecDeque<Lock>,
}

impl ResourceQueue {
    /// Immediate-grant rule: the queue is empty, or the back entry is a
    /// granted shared lock being joined by another shared request.
    ///
    /// Only the back of the queue is consulted. A shared request can
    /// therefore join a granted shared run even while an earlier exclusive
    /// request sits pending further up - that request keeps waiting. This
    /// matches the Web Locks ordering rules, not strict FIFO.
    pub(crate) fn can_grant(&self, mode: LockMode) -> bool {
        match self.entries.back() {
            None => true,
            Some(back) => {
                back.is_granted()
                    && back.mode() == LockMode::Shared
                    && mode == LockMode::Shared
            }
        }
    }

    /// Append a request, granting it immediately when compatible.
    ///
    /// Returns `false` for a `NoWait` request that hit an incompatible
    /// queue: the sink receives the failure and the lock never enters the
    /// queue.
    pub(crate) fn add_request(
        &mut self,
        lock: Lock,
        wait: WaitPolicy,
        broker: &Weak<Mutex<BrokerState>>,
        origin: &str,
        deliveries: &mut Vec<Delivery>,
    ) -> bool {
        debug_assert!(wait != WaitPolicy::Preempt);

        let can_grant = self.can_grant(lock.mode());
        if !can_grant && wait == WaitPolicy::NoWait {
            deliveries.push(Delivery::Failed {
                sink: lock.into_sink(),
            });
            return false;
        }

        self.entries.push_back(lock);
        if can_grant && let Some(back) = self.entries.back_mut() {
            deliveries.push(back.grant(broker.clone(), origin));
        }
        true
    }

    /// Preemptively acquire the resource.
    ///
    /// Breaks every granted entry at the front of the queue in order, then
    /// inserts the new exclusive lock ahead of the remaining (all pending)
    /// entries and grants it immediately. Always succeeds.
    ///
    /// Returns the broken locks so the caller can drop them from its id
    /// index and record the revocations.
    pub(crate) fn preempt(
        &mut self,
        lock: Lock,
        broker: &Weak<Mutex<BrokerState>>,
        origin: &str,
        deliveries: &mut Vec<Delivery>,
    ) -> Vec<(LockId, LockInfo)> {
        // Preempting with a shared lock is rejected upstream as a protocol
        // violation.
        debug_assert_eq!(lock.mode(), LockMode::Exclusive);

        let mut broken = Vec::new();
        while self.entries.front().is_some_and(Lock::is_granted) {
            if let Some(front) = self.entries.pop_front() {
                front.break_grant();
                broken.push((front.lock_id(), front.info()));
            }
        }

        self.entries.push_front(lock);
        if let Some(front) = self.entries.front_mut() {
            deliveries.push(front.grant(broker.clone(), origin));
        }
        broken
    }

    /// Remove a lock by id and grant whatever the removal unblocked.
    ///
    /// Returns the removed lock's info, or `None` when the id is not in
    /// this queue.
    pub(crate) fn remove(
        &mut self,
        lock_id: LockId,
        broker: &Weak<Mutex<BrokerState>>,
        origin: &str,
        deliveries: &mut Vec<Delivery>,
    ) -> Option<LockInfo> {
        let pos = self.entries.iter().position(|l| l.lock_id() == lock_id)?;
        let removed = self.entries.remove(pos)?;
        let info = removed.info();

        // Removing a pending entry cannot change the granted prefix.
        if !removed.is_granted() {
            return Some(info);
        }

        // If the new front is still granted we only shortened a shared run;
        // nothing to re-evaluate. If it is pending, the removed lock was the
        // last granted one and the front is now grantable.
        let front_mode = match self.entries.front() {
            None => return Some(info),
            Some(front) if front.is_granted() => return Some(info),
            Some(front) => front.mode(),
        };

        if front_mode == LockMode::Exclusive {
            if let Some(front) = self.entries.front_mut() {
                deliveries.push(front.grant(broker.clone(), origin));
            }
        } else {
            // Grant the whole contiguous shared run, stopping at the first
            // exclusive entry.
            for entry in self.entries.iter_mut() {
                if entry.mode() != LockMode::Shared {
                    break;
                }
                debug_assert!(!entry.is_granted());
                deliveries.push(entry.grant(broker.clone(), origin));
            }
        }
        Some(info)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append this queue's entries to the pending/held snapshot lists.
    pub(crate) fn snapshot_into(&self, pending: &mut Vec<LockInfo>, held: &mut Vec<LockInfo>) {
        for lock in &self.entries {
            let target = if lock.is_granted() {
                &mut *held
            } else {
                &mut *pending
            };
            target.push(lock.info());
        }
    }
}

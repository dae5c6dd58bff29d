//! The lock entity: one pending-or-granted request against a resource.

use super::handle::{HandleShared, LockHandle};
use super::manager::BrokerState;
use super::request::LockRequest;
use super::types::{LockId, LockInfo, LockMode};
use std::sync::{Mutex, Weak};

/// A queued or held lock request against one resource name.
///
/// Created when a request is accepted into a queue, destroyed when its
/// handle is dropped, when it is broken by a preemptive request, or when a
/// `NoWait` refusal hands the sink straight back without ever queueing.
pub(crate) struct Lock {
    name: String,
    mode: LockMode,
    lock_id: LockId,
    client_id: String,
    state: LockState,
}

/// Exactly one side is live at any time: the request sink until the lock is
/// granted, the handle back-reference afterwards. There is no way back from
/// granted to pending.
enum LockState {
    Pending(Box<dyn LockRequest>),
    Granted(Weak<HandleShared>),
}

impl Lock {
    pub(crate) fn new(
        name: &str,
        mode: LockMode,
        lock_id: LockId,
        client_id: &str,
        sink: Box<dyn LockRequest>,
    ) -> Self {
        Self {
            name: name.to_string(),
            mode,
            lock_id,
            client_id: client_id.to_string(),
            state: LockState::Pending(sink),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn mode(&self) -> LockMode {
        self.mode
    }

    pub(crate) fn lock_id(&self) -> LockId {
        self.lock_id
    }

    pub(crate) fn is_granted(&self) -> bool {
        matches!(self.state, LockState::Granted(_))
    }

    /// Introspection record for snapshots and audit events.
    pub(crate) fn info(&self) -> LockInfo {
        LockInfo {
            name: self.name.clone(),
            mode: self.mode,
            client_id: self.client_id.clone(),
        }
    }

    /// Grant the request: mint the capability handle, keep a weak
    /// back-reference for preemption, and hand the sink back for delivery
    /// once the broker's state lock has been released.
    pub(crate) fn grant(&mut self, broker: Weak<Mutex<BrokerState>>, origin: &str) -> Delivery {
        let (handle, shared) = LockHandle::new(broker, origin.to_string(), self.lock_id);
        match std::mem::replace(&mut self.state, LockState::Granted(shared)) {
            LockState::Pending(sink) => Delivery::Granted {
                sink,
                handle,
                info: self.info(),
            },
            LockState::Granted(_) => unreachable!("grant on an already granted lock"),
        }
    }

    /// Break a granted lock: invalidate the holder's handle without running
    /// the normal release-notification path, so the handle's eventual drop
    /// cannot double-release the id.
    pub(crate) fn break_grant(&self) {
        if let LockState::Granted(shared) = &self.state
            && let Some(shared) = shared.upgrade()
        {
            shared.break_grant();
        }
    }

    /// Take the request sink back out of a pending lock that never entered
    /// a queue (a `NoWait` refusal).
    pub(crate) fn into_sink(self) -> Box<dyn LockRequest> {
        match self.state {
            LockState::Pending(sink) => sink,
            LockState::Granted(_) => unreachable!("granted lock has no request sink"),
        }
    }
}

/// Outcome notification produced while the broker state is locked and
/// dispatched to the client sink only after the state lock is dropped.
/// Sinks may re-enter the broker (for example by dropping the granted
/// handle on the spot), so they must never run under the state lock.
pub(crate) enum Delivery {
    Granted {
        sink: Box<dyn LockRequest>,
        handle: LockHandle,
        info: LockInfo,
    },
    Failed {
        sink: Box<dyn LockRequest>,
    },
}

impl Delivery {
    pub(crate) fn dispatch(self) {
        match self {
            Delivery::Granted { sink, handle, .. } => sink.granted(handle),
            Delivery::Failed { sink } => sink.failed(),
        }
    }
}

//! The top-level lock broker: request routing, id allocation, introspection.

use super::lock::{Delivery, Lock};
use super::origin::OriginState;
use super::request::LockRequest;
use super::types::{
    LockId, LockInfo, LockMode, PREEMPTIVE_LOCK_ID, RESERVED_NAME_PREFIX, WaitPolicy,
};
use crate::error::{BrokerError, Result};
use crate::events::{Event, EventAction, EventLog};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// Arbitrates named, mode-qualified locks across many independent client
/// connections, scoped by origin.
///
/// Grant decisions are FIFO-fair subject to the shared/exclusive
/// compatibility rules, with an explicit preemptive mode that forcibly
/// revokes current holders. One broker instance is intended to live for the
/// process duration and be handed explicitly to all callers; tests construct
/// isolated instances.
///
/// All mutation runs under a single internal mutex, so no grant decision
/// ever observes a half-updated queue. Cloning the broker clones a cheap
/// reference to the same shared state.
///
/// ```
/// use warden::{LockBroker, LockHandle, LockMode, LockRequest, WaitPolicy};
///
/// struct Sink;
/// impl LockRequest for Sink {
///     fn granted(self: Box<Self>, handle: LockHandle) {
///         // Keep the handle for as long as the lock should stay held.
///         drop(handle);
///     }
///     fn failed(self: Box<Self>) {}
/// }
///
/// let broker = LockBroker::new();
/// broker.request_lock(
///     "https://example.com",
///     "cache",
///     LockMode::Exclusive,
///     WaitPolicy::Wait,
///     "client-1",
///     Box::new(Sink),
/// )?;
/// # Ok::<(), warden::BrokerError>(())
/// ```
#[derive(Clone)]
pub struct LockBroker {
    state: Arc<Mutex<BrokerState>>,
}

/// Everything behind the broker's mutex. One instance per broker.
pub(crate) struct BrokerState {
    /// Origin to that origin's lock state. Entries are created on first
    /// request and removed once the origin holds no locks at all.
    origins: HashMap<String, OriginState>,

    /// Strictly-increasing id counter, starting at the reserved sentinel so
    /// every allocated id is greater than it.
    next_lock_id: LockId,

    /// Audit log of grant/queue/release/break transitions.
    events: EventLog,

    /// Handed to capability handles so a handle drop can find its way back
    /// to the broker without owning it.
    self_weak: Weak<Mutex<BrokerState>>,
}

impl BrokerState {
    fn next_lock_id(&mut self) -> LockId {
        self.next_lock_id += 1;
        debug_assert!(self.next_lock_id > PREEMPTIVE_LOCK_ID);
        self.next_lock_id
    }
}

impl LockBroker {
    pub fn new() -> Self {
        let state = Arc::new_cyclic(|weak| {
            Mutex::new(BrokerState {
                origins: HashMap::new(),
                next_lock_id: PREEMPTIVE_LOCK_ID,
                events: EventLog::new(),
                self_weak: weak.clone(),
            })
        });
        Self { state }
    }

    /// Request a lock on `name` under `origin` for the connection identified
    /// by `client_id`.
    ///
    /// The outcome is delivered through `sink`: `granted` with the
    /// capability handle (immediately, or later when earlier entries are
    /// released), or `failed` for a `NoWait` request against an incompatible
    /// queue. A `Wait` request that cannot be granted yet queues and waits
    /// indefinitely; a still-pending request is cancelled by releasing the
    /// returned id.
    ///
    /// # Errors
    ///
    /// Protocol violations - `Preempt` combined with a non-exclusive mode,
    /// or a reserved resource name - are returned as errors and the caller
    /// is expected to terminate the offending client connection.
    pub fn request_lock(
        &self,
        origin: &str,
        name: &str,
        mode: LockMode,
        wait: WaitPolicy,
        client_id: &str,
        sink: Box<dyn LockRequest>,
    ) -> Result<LockId> {
        if wait == WaitPolicy::Preempt && mode != LockMode::Exclusive {
            return Err(BrokerError::InvalidOptions { mode, wait });
        }
        if name.starts_with(RESERVED_NAME_PREFIX) {
            return Err(BrokerError::ReservedName(name.to_string()));
        }

        let mut deliveries = Vec::new();
        let lock_id;
        {
            let mut state = lock_state(&self.state);
            lock_id = state.next_lock_id();
            let broker = state.self_weak.clone();
            let lock = Lock::new(name, mode, lock_id, client_id, sink);

            let origin_state = state.origins.entry(origin.to_string()).or_default();
            let broken = if wait == WaitPolicy::Preempt {
                origin_state.preempt_lock(lock, &broker, origin, &mut deliveries)
            } else {
                origin_state.add_request(lock, wait, &broker, origin, &mut deliveries);
                Vec::new()
            };
            if origin_state.is_empty() {
                // A refused NoWait request may have been the only thing
                // keeping a freshly created origin state alive.
                state.origins.remove(origin);
            }

            for (broken_id, info) in &broken {
                state.events.append(
                    Event::new(EventAction::Broken, origin)
                        .with_client_id(&info.client_id)
                        .with_name(&info.name)
                        .with_lock_id(*broken_id),
                );
            }
            if wait == WaitPolicy::Wait && deliveries.is_empty() {
                state.events.append(
                    Event::new(EventAction::Queued, origin)
                        .with_client_id(client_id)
                        .with_name(name)
                        .with_lock_id(lock_id),
                );
            }
            if deliveries
                .iter()
                .any(|d| matches!(d, Delivery::Failed { .. }))
            {
                state.events.append(
                    Event::new(EventAction::Failed, origin)
                        .with_client_id(client_id)
                        .with_name(name)
                        .with_lock_id(lock_id),
                );
            }
            log_grants(&mut state.events, origin, &deliveries);
        }

        for delivery in deliveries {
            delivery.dispatch();
        }
        Ok(lock_id)
    }

    /// Release the lock with the given id under `origin`.
    ///
    /// Unknown origins and ids are silently ignored: the drop paths of a
    /// handle and an explicit release can race harmlessly, so a second
    /// release of the same id is an already-completed operation, not an
    /// error.
    pub fn release_lock(&self, origin: &str, lock_id: LockId) {
        release_lock_on(&self.state, origin, lock_id);
    }

    /// Snapshot of the pending and held locks for `origin`, in resource-name
    /// order. Returns two empty lists for an origin with no lock state.
    pub fn query_state(&self, origin: &str) -> (Vec<LockInfo>, Vec<LockInfo>) {
        let state = lock_state(&self.state);
        state
            .origins
            .get(origin)
            .map(OriginState::snapshot)
            .unwrap_or_default()
    }

    /// Snapshot of the audit event log.
    pub fn events(&self) -> Vec<Event> {
        lock_state(&self.state).events.snapshot()
    }
}

impl Default for LockBroker {
    fn default() -> Self {
        Self::new()
    }
}

/// Release path shared by [`LockBroker::release_lock`] and the capability
/// handle's `Drop` impl, so explicit release and connection loss take the
/// exact same re-grant route.
pub(crate) fn release_lock_on(state: &Arc<Mutex<BrokerState>>, origin: &str, lock_id: LockId) {
    let mut deliveries = Vec::new();
    {
        let mut state = lock_state(state);
        let broker = state.self_weak.clone();
        let removed = match state.origins.get_mut(origin) {
            Some(origin_state) => {
                let removed = origin_state.erase_lock(lock_id, &broker, origin, &mut deliveries);
                if origin_state.is_empty() {
                    state.origins.remove(origin);
                }
                removed
            }
            None => None,
        };

        if let Some(info) = removed {
            state.events.append(
                Event::new(EventAction::Released, origin)
                    .with_client_id(&info.client_id)
                    .with_name(&info.name)
                    .with_lock_id(lock_id),
            );
            log_grants(&mut state.events, origin, &deliveries);
        }
    }

    for delivery in deliveries {
        delivery.dispatch();
    }
}

fn log_grants(events: &mut EventLog, origin: &str, deliveries: &[Delivery]) {
    for delivery in deliveries {
        if let Delivery::Granted { handle, info, .. } = delivery {
            events.append(
                Event::new(EventAction::Granted, origin)
                    .with_client_id(&info.client_id)
                    .with_name(&info.name)
                    .with_lock_id(handle.lock_id()),
            );
        }
    }
}

/// Sinks never run under the state lock, so a panic while the lock is held
/// is a broker bug, not a half-applied grant visible to callers. Recover
/// from poisoning instead of failing every later operation.
fn lock_state(state: &Mutex<BrokerState>) -> MutexGuard<'_, BrokerState> {
    state.lock().unwrap_or_else(|poison| poison.into_inner())
}

//! Shared helpers for broker tests.

use crate::broker::{LockHandle, LockRequest};
use std::sync::{Arc, Mutex};

/// Records the outcome delivered to a lock request sink and parks the
/// granted handle so tests can inspect it, drop it explicitly, or observe
/// it being broken by a preemptive acquisition.
#[derive(Default)]
pub(crate) struct RequestProbe {
    inner: Arc<Mutex<ProbeState>>,
}

#[derive(Default)]
struct ProbeState {
    handle: Option<LockHandle>,
    granted: bool,
    failed: bool,
}

impl RequestProbe {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A fresh sink for this probe, to pass into `request_lock`.
    pub(crate) fn sink(&self) -> Box<dyn LockRequest> {
        Box::new(ProbeSink {
            inner: self.inner.clone(),
        })
    }

    pub(crate) fn is_granted(&self) -> bool {
        self.inner.lock().unwrap().granted
    }

    pub(crate) fn is_failed(&self) -> bool {
        self.inner.lock().unwrap().failed
    }

    /// True while no outcome has been delivered yet.
    pub(crate) fn is_pending(&self) -> bool {
        let state = self.inner.lock().unwrap();
        !state.granted && !state.failed
    }

    /// True when the granted handle was broken by a preemptive request.
    pub(crate) fn is_broken(&self) -> bool {
        self.inner
            .lock()
            .unwrap()
            .handle
            .as_ref()
            .is_some_and(LockHandle::is_broken)
    }

    /// Take the granted handle out of the probe, if any.
    pub(crate) fn take_handle(&self) -> Option<LockHandle> {
        self.inner.lock().unwrap().handle.take()
    }

    /// Drop the granted handle, releasing the lock through the normal
    /// drop path.
    pub(crate) fn drop_handle(&self) {
        drop(self.take_handle());
    }
}

struct ProbeSink {
    inner: Arc<Mutex<ProbeState>>,
}

impl LockRequest for ProbeSink {
    fn granted(self: Box<Self>, handle: LockHandle) {
        let mut state = self.inner.lock().unwrap();
        state.granted = true;
        state.handle = Some(handle);
    }

    fn failed(self: Box<Self>) {
        self.inner.lock().unwrap().failed = true;
    }
}

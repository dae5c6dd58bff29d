//! Warden: in-process per-origin resource lock broker.
//!
//! Arbitrates concurrent requests for named, shared/exclusive locks issued
//! by many independent client connections, with FIFO-fair granting subject
//! to compatibility rules and a preemptive acquisition mode that forcibly
//! revokes current holders. See [`broker::LockBroker`] for the entry point.

pub mod broker;
pub mod error;
pub mod events;

#[cfg(test)]
pub(crate) mod test_support;

pub use broker::{LockBroker, LockHandle, LockId, LockInfo, LockMode, LockRequest, WaitPolicy};
pub use error::{BrokerError, Result};

//! Error types for the warden lock broker.
//!
//! Uses thiserror for derive macros. The error surface is deliberately
//! narrow: contention (a `NoWait` request that cannot be granted) and stale
//! releases are ordinary outcomes, not errors. Errors here represent either
//! a protocol violation by the calling connection, which the transport layer
//! is expected to answer by terminating that connection, or a failed audit
//! log export. No error is fatal to the process.

use crate::broker::{LockMode, WaitPolicy};
use thiserror::Error;

/// Main error type for broker operations.
#[derive(Error, Debug)]
pub enum BrokerError {
    /// The caller combined a wait policy with a mode it does not support.
    /// Preemptive acquisition is exclusive-only.
    #[error("invalid option combination: {wait} with {mode} mode")]
    InvalidOptions { mode: LockMode, wait: WaitPolicy },

    /// The caller requested a resource name in the reserved namespace
    /// (names starting with `-`).
    #[error("reserved resource name: '{0}'")]
    ReservedName(String),

    /// The audit event log could not be serialized or written.
    #[error("event log error: {0}")]
    EventLog(String),
}

impl BrokerError {
    /// True when the error represents a contract violation by the client
    /// connection, which should be terminated rather than answered.
    pub fn is_protocol_violation(&self) -> bool {
        match self {
            BrokerError::InvalidOptions { .. } => true,
            BrokerError::ReservedName(_) => true,
            BrokerError::EventLog(_) => false,
        }
    }
}

/// Result type alias for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;

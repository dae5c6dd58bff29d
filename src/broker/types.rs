//! Vocabulary types for the lock broker.

use serde::{Deserialize, Serialize};

/// Identifier assigned to every lock request, unique within one broker.
///
/// Ids are strictly increasing for the lifetime of the broker, so they
/// double as a request-arrival order when compared.
pub type LockId = i64;

/// Reserved id guaranteed to be smaller than any id handed out by the
/// broker's counter. Keeps preemptive inserts ordered ahead of every real
/// request when ids are compared.
pub(crate) const PREEMPTIVE_LOCK_ID: LockId = 0;

/// Resource names starting with this character are reserved for internal
/// use and rejected unconditionally.
pub(crate) const RESERVED_NAME_PREFIX: char = '-';

/// Access mode requested for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    /// Read-like access; any number of shared holders may be granted
    /// together.
    Shared,
    /// Write-like access; an exclusive holder is never granted alongside
    /// any other holder.
    Exclusive,
}

impl std::fmt::Display for LockMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockMode::Shared => write!(f, "shared"),
            LockMode::Exclusive => write!(f, "exclusive"),
        }
    }
}

/// What to do when a request is not immediately grantable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitPolicy {
    /// Queue behind earlier requests and wait indefinitely.
    Wait,
    /// Fail fast; the request never enters the queue.
    NoWait,
    /// Break the current holders and acquire immediately.
    /// Only valid with [`LockMode::Exclusive`].
    Preempt,
}

impl std::fmt::Display for WaitPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaitPolicy::Wait => write!(f, "wait"),
            WaitPolicy::NoWait => write!(f, "no_wait"),
            WaitPolicy::Preempt => write!(f, "preempt"),
        }
    }
}

/// Introspection record describing one pending or held lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    /// The contended resource name.
    pub name: String,

    /// The requested access mode.
    pub mode: LockMode,

    /// Opaque identifier of the requesting client connection.
    pub client_id: String,
}

impl std::fmt::Display for LockInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, client: {})", self.name, self.mode, self.client_id)
    }
}

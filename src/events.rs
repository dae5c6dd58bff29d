//! Audit event logging for the lock broker.
//!
//! Every grant decision the broker takes is recorded as an event: requests
//! being granted, queued, refused, released, or broken by a preemptive
//! acquisition. The log is kept in memory alongside the broker state and
//! can be exported as NDJSON (one JSON object per line) for offline
//! inspection.
//!
//! # Event Format
//!
//! Each event is a JSON object with the following fields:
//! - `ts`: RFC3339 timestamp
//! - `action`: the transition (granted, queued, failed, released, broken)
//! - `origin`: the origin the lock was scoped under
//! - `client_id`: the requesting connection, when known
//! - `name`: the resource name, when known
//! - `lock_id`: the lock id, when known

use crate::broker::LockId;
use crate::error::{BrokerError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Lock transitions that are logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// A request was granted and a capability handle issued.
    Granted,
    /// A `Wait` request was queued behind incompatible entries.
    Queued,
    /// A `NoWait` request was refused without entering the queue.
    Failed,
    /// A held or pending lock was released and removed.
    Released,
    /// A granted lock was forcibly revoked by a preemptive request.
    Broken,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAction::Granted => write!(f, "granted"),
            EventAction::Queued => write!(f, "queued"),
            EventAction::Failed => write!(f, "failed"),
            EventAction::Released => write!(f, "released"),
            EventAction::Broken => write!(f, "broken"),
        }
    }
}

/// An event record for the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// RFC3339 timestamp when the event occurred.
    pub ts: DateTime<Utc>,

    /// The transition that was recorded.
    pub action: EventAction,

    /// The origin the lock was scoped under.
    pub origin: String,

    /// The requesting client connection, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// The resource name, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// The lock id, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_id: Option<LockId>,
}

impl Event {
    /// Create a new event with the given action and origin, timestamped
    /// with the current time.
    pub fn new(action: EventAction, origin: impl Into<String>) -> Self {
        Self {
            ts: Utc::now(),
            action,
            origin: origin.into(),
            client_id: None,
            name: None,
            lock_id: None,
        }
    }

    /// Set the client id for this event.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set the resource name for this event.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the lock id for this event.
    pub fn with_lock_id(mut self, lock_id: LockId) -> Self {
        self.lock_id = Some(lock_id);
        self
    }

    /// Serialize the event to a single-line JSON string.
    ///
    /// This is used for NDJSON format where each line is a complete JSON object.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| BrokerError::EventLog(format!("failed to serialize event to JSON: {}", e)))
    }
}

/// In-memory append-only event log, owned by the broker state.
#[derive(Default)]
pub(crate) struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Clone the recorded events in append order.
    pub(crate) fn snapshot(&self) -> Vec<Event> {
        self.events.clone()
    }
}

/// Write events to `path` in NDJSON format, one event per line with a
/// trailing newline. An existing file is overwritten.
pub fn write_events(path: &Path, events: &[Event]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        BrokerError::EventLog(format!(
            "failed to create events file '{}': {}",
            path.display(),
            e
        ))
    })?;

    for event in events {
        let json_line = event.to_ndjson_line()?;
        writeln!(file, "{}", json_line).map_err(|e| {
            BrokerError::EventLog(format!(
                "failed to write event to '{}': {}",
                path.display(),
                e
            ))
        })?;
    }

    file.sync_all().map_err(|e| {
        BrokerError::EventLog(format!(
            "failed to sync events file '{}': {}",
            path.display(),
            e
        ))
    })?;

    Ok(())
}

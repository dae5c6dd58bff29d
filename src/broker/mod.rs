//! Lock brokering subsystem.
//!
//! This module implements the per-origin resource lock model:
//! - Named resources, scoped by origin (two identical names under different
//!   origins never interact)
//! - Shared/exclusive access modes with reader-writer compatibility
//! - FIFO-fair granting subject to compatibility, driven from the back of
//!   each resource's request queue
//! - A preemptive acquisition mode that breaks current holders
//!
//! # Capability handles
//!
//! A granted lock is represented by a [`LockHandle`]. The lock stays held
//! for exactly as long as the handle is alive; dropping it (explicitly, or
//! because the client connection died) releases the lock and re-evaluates
//! the queue. A handle broken by a preemptive request reports
//! `is_broken() == true` and releases nothing on drop.
//!
//! # Outcome delivery
//!
//! Request outcomes are pushed through the [`LockRequest`] sink supplied
//! with each request, which keeps the broker free of any transport or
//! serialization concern.

mod handle;
mod lock;
mod manager;
mod origin;
mod queue;
mod request;
mod types;


// Re-export public API
pub use handle::LockHandle;
pub use manager::LockBroker;
pub use request::LockRequest;
pub use types::{LockId, LockInfo, LockMode, WaitPolicy};

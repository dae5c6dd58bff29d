//! The outcome-delivery seam between the broker and the transport layer.

use super::handle::LockHandle;

/// Client-side sink for the outcome of a lock request.
///
/// The transport/session layer implements this for each inbound request.
/// The broker consumes the sink exactly once: `granted` when the request is
/// selected by the grant algorithm (immediately, or later when earlier
/// entries are released), or `failed` when a `NoWait` request hits an
/// incompatible queue.
///
/// Sinks are never invoked while the broker's internal state is locked, so
/// an implementation may re-enter the broker freely, including dropping the
/// granted handle on the spot.
pub trait LockRequest: Send {
    /// The request was granted. The lock stays held until `handle` is
    /// released or dropped.
    fn granted(self: Box<Self>, handle: LockHandle);

    /// A `NoWait` request could not be granted immediately. The request
    /// never entered the queue.
    fn failed(self: Box<Self>);
}

//! Reactor wake-up abstraction.
//!
//! A `Notifier` wakes the reactor's blocked multiplexer wait when results
//! have been delivered to the pending-write registry, so write interest
//! can be armed for the affected connections.
//!
//! # Implementors
//!
//! - `WakeFd` (evpoll-reactor, default): writes 1 to an eventfd that is
//!   registered in the reactor's epoll set. Simple, well-understood,
//!   coalescing.
//!
//! # Contract
//!
//! - `notify()` must NEVER block.
//! - Multiple calls before the reactor wakes are coalesced (eventfd
//!   counter semantics: the counter increments, one read drains it).
//! - Called by the drain thread after each registry delivery; a spurious
//!   wake-up is harmless.

use crate::error::Result;

/// Wakes the reactor when pending writes are ready to be armed.
pub trait Notifier: Send + Sync {
    /// Signal that the pending-write registry has new entries.
    fn notify(&self) -> Result<()>;
}

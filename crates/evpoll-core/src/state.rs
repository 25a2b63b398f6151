//! Connection state machine

use core::fmt;

/// Phase of a connection's request/response cycle.
///
/// The reactor is the only writer of this state, and the epoll interest
/// bits for the connection's descriptor are derived from it — never the
/// other way around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnState {
    /// Registered for read readiness, waiting for request bytes
    ReadPending = 0,

    /// A job is in flight in the worker pool; no result delivered yet
    ProcessingPending = 1,

    /// A result sits in the pending-write registry; registered for
    /// write readiness until fully flushed
    WritePending = 2,

    /// Being torn down; must not appear in any interest set
    Closing = 3,
}

impl ConnState {
    /// Check if the connection's descriptor wants write readiness
    #[inline]
    pub const fn wants_write(&self) -> bool {
        matches!(self, ConnState::WritePending)
    }

    /// Check if the connection's descriptor wants read readiness
    ///
    /// Every open state keeps read interest armed so peer half-close
    /// (RDHUP) is observed even mid-processing.
    #[inline]
    pub const fn wants_read(&self) -> bool {
        !matches!(self, ConnState::Closing)
    }

    /// Check if the connection is being torn down
    #[inline]
    pub const fn is_closing(&self) -> bool {
        matches!(self, ConnState::Closing)
    }
}

impl fmt::Display for ConnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnState::ReadPending => write!(f, "read-pending"),
            ConnState::ProcessingPending => write!(f, "processing"),
            ConnState::WritePending => write!(f, "write-pending"),
            ConnState::Closing => write!(f, "closing"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interest_derivation() {
        assert!(ConnState::ReadPending.wants_read());
        assert!(!ConnState::ReadPending.wants_write());

        assert!(ConnState::ProcessingPending.wants_read());
        assert!(!ConnState::ProcessingPending.wants_write());

        assert!(ConnState::WritePending.wants_read());
        assert!(ConnState::WritePending.wants_write());

        assert!(!ConnState::Closing.wants_read());
        assert!(!ConnState::Closing.wants_write());
        assert!(ConnState::Closing.is_closing());
    }
}

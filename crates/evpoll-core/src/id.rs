//! Connection identifier type

use core::fmt;

/// Unique identifier for a live connection.
///
/// This is the connection's file descriptor. It is unique for as long as
/// the descriptor is open; the kernel reuses fd numbers after close, so a
/// `ConnId` must never be held across the close of its connection. The
/// value -1 is reserved as a sentinel for "no connection".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ConnId(i32);

impl ConnId {
    /// Sentinel value indicating no connection
    pub const NONE: ConnId = ConnId(-1);

    /// Create a `ConnId` from a raw file descriptor
    #[inline]
    pub const fn new(fd: i32) -> Self {
        ConnId(fd)
    }

    /// Get the raw file descriptor
    #[inline]
    pub const fn as_raw(self) -> i32 {
        self.0
    }

    /// Check if this is the NONE sentinel
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 < 0
    }

    /// Check if this identifies an open connection
    #[inline]
    pub const fn is_some(self) -> bool {
        self.0 >= 0
    }
}

impl From<i32> for ConnId {
    #[inline]
    fn from(fd: i32) -> Self {
        ConnId(fd)
    }
}

impl From<ConnId> for i32 {
    #[inline]
    fn from(id: ConnId) -> Self {
        id.0
    }
}

impl fmt::Debug for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "ConnId(NONE)")
        } else {
            write!(f, "ConnId({})", self.0)
        }
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "none")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl Default for ConnId {
    fn default() -> Self {
        ConnId::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conn_id_basics() {
        let id = ConnId::new(7);
        assert_eq!(id.as_raw(), 7);
        assert!(id.is_some());
        assert!(!id.is_none());
    }

    #[test]
    fn test_conn_id_none() {
        assert!(ConnId::NONE.is_none());
        assert!(!ConnId::NONE.is_some());
        assert_eq!(ConnId::default(), ConnId::NONE);
    }

    #[test]
    fn test_conn_id_conversions() {
        let id: ConnId = 42i32.into();
        let raw: i32 = id.into();
        assert_eq!(raw, 42);
    }
}

//! Job and result transfer types.
//!
//! These are the *lingua franca* between the reactor and the worker pool:
//! a `Job` travels reactor → workers, an `Outbound` travels workers →
//! drain → pending-write registry. Both own their payload outright — no
//! pooled buffer ever crosses this boundary.

use crate::id::ConnId;

/// A unit of work handed from the reactor to the worker pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Connection the bytes were read from.
    pub conn: ConnId,
    /// Request bytes, copied out of the connection's pooled read buffer
    /// at the end of the read burst.
    pub payload: Vec<u8>,
}

impl Job {
    pub fn new(conn: ConnId, payload: Vec<u8>) -> Self {
        Self { conn, payload }
    }
}

/// A unit of output produced by a worker.
///
/// Ownership of the payload transfers to the pending-write registry when
/// the drain thread delivers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    /// Connection the bytes are destined for. For broadcast protocols
    /// this is not necessarily the connection the job came from.
    pub conn: ConnId,
    /// Wire bytes to flush.
    pub payload: Vec<u8>,
}

impl Outbound {
    pub fn new(conn: ConnId, payload: Vec<u8>) -> Self {
        Self { conn, payload }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_owns_payload() {
        let job = Job::new(ConnId::new(5), b"GET / HTTP/1.0\r\n\r\n".to_vec());
        assert_eq!(job.conn.as_raw(), 5);
        assert!(job.payload.starts_with(b"GET"));
    }

    #[test]
    fn test_outbound_retargets() {
        let out = Outbound::new(ConnId::new(9), b"hi".to_vec());
        assert_eq!(out.conn, ConnId::new(9));
        assert_eq!(out.payload, b"hi");
    }
}

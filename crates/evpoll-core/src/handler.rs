//! Protocol handler abstraction.
//!
//! A `Handler` turns request bytes into response bytes. It is the seam
//! between the transport core and the protocol: the reactor and worker
//! pool are protocol-blind, and each server variant is one `Handler`
//! implementation.
//!
//! # Implementors
//!
//! - `EchoHandler` (cmd/echo): returns the payload to its sender.
//! - `ChatHandler` (cmd/chat): fans the payload out to every other live
//!   connection, prefixed with the sender's address.
//! - `HttpHandler` (evpoll-http): parses an HTTP/1.0 request and encodes
//!   a response; parse failures yield no output.

use crate::job::{Job, Outbound};
use crate::peers::PeerTable;

/// Turns one job into zero or more outbound payloads.
///
/// **Contract:**
/// - `handle()` runs on a worker thread and MAY block (that is the point
///   of the pool) but must never touch a socket — output goes through
///   the returned `Outbound`s only.
/// - The job's payload is owned; nothing else references it.
/// - An empty return vector is valid: the request produced no response
///   (e.g. a protocol parse error) and the connection stays open.
/// - Implementations are shared across workers and must be `Send + Sync`
///   with no per-request mutable state.
pub trait Handler: Send + Sync {
    /// Process one job. `peers` is a snapshot view of live connections
    /// (id and printable address) maintained by the reactor.
    fn handle(&self, job: Job, peers: &PeerTable) -> Vec<Outbound>;

    /// Wire bytes to send when the pool rejects a job under overload.
    ///
    /// `None` (the default) drops the job silently; protocols with an
    /// in-band error channel (HTTP 503) return the encoded response.
    fn busy_response(&self) -> Option<Vec<u8>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ConnId;

    struct Uppercase;

    impl Handler for Uppercase {
        fn handle(&self, job: Job, _peers: &PeerTable) -> Vec<Outbound> {
            vec![Outbound::new(job.conn, job.payload.to_ascii_uppercase())]
        }
    }

    #[test]
    fn test_handler_object_safety() {
        let h: std::sync::Arc<dyn Handler> = std::sync::Arc::new(Uppercase);
        let peers = PeerTable::new();
        let out = h.handle(Job::new(ConnId::new(3), b"hi".to_vec()), &peers);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].payload, b"HI");
        assert!(h.busy_response().is_none());
    }
}

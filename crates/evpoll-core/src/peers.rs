//! Shared view of live connections.
//!
//! The reactor owns the full connection table (buffers, descriptors,
//! state) single-threadedly; workers only ever need "who is connected
//! and what is their address" — for broadcast fan-out and for logging.
//! `PeerTable` is that read side: the reactor inserts on accept and
//! removes before close, workers take lock-guarded snapshots.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::id::ConnId;

/// One live connection as seen from a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub id: ConnId,
    /// Printable peer address, "a.b.c.d:port".
    pub addr: String,
}

/// Mutex-guarded id → address map.
///
/// The lock is held only for the duration of the map operation; callers
/// never perform I/O under it.
#[derive(Debug, Default)]
pub struct PeerTable {
    inner: Mutex<HashMap<ConnId, String>>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Record a newly accepted connection. Called by the reactor only.
    pub fn insert(&self, id: ConnId, addr: String) {
        self.inner.lock().unwrap().insert(id, addr);
    }

    /// Forget a connection. Called by the reactor before the descriptor
    /// closes, so a snapshot never names a dead fd.
    pub fn remove(&self, id: ConnId) {
        self.inner.lock().unwrap().remove(&id);
    }

    /// Printable address of one connection, if still live.
    pub fn addr_of(&self, id: ConnId) -> Option<String> {
        self.inner.lock().unwrap().get(&id).cloned()
    }

    /// Point-in-time copy of every live connection.
    pub fn snapshot(&self) -> Vec<Peer> {
        self.inner
            .lock()
            .unwrap()
            .iter()
            .map(|(id, addr)| Peer {
                id: *id,
                addr: addr.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_remove() {
        let table = PeerTable::new();
        let a = ConnId::new(4);

        table.insert(a, "127.0.0.1:5000".to_string());
        assert_eq!(table.len(), 1);
        assert_eq!(table.addr_of(a).as_deref(), Some("127.0.0.1:5000"));

        table.remove(a);
        assert!(table.is_empty());
        assert_eq!(table.addr_of(a), None);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let table = PeerTable::new();
        table.insert(ConnId::new(4), "10.0.0.1:1".to_string());
        table.insert(ConnId::new(5), "10.0.0.2:2".to_string());

        let snap = table.snapshot();
        table.remove(ConnId::new(4));

        // The snapshot taken before the removal is unaffected.
        assert_eq!(snap.len(), 2);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_reinserted_id_takes_latest_addr() {
        // fd numbers are reused after close; a re-insert models the
        // next connection that got the same descriptor.
        let table = PeerTable::new();
        let id = ConnId::new(7);
        table.insert(id, "10.0.0.1:1000".to_string());
        table.remove(id);
        table.insert(id, "10.0.0.9:9000".to_string());
        assert_eq!(table.addr_of(id).as_deref(), Some("10.0.0.9:9000"));
    }
}

//! `PendingWriteRegistry` — bridges worker output back into the reactor.
//!
//! One mutex guards the whole structure; it is held only for the map
//! operation, never across I/O. The drain thread is the write side
//! (`add`), the reactor thread the read side (`submit`, `restore`,
//! `discard`, `take_armed`).

use std::collections::HashMap;
use std::sync::Mutex;

use evpoll_core::ConnId;

#[derive(Default)]
struct RegistryInner {
    /// At most one pending payload per connection.
    pending: HashMap<ConnId, Vec<u8>>,
    /// Connections with deliveries since the reactor last looked;
    /// consumed by `take_armed` when the wake fd fires.
    armed: Vec<ConnId>,
}

#[derive(Default)]
pub struct PendingWriteRegistry {
    inner: Mutex<RegistryInner>,
}

impl PendingWriteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a result for `id`, overwriting any previous entry.
    ///
    /// One in-flight response per connection: a second delivery before
    /// the first flushed replaces it (latest wins). Empty payloads are
    /// ignored — there is nothing to flush.
    pub fn add(&self, id: ConnId, payload: Vec<u8>) {
        if payload.is_empty() {
            return;
        }
        let mut inner = self.inner.lock().unwrap();
        inner.pending.insert(id, payload);
        if !inner.armed.contains(&id) {
            inner.armed.push(id);
        }
    }

    /// Atomically take and clear the entry for `id`; `None` when no
    /// result has been delivered yet.
    pub fn submit(&self, id: ConnId) -> Option<Vec<u8>> {
        self.inner.lock().unwrap().pending.remove(&id)
    }

    /// Put back the unwritten remainder after a partial flush. Unlike
    /// `add` this does not re-arm: the connection already holds write
    /// interest.
    pub fn restore(&self, id: ConnId, remainder: Vec<u8>) {
        if remainder.is_empty() {
            return;
        }
        self.inner.lock().unwrap().pending.insert(id, remainder);
    }

    /// Drop any pending payload for `id`. Called when the connection
    /// closes so nothing is ever flushed to a reused descriptor.
    pub fn discard(&self, id: ConnId) {
        let mut inner = self.inner.lock().unwrap();
        inner.pending.remove(&id);
        inner.armed.retain(|&a| a != id);
    }

    /// Connections with deliveries since the last call. The reactor
    /// upgrades their interest to include write readiness.
    pub fn take_armed(&self) -> Vec<ConnId> {
        std::mem::take(&mut self.inner.lock().unwrap().armed)
    }

    /// Connections that still hold a pending payload (shutdown flush).
    pub fn pending_ids(&self) -> Vec<ConnId> {
        self.inner.lock().unwrap().pending.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_then_submit_returns_payload_once() {
        let reg = PendingWriteRegistry::new();
        let id = ConnId::new(8);

        reg.add(id, b"response".to_vec());
        assert_eq!(reg.submit(id).as_deref(), Some(b"response".as_ref()));
        assert_eq!(reg.submit(id), None);
    }

    #[test]
    fn test_add_overwrites_latest_wins() {
        let reg = PendingWriteRegistry::new();
        let id = ConnId::new(3);

        reg.add(id, b"first".to_vec());
        reg.add(id, b"second".to_vec());
        assert_eq!(reg.submit(id).as_deref(), Some(b"second".as_ref()));
        // Overwrite must not duplicate the armed entry.
        assert_eq!(reg.take_armed(), vec![id]);
        assert!(reg.take_armed().is_empty());
    }

    #[test]
    fn test_restore_does_not_rearm() {
        let reg = PendingWriteRegistry::new();
        let id = ConnId::new(5);

        reg.add(id, b"abcdef".to_vec());
        reg.take_armed();

        let data = reg.submit(id).unwrap();
        // Partial flush of 2 bytes; the remainder goes back.
        reg.restore(id, data[2..].to_vec());

        assert!(reg.take_armed().is_empty());
        assert_eq!(reg.submit(id).as_deref(), Some(b"cdef".as_ref()));
    }

    #[test]
    fn test_discard_clears_entry_and_arming() {
        let reg = PendingWriteRegistry::new();
        let id = ConnId::new(9);

        reg.add(id, b"late".to_vec());
        reg.discard(id);

        assert_eq!(reg.submit(id), None);
        assert!(reg.take_armed().is_empty());
        assert!(reg.is_empty());
    }

    #[test]
    fn test_empty_payload_is_ignored() {
        let reg = PendingWriteRegistry::new();
        reg.add(ConnId::new(1), Vec::new());
        assert!(reg.is_empty());
        assert!(reg.take_armed().is_empty());
    }

    #[test]
    fn test_pending_ids_snapshot() {
        let reg = PendingWriteRegistry::new();
        reg.add(ConnId::new(1), b"a".to_vec());
        reg.add(ConnId::new(2), b"b".to_vec());
        let mut ids = reg.pending_ids();
        ids.sort();
        assert_eq!(ids, vec![ConnId::new(1), ConnId::new(2)]);
    }
}

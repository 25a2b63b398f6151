//! `BufferPool` — fixed-capacity pooled byte buffers.
//!
//! Buffers are checked out exclusively and returned explicitly; the pool
//! never resizes them across checkout boundaries. A *secure* pool zeroes
//! a buffer's full capacity on release, so the next checkout can never
//! observe another connection's bytes. Non-secure pools skip the wipe.
//!
//! Entries are recycled for the process lifetime; the free list only
//! grows to the high-water mark of concurrent checkouts.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Capacity of one pooled buffer: one protocol-level read chunk.
pub const DEFAULT_BUFFER_CAPACITY: usize = 8192;

pub struct BufferPool {
    capacity: usize,
    secure: bool,
    free: Mutex<Vec<Vec<u8>>>,
    /// Buffers ever allocated (for diagnostics).
    created: AtomicUsize,
    /// Buffers currently checked out.
    in_use: AtomicUsize,
}

impl BufferPool {
    pub fn new(capacity: usize, secure: bool) -> Self {
        Self {
            capacity,
            secure,
            free: Mutex::new(Vec::new()),
            created: AtomicUsize::new(0),
            in_use: AtomicUsize::new(0),
        }
    }

    /// Take a buffer of `capacity()` bytes, freshly allocated if the
    /// free list is empty. The caller owns it exclusively until
    /// `release()`.
    pub fn checkout(&self) -> Vec<u8> {
        let recycled = self.free.lock().unwrap().pop();
        self.in_use.fetch_add(1, Ordering::Relaxed);
        match recycled {
            Some(buf) => buf,
            None => {
                self.created.fetch_add(1, Ordering::Relaxed);
                vec![0u8; self.capacity]
            }
        }
    }

    /// Return a buffer to the pool. Secure pools wipe the full capacity
    /// before the buffer becomes visible to the next checkout.
    pub fn release(&self, mut buf: Vec<u8>) {
        buf.resize(self.capacity, 0);
        if self.secure {
            buf.iter_mut().for_each(|b| *b = 0);
        }
        self.free.lock().unwrap().push(buf);
        self.in_use.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Relaxed)
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY, false)
    }
}

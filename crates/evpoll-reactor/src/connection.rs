//! `Connection` — per-descriptor state and raw non-blocking transport.
//!
//! One request at a time: the connection holds a single pooled read
//! buffer for its whole lifetime and copies each burst out into an owned
//! job payload. The pending response lives in the registry, never here.
//!
//! `recv_once`/`send_once` keep the (stop, n) contract of the transport
//! layer: `stop == true` means "would block, end the loop"; a returned
//! error means the connection is beyond recovery and must close.

use std::os::fd::RawFd;
use std::time::{Duration, Instant};

use evpoll_core::{ConnId, ConnState, EvError, Result};

use crate::buffer_pool::BufferPool;
use crate::sys;

/// How a read burst ended.
#[derive(Debug, PartialEq, Eq)]
pub enum BurstEnd {
    /// Kernel buffer drained; wait for the next readiness edge.
    WouldBlock,
    /// Peer half-closed (zero-byte read).
    Eof,
    /// Transport error (errno).
    Error(i32),
}

pub struct Connection {
    fd: RawFd,
    addr: String,
    /// Pooled read scratch; len is always the pool capacity.
    read_buf: Vec<u8>,
    state: ConnState,
    last_activity: Instant,
    closed: bool,
}

impl Connection {
    /// Wrap an already non-blocking descriptor, checking a read buffer
    /// out of `pool`.
    pub fn new(fd: RawFd, addr: String, pool: &BufferPool) -> Self {
        Self {
            fd,
            addr,
            read_buf: pool.checkout(),
            state: ConnState::ReadPending,
            last_activity: Instant::now(),
            closed: false,
        }
    }

    pub fn id(&self) -> ConnId {
        ConnId::new(self.fd)
    }

    pub fn fd(&self) -> RawFd {
        self.fd
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn state(&self) -> ConnState {
        self.state
    }

    pub fn set_state(&mut self, state: ConnState) {
        self.state = state;
    }

    /// Refresh the liveness clock.
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn is_idle_for(&self, idle: Duration) -> bool {
        self.last_activity.elapsed() >= idle
    }

    /// One non-blocking read into the pooled buffer.
    ///
    /// Returns `(stop, n)`: `(true, 0)` on would-block, `(false, 0)` on
    /// peer EOF, `(false, n > 0)` with `n` fresh bytes in `read_buf`.
    pub fn recv_once(&mut self) -> Result<(bool, usize)> {
        let n = sys::sys_read(self.fd, &mut self.read_buf);
        if n < 0 {
            let err = sys::errno();
            if err == libc::EAGAIN || err == libc::EWOULDBLOCK {
                return Ok((true, 0));
            }
            return Err(EvError::Os(err));
        }
        if n > 0 {
            self.touch();
        }
        Ok((false, n as usize))
    }

    /// One non-blocking write of `data`.
    ///
    /// Returns `(stop, n)`: `(true, 0)` on would-block, `(false, n)` for
    /// `n` bytes accepted by the kernel (possibly fewer than
    /// `data.len()`).
    pub fn send_once(&mut self, data: &[u8]) -> Result<(bool, usize)> {
        if data.is_empty() {
            return Ok((false, 0));
        }
        let n = sys::sys_write(self.fd, data);
        if n < 0 {
            let err = sys::errno();
            if err == libc::EAGAIN || err == libc::EWOULDBLOCK {
                return Ok((true, 0));
            }
            return Err(EvError::Os(err));
        }
        if n == 0 {
            // Kernel took nothing; treat as backpressure.
            return Ok((true, 0));
        }
        self.touch();
        Ok((false, n as usize))
    }

    /// Drain the descriptor until it would block, accumulating every
    /// byte into one owned payload (edge-triggered contract: stop any
    /// earlier and the next edge may never be signalled).
    pub fn read_burst(&mut self) -> (Vec<u8>, BurstEnd) {
        let mut payload = Vec::new();
        loop {
            match self.recv_once() {
                Ok((true, _)) => return (payload, BurstEnd::WouldBlock),
                Ok((false, 0)) => return (payload, BurstEnd::Eof),
                Ok((false, n)) => payload.extend_from_slice(&self.read_buf[..n]),
                Err(EvError::Os(err)) => return (payload, BurstEnd::Error(err)),
                Err(_) => return (payload, BurstEnd::Error(0)),
            }
        }
    }

    /// Release the pooled buffer and close the descriptor. Idempotent:
    /// both the read path and the error path may land here.
    ///
    /// The caller must have deregistered the descriptor from the
    /// multiplexer first.
    pub fn close(&mut self, pool: &BufferPool) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.state = ConnState::Closing;
        pool.release(std::mem::take(&mut self.read_buf));
        sys::sys_close(self.fd);
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // Normal teardown goes through close(); this only catches
        // connections dropped during reactor teardown. The buffer is
        // dropped rather than returned — the pool is going away too.
        if !self.closed {
            sys::sys_close(self.fd);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::os::fd::IntoRawFd;
    use std::os::unix::net::UnixStream;

    fn pooled_conn(pool: &BufferPool) -> (Connection, UnixStream) {
        let (ours, theirs) = UnixStream::pair().unwrap();
        ours.set_nonblocking(true).unwrap();
        let fd = ours.into_raw_fd();
        (
            Connection::new(fd, "test:0".to_string(), pool),
            theirs,
        )
    }

    #[test]
    fn test_burst_drains_exactly_buffered_bytes() {
        let pool = BufferPool::new(64, false);
        let (mut conn, mut peer) = pooled_conn(&pool);

        // 150 bytes forces multiple reads through the 64-byte buffer.
        let sent: Vec<u8> = (0..150u8).collect();
        peer.write_all(&sent).unwrap();

        let (payload, end) = conn.read_burst();
        assert_eq!(end, BurstEnd::WouldBlock);
        assert_eq!(payload, sent);

        conn.close(&pool);
    }

    #[test]
    fn test_burst_reports_eof() {
        let pool = BufferPool::new(64, false);
        let (mut conn, peer) = pooled_conn(&pool);

        drop(peer);
        let (payload, end) = conn.read_burst();
        assert!(payload.is_empty());
        assert_eq!(end, BurstEnd::Eof);

        conn.close(&pool);
    }

    #[test]
    fn test_send_once_reports_backpressure() {
        let pool = BufferPool::new(64, false);
        let (mut conn, mut peer) = pooled_conn(&pool);

        // Push until the kernel buffer fills; the final call must report
        // stop without an error.
        let chunk = vec![0x5A_u8; 64 * 1024];
        let mut written = 0usize;
        let blocked = loop {
            match conn.send_once(&chunk).unwrap() {
                (true, _) => break true,
                (false, n) => {
                    written += n;
                    assert!(n > 0);
                }
            }
        };
        assert!(blocked);
        assert!(written > 0);

        // Drain the peer side and confirm every accepted byte arrived.
        peer.set_nonblocking(true).unwrap();
        let mut total = 0usize;
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            match peer.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => panic!("peer read failed: {}", e),
            }
        }
        assert_eq!(total, written);

        conn.close(&pool);
    }

    #[test]
    fn test_close_is_idempotent_and_returns_buffer() {
        let pool = BufferPool::new(64, false);
        let (mut conn, _peer) = pooled_conn(&pool);
        assert_eq!(pool.in_use(), 1);

        conn.close(&pool);
        assert_eq!(pool.in_use(), 0);
        assert!(conn.is_closed());

        // A second close must not double-release or double-close.
        conn.close(&pool);
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn test_write_to_closed_peer_errors() {
        let pool = BufferPool::new(64, false);
        let (mut conn, peer) = pooled_conn(&pool);
        drop(peer);

        // First write may succeed into the dead socket; keep writing and
        // an EPIPE/ECONNRESET-class error must surface.
        let mut saw_error = false;
        for _ in 0..4 {
            match conn.send_once(b"data") {
                Err(EvError::Os(_)) => {
                    saw_error = true;
                    break;
                }
                Err(_) => unreachable!(),
                Ok(_) => {}
            }
        }
        assert!(saw_error);

        conn.close(&pool);
    }
}

//! `Poller` — edge-triggered epoll wrapper.
//!
//! The reactor is the only user of this type: every register/modify/
//! deregister call happens on the reactor thread, so interest-set
//! mutation is single-threaded by construction.
//!
//! Interest bits are derived from [`ConnState`], never stored alongside
//! the connection; the state enumeration is the source of truth.

use std::os::fd::RawFd;

use evpoll_core::{ConnState, EvError, Result};

use crate::sys;

/// Error-class events delivered regardless of registration.
pub(crate) const EV_ERR_MASK: u32 =
    (libc::EPOLLERR | libc::EPOLLHUP | libc::EPOLLRDHUP) as u32;

pub(crate) const EV_IN: u32 = libc::EPOLLIN as u32;
pub(crate) const EV_OUT: u32 = libc::EPOLLOUT as u32;
pub(crate) const EV_ET: u32 = libc::EPOLLET as u32;

pub struct Poller {
    epfd: RawFd,
}

impl Poller {
    pub fn new() -> Result<Self> {
        let epfd = unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) };
        if epfd < 0 {
            return Err(EvError::Epoll(sys::errno()));
        }
        Ok(Self { epfd })
    }

    /// Interest bits for a connection in `state`.
    ///
    /// Edge-triggered for every open state; error-class bits are always
    /// armed so hangups surface even mid-processing.
    pub fn interest_for(state: ConnState) -> u32 {
        let mut events = 0;
        if state.wants_read() {
            events |= EV_IN | EV_ET | EV_ERR_MASK;
        }
        if state.wants_write() {
            events |= EV_OUT;
        }
        events
    }

    /// Interest bits for the listening socket: edge-triggered accept.
    pub fn listener_interest() -> u32 {
        EV_IN | EV_ET | EV_ERR_MASK
    }

    /// Interest bits for the wake eventfd: level-triggered read, so a
    /// wake that is not fully drained is re-delivered.
    pub fn wake_interest() -> u32 {
        EV_IN
    }

    pub fn add(&self, fd: RawFd, events: u32) -> Result<()> {
        self.ctl(libc::EPOLL_CTL_ADD, fd, events)
    }

    pub fn modify(&self, fd: RawFd, events: u32) -> Result<()> {
        self.ctl(libc::EPOLL_CTL_MOD, fd, events)
    }

    pub fn delete(&self, fd: RawFd) -> Result<()> {
        let ret = unsafe {
            libc::epoll_ctl(self.epfd, libc::EPOLL_CTL_DEL, fd, std::ptr::null_mut())
        };
        if ret < 0 {
            return Err(EvError::Epoll(sys::errno()));
        }
        Ok(())
    }

    fn ctl(&self, op: libc::c_int, fd: RawFd, events: u32) -> Result<()> {
        let mut ev = libc::epoll_event {
            events,
            u64: fd as u64,
        };
        let ret = unsafe { libc::epoll_ctl(self.epfd, op, fd, &mut ev) };
        if ret < 0 {
            return Err(EvError::Epoll(sys::errno()));
        }
        Ok(())
    }

    /// Block until events arrive, `timeout_ms` elapses (-1 = forever),
    /// or a signal interrupts the wait. A signal-interrupted wait is not
    /// an error; it returns 0 events so the caller can re-check its
    /// shutdown flag and wait again.
    pub fn wait(&self, events: &mut [libc::epoll_event], timeout_ms: i32) -> Result<usize> {
        let n = unsafe {
            libc::epoll_wait(
                self.epfd,
                events.as_mut_ptr(),
                events.len() as libc::c_int,
                timeout_ms,
            )
        };
        if n < 0 {
            let err = sys::errno();
            if err == libc::EINTR {
                return Ok(0);
            }
            return Err(EvError::Epoll(err));
        }
        Ok(n as usize)
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        sys::sys_close(self.epfd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::fd::AsRawFd;
    use std::os::unix::net::UnixStream;

    fn nonblocking_pair() -> (UnixStream, UnixStream) {
        let (a, b) = UnixStream::pair().unwrap();
        a.set_nonblocking(true).unwrap();
        b.set_nonblocking(true).unwrap();
        (a, b)
    }

    #[test]
    fn test_interest_derivation() {
        let read = Poller::interest_for(ConnState::ReadPending);
        assert_ne!(read & EV_IN, 0);
        assert_ne!(read & EV_ET, 0);
        assert_eq!(read & EV_OUT, 0);

        let write = Poller::interest_for(ConnState::WritePending);
        assert_ne!(write & EV_IN, 0);
        assert_ne!(write & EV_OUT, 0);

        assert_eq!(Poller::interest_for(ConnState::Closing), 0);
    }

    #[test]
    fn test_readable_event_delivered() {
        let poller = Poller::new().unwrap();
        let (a, b) = nonblocking_pair();

        poller
            .add(b.as_raw_fd(), Poller::interest_for(ConnState::ReadPending))
            .unwrap();

        sys::sys_write(a.as_raw_fd(), b"x");

        let mut events = [libc::epoll_event { events: 0, u64: 0 }; 4];
        let n = poller.wait(&mut events, 1000).unwrap();
        assert_eq!(n, 1);
        let ev_u64 = events[0].u64;
        assert_eq!(ev_u64, b.as_raw_fd() as u64);
        assert_ne!(events[0].events & EV_IN, 0);
    }

    #[test]
    fn test_modify_rearms_writable_edge() {
        // An idle socket is writable; MOD to a write-interested mask
        // must deliver a fresh EPOLLOUT edge. The registry arming path
        // depends on this.
        let poller = Poller::new().unwrap();
        let (_a, b) = nonblocking_pair();
        let fd = b.as_raw_fd();

        poller
            .add(fd, Poller::interest_for(ConnState::ReadPending))
            .unwrap();
        poller
            .modify(fd, Poller::interest_for(ConnState::WritePending))
            .unwrap();

        let mut events = [libc::epoll_event { events: 0, u64: 0 }; 4];
        let n = poller.wait(&mut events, 1000).unwrap();
        assert_eq!(n, 1);
        assert_ne!(events[0].events & EV_OUT, 0);
    }

    #[test]
    fn test_delete_stops_delivery() {
        let poller = Poller::new().unwrap();
        let (a, b) = nonblocking_pair();
        let fd = b.as_raw_fd();

        poller
            .add(fd, Poller::interest_for(ConnState::ReadPending))
            .unwrap();
        poller.delete(fd).unwrap();

        sys::sys_write(a.as_raw_fd(), b"x");

        let mut events = [libc::epoll_event { events: 0, u64: 0 }; 4];
        let n = poller.wait(&mut events, 50).unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn test_fd_registered_at_most_once() {
        let poller = Poller::new().unwrap();
        let (_a, b) = nonblocking_pair();
        let fd = b.as_raw_fd();

        poller
            .add(fd, Poller::interest_for(ConnState::ReadPending))
            .unwrap();
        // A second ADD for the same descriptor is refused (EEXIST).
        assert!(poller
            .add(fd, Poller::interest_for(ConnState::ReadPending))
            .is_err());
    }
}

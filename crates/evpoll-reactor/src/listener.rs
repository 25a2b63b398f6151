//! `Listener` — the non-blocking IPv4 accept source.
//!
//! Socket options follow the original deployment shape: address reuse
//! (both SO_REUSEADDR and SO_REUSEPORT), non-blocking mode from the
//! first syscall, configurable backlog. Accepted descriptors come back
//! already non-blocking and close-on-exec (accept4).

use std::net::Ipv4Addr;
use std::os::fd::RawFd;

use evpoll_core::{EvError, Result};

use crate::sys;

/// One attempt to accept a connection.
pub enum Accepted {
    /// New descriptor plus printable peer address "a.b.c.d:port".
    Conn(RawFd, String),
    /// Backlog drained; stop the accept loop.
    WouldBlock,
    /// Transient per-connection failure; keep draining the backlog.
    Retry(i32),
    /// The listening socket itself is broken.
    Error(i32),
}

pub struct Listener {
    fd: RawFd,
    closed: bool,
}

impl Listener {
    /// Create, configure, bind and listen.
    pub fn bind(addr: &str, port: u16, backlog: i32) -> Result<Self> {
        let ip: Ipv4Addr = addr
            .parse()
            .map_err(|_| EvError::Config("addr must be an IPv4 address"))?;

        let fd = unsafe {
            libc::socket(
                libc::AF_INET,
                libc::SOCK_STREAM | libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC,
                libc::IPPROTO_TCP,
            )
        };
        if fd < 0 {
            return Err(EvError::Socket(sys::errno()));
        }

        let listener = Self { fd, closed: false };

        listener.set_opt(libc::SO_REUSEADDR)?;
        listener.set_opt(libc::SO_REUSEPORT)?;

        let mut sa: libc::sockaddr_in = unsafe { std::mem::zeroed() };
        sa.sin_family = libc::AF_INET as libc::sa_family_t;
        sa.sin_port = port.to_be();
        sa.sin_addr.s_addr = u32::from(ip).to_be();

        let ret = unsafe {
            libc::bind(
                fd,
                &sa as *const libc::sockaddr_in as *const libc::sockaddr,
                std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
            )
        };
        if ret < 0 {
            return Err(EvError::Socket(sys::errno()));
        }

        let ret = unsafe { libc::listen(fd, backlog) };
        if ret < 0 {
            return Err(EvError::Socket(sys::errno()));
        }

        Ok(listener)
    }

    fn set_opt(&self, opt: libc::c_int) -> Result<()> {
        let one: libc::c_int = 1;
        let ret = unsafe {
            libc::setsockopt(
                self.fd,
                libc::SOL_SOCKET,
                opt,
                &one as *const libc::c_int as *const libc::c_void,
                std::mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        };
        if ret < 0 {
            return Err(EvError::Socket(sys::errno()));
        }
        Ok(())
    }

    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// Port actually bound — resolves port 0 to the kernel's choice.
    pub fn local_port(&self) -> Result<u16> {
        let mut sa: libc::sockaddr_in = unsafe { std::mem::zeroed() };
        let mut len = std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t;
        let ret = unsafe {
            libc::getsockname(
                self.fd,
                &mut sa as *mut libc::sockaddr_in as *mut libc::sockaddr,
                &mut len,
            )
        };
        if ret < 0 {
            return Err(EvError::Socket(sys::errno()));
        }
        Ok(u16::from_be(sa.sin_port))
    }

    /// Accept one pending connection; the caller loops until
    /// `WouldBlock` (edge-triggered listener).
    pub fn accept_once(&self) -> Accepted {
        let mut sa: libc::sockaddr_in = unsafe { std::mem::zeroed() };
        let mut len = std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t;

        let cfd = unsafe {
            libc::accept4(
                self.fd,
                &mut sa as *mut libc::sockaddr_in as *mut libc::sockaddr,
                &mut len,
                libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC,
            )
        };
        if cfd < 0 {
            let err = sys::errno();
            return match err {
                libc::EAGAIN => Accepted::WouldBlock,
                // The peer vanished between backlog and accept.
                libc::ECONNABORTED | libc::EINTR => Accepted::Retry(err),
                _ => Accepted::Error(err),
            };
        }

        let ip = Ipv4Addr::from(u32::from_be(sa.sin_addr.s_addr));
        let port = u16::from_be(sa.sin_port);
        Accepted::Conn(cfd, format!("{}:{}", ip, port))
    }

    /// Release the listening socket. Idempotent.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            sys::sys_close(self.fd);
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.close();
    }
}

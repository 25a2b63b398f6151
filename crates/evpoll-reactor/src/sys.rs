//! Thin wrappers over the raw syscalls the reactor drives.
//!
//! Transport calls (`read`/`write`) keep the raw isize-or-negative
//! convention so callers can distinguish EAGAIN from fatal errnos;
//! setup calls return `Result` with the errno captured.

use std::os::fd::RawFd;

use evpoll_core::{EvError, Result};

#[inline]
pub(crate) fn errno() -> i32 {
    unsafe { *libc::__errno_location() }
}

pub(crate) fn sys_read(fd: RawFd, buf: &mut [u8]) -> isize {
    unsafe { libc::read(fd, buf.as_mut_ptr() as *mut _, buf.len()) }
}

pub(crate) fn sys_write(fd: RawFd, buf: &[u8]) -> isize {
    unsafe { libc::write(fd, buf.as_ptr() as *const _, buf.len()) }
}

pub(crate) fn sys_close(fd: RawFd) {
    unsafe { libc::close(fd) };
}

/// Fetch and clear the socket's pending error (SO_ERROR).
///
/// Best-effort: returns 0 when the query itself fails.
pub(crate) fn socket_error(fd: RawFd) -> i32 {
    let mut err: libc::c_int = 0;
    let mut len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;
    let ret = unsafe {
        libc::getsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_ERROR,
            &mut err as *mut _ as *mut libc::c_void,
            &mut len,
        )
    };
    if ret < 0 {
        0
    } else {
        err
    }
}

/// Create a non-blocking, close-on-exec eventfd.
pub(crate) fn sys_eventfd() -> Result<RawFd> {
    let fd = unsafe { libc::eventfd(0, libc::EFD_NONBLOCK | libc::EFD_CLOEXEC) };
    if fd < 0 {
        return Err(EvError::EventFd(errno()));
    }
    Ok(fd)
}

//! evpoll error types.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvError {
    /// Listener socket setup failed (socket/setsockopt/bind/listen).
    Socket(i32),
    /// epoll_create/epoll_ctl failed.
    Epoll(i32),
    /// eventfd creation or signalling failed.
    EventFd(i32),
    /// Worker pool input queue is full (Reject overload policy).
    QueueFull,
    /// Component is shutting down and refuses new work.
    ShuttingDown,
    /// The referenced connection is closed or unknown.
    ConnClosed,
    /// Invalid configuration value.
    Config(&'static str),
    /// OS error with errno.
    Os(i32),
}

impl fmt::Display for EvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Socket(e) => write!(f, "listener setup: errno {}", e),
            Self::Epoll(e) => write!(f, "epoll: errno {}", e),
            Self::EventFd(e) => write!(f, "eventfd: errno {}", e),
            Self::QueueFull => write!(f, "worker queue full"),
            Self::ShuttingDown => write!(f, "shutting down"),
            Self::ConnClosed => write!(f, "connection closed"),
            Self::Config(msg) => write!(f, "config: {}", msg),
            Self::Os(e) => write!(f, "OS error: errno {}", e),
        }
    }
}

impl std::error::Error for EvError {}

pub type Result<T> = std::result::Result<T, EvError>;

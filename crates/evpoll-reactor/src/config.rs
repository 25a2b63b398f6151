//! Server configuration

use std::time::Duration;

use evpoll_core::env::{env_get, env_get_bool};
use evpoll_core::{EvError, Result};

use crate::buffer_pool::DEFAULT_BUFFER_CAPACITY;

/// What to do when the worker input queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverloadPolicy {
    /// Block the reactor's submit until a slot frees up. Simple and
    /// lossless, but the I/O loop stalls under sustained overload —
    /// every connection waits behind the full queue.
    Block,
    /// Drop the job and deliver the handler's busy response instead.
    Reject,
}

/// Configuration for one reactor instance.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// IPv4 address to bind.
    pub addr: String,

    /// TCP port; 0 picks an ephemeral port (tests).
    pub port: u16,

    /// Listen backlog depth.
    pub backlog: i32,

    /// Number of worker threads (defaults to min(8, nproc/2)).
    pub workers: usize,

    /// Capacity of the job and result queues.
    pub queue_depth: usize,

    /// Capacity of each pooled read buffer.
    pub buffer_capacity: usize,

    /// Zero buffers on release (cross-connection leakage guard).
    pub secure_pool: bool,

    /// Behavior when the job queue is full.
    pub overload: OverloadPolicy,

    /// Liveness clock thresholds, recorded on each connection. No sweep
    /// runs them; callers may via `Connection::is_idle_for`.
    pub read_timeout: Duration,
    pub write_timeout: Duration,

    /// Events drained per multiplexer wake.
    pub max_events: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0".to_string(),
            port: 8080,
            backlog: 2048,
            workers: auto_workers(),
            queue_depth: 1024,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            secure_pool: false,
            overload: OverloadPolicy::Block,
            read_timeout: Duration::from_secs(1),
            write_timeout: Duration::from_secs(1),
            max_events: 1024,
        }
    }
}

/// Default worker sizing: min(8, nproc/2), at least 2.
pub fn auto_workers() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);
    (cpus / 2).clamp(2, 8)
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with `EV_*` environment overrides applied.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(addr) = std::env::var("EV_ADDR") {
            cfg.addr = addr;
        }
        cfg.port = env_get("EV_PORT", cfg.port);
        cfg.backlog = env_get("EV_BACKLOG", cfg.backlog);
        cfg.workers = env_get("EV_WORKERS", cfg.workers);
        cfg.queue_depth = env_get("EV_QUEUE_DEPTH", cfg.queue_depth);
        cfg.buffer_capacity = env_get("EV_BUFFER_CAPACITY", cfg.buffer_capacity);
        cfg.secure_pool = env_get_bool("EV_SECURE_POOL", cfg.secure_pool);
        cfg
    }

    pub fn addr(mut self, addr: &str) -> Self {
        self.addr = addr.to_string();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn backlog(mut self, backlog: i32) -> Self {
        self.backlog = backlog;
        self
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.workers = n;
        self
    }

    pub fn queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth;
        self
    }

    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    pub fn secure_pool(mut self, secure: bool) -> Self {
        self.secure_pool = secure;
        self
    }

    pub fn overload(mut self, policy: OverloadPolicy) -> Self {
        self.overload = policy;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.addr.parse::<std::net::Ipv4Addr>().is_err() {
            return Err(EvError::Config("addr must be an IPv4 address"));
        }
        if self.workers == 0 {
            return Err(EvError::Config("workers must be at least 1"));
        }
        if self.queue_depth == 0 {
            return Err(EvError::Config("queue_depth must be at least 1"));
        }
        if self.buffer_capacity < 512 {
            return Err(EvError::Config("buffer_capacity must be at least 512"));
        }
        if self.backlog < 1 {
            return Err(EvError::Config("backlog must be at least 1"));
        }
        if self.max_events == 0 {
            return Err(EvError::Config("max_events must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(ServerConfig::default().validate().is_ok());
        assert!(auto_workers() >= 2);
    }

    #[test]
    fn test_builder_chain() {
        let cfg = ServerConfig::new()
            .addr("127.0.0.1")
            .port(0)
            .workers(3)
            .queue_depth(16)
            .secure_pool(true)
            .overload(OverloadPolicy::Reject);
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.workers, 3);
        assert_eq!(cfg.overload, OverloadPolicy::Reject);
        assert!(cfg.secure_pool);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(ServerConfig::new().addr("localhost").validate().is_err());
        assert!(ServerConfig::new().workers(0).validate().is_err());
        assert!(ServerConfig::new().queue_depth(0).validate().is_err());
        assert!(ServerConfig::new().buffer_capacity(16).validate().is_err());
        assert!(ServerConfig::new().backlog(0).validate().is_err());
    }
}

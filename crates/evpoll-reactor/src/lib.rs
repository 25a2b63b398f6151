//! # evpoll-reactor — The epoll-driven server core
//!
//! Default implementations for every evpoll component:
//!
//! | Component           | Type                  | Role                                   |
//! |---------------------|-----------------------|----------------------------------------|
//! | Readiness mux       | `Poller`              | edge-triggered epoll wrapper           |
//! | Listener            | `Listener`            | non-blocking IPv4 TCP accept source    |
//! | Buffer allocator    | `BufferPool`          | fixed-capacity pooled buffers          |
//! | Per-fd state        | `Connection`          | non-blocking recv/send + lifecycle     |
//! | Result bridge       | `PendingWriteRegistry`| conn → one pending payload             |
//! | Wake path           | `WakeFd`              | eventfd `Notifier` impl                |
//! | Job execution       | `WorkerPool`          | N workers + 1 drain over bounded queues|
//! | Event loop          | `Reactor`             | owns the mux and all transitions       |
//!
//! One reactor thread drives all interest-set mutation; workers touch
//! only the job/result queues, the peer table and (via the drain thread)
//! the registry. See `Reactor` for the full data flow.

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        pub(crate) mod sys;
        pub mod buffer_pool;
        pub mod config;
        pub mod connection;
        pub mod listener;
        pub mod poller;
        pub mod reactor;
        pub mod registry;
        pub mod wakeup;
        pub mod worker;

        pub use buffer_pool::BufferPool;
        pub use config::{OverloadPolicy, ServerConfig};
        pub use connection::Connection;
        pub use listener::Listener;
        pub use poller::Poller;
        pub use reactor::{Reactor, ReactorStats};
        pub use registry::PendingWriteRegistry;
        pub use wakeup::WakeFd;
        pub use worker::WorkerPool;
    } else {
        compile_error!("evpoll-reactor is built on epoll and requires Linux");
    }
}

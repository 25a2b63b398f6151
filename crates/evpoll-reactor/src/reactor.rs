//! `Reactor` — the event loop that owns every connection transition.
//!
//! Data flow:
//!
//! ```text
//! accept ─► conn table + read interest (edge-triggered)
//! readable ─► drain burst ─► Job ─► worker pool           (reactor moves on)
//! worker ─► Outbound ─► drain thread ─► registry ─► wake fd
//! wake ─► arm write interest for delivered connections
//! writable ─► registry.submit ─► flush loop ─► read-only interest
//!             └─ partial: remainder back to registry, stay write-armed
//! ```
//!
//! The reactor thread is the only mutator of the connection table and
//! of epoll interest sets. A writable event with no registry entry is
//! skipped outright — the wake fd re-arms the connection when its
//! result lands, so nothing spins.
//!
//! Close discipline, on every path: deregister from epoll, drop the
//! peer-table entry and any registry entry, then close the descriptor —
//! an event can never be delivered for a reused fd number.

use std::collections::HashMap;
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use evpoll_core::{
    evdebug, evinfo, evtrace, evwarn, ConnId, ConnState, EvError, Handler, Job, Notifier,
    PeerTable, Result,
};

use crate::buffer_pool::BufferPool;
use crate::config::ServerConfig;
use crate::connection::{BurstEnd, Connection};
use crate::listener::{Accepted, Listener};
use crate::poller::{Poller, EV_ERR_MASK, EV_IN, EV_OUT};
use crate::registry::PendingWriteRegistry;
use crate::sys;
use crate::wakeup::WakeFd;
use crate::worker::WorkerPool;

/// Counter snapshot; maintained by the reactor thread only.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReactorStats {
    pub accepts: u64,
    pub jobs_submitted: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub closes: u64,
    pub errors: u64,
}

impl ReactorStats {
    pub fn print(&self, live_conns: usize) {
        evinfo!(
            "conns={} accepts={} jobs={} bytes_in={} bytes_out={} closes={} errors={}",
            live_conns,
            self.accepts,
            self.jobs_submitted,
            self.bytes_in,
            self.bytes_out,
            self.closes,
            self.errors,
        );
    }
}

/// How a write flush attempt ended (internal).
enum FlushOutcome {
    Done(usize),
    Blocked(usize),
    Fatal(i32),
    Gone,
}

pub struct Reactor {
    cfg: ServerConfig,
    poller: Poller,
    listener: Listener,
    wake: Arc<WakeFd>,
    pool: BufferPool,
    registry: Arc<PendingWriteRegistry>,
    peers: Arc<PeerTable>,
    workers: Option<WorkerPool>,
    conns: HashMap<RawFd, Connection>,
    shutdown: Arc<AtomicBool>,
    stats: ReactorStats,
}

impl Reactor {
    /// Build the full pipeline: listener, poller, buffer pool, registry,
    /// wake fd and worker pool, all owned here (no process globals).
    pub fn new(
        cfg: ServerConfig,
        handler: Arc<dyn Handler>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self> {
        cfg.validate()?;

        let listener = Listener::bind(&cfg.addr, cfg.port, cfg.backlog)?;
        let poller = Poller::new()?;
        let wake = Arc::new(WakeFd::create()?);
        let registry = Arc::new(PendingWriteRegistry::new());
        let peers = Arc::new(PeerTable::new());
        let pool = BufferPool::new(cfg.buffer_capacity, cfg.secure_pool);

        let workers = WorkerPool::new(
            cfg.workers,
            cfg.queue_depth,
            cfg.overload,
            handler,
            Arc::clone(&peers),
            Arc::clone(&registry),
            Arc::clone(&wake) as Arc<dyn Notifier>,
        );

        poller.add(listener.fd(), Poller::listener_interest())?;
        poller.add(wake.fd(), Poller::wake_interest())?;

        Ok(Self {
            cfg,
            poller,
            listener,
            wake,
            pool,
            registry,
            peers,
            workers: Some(workers),
            conns: HashMap::new(),
            shutdown,
            stats: ReactorStats::default(),
        })
    }

    /// Port actually bound (resolves port 0).
    pub fn local_port(&self) -> Result<u16> {
        self.listener.local_port()
    }

    /// Shared live-connection view (id → printable address).
    pub fn peers(&self) -> Arc<PeerTable> {
        Arc::clone(&self.peers)
    }

    pub fn stats(&self) -> ReactorStats {
        self.stats
    }

    /// Run until the shutdown flag is set, then drain and tear down.
    ///
    /// The wait blocks indefinitely — the workload is purely I/O
    /// driven. A signal interrupting the wait returns zero events, so
    /// the flag is observed on the next iteration.
    pub fn run(&mut self) -> Result<()> {
        evinfo!(
            "listening on {}:{} ({} workers, queue depth {})",
            self.cfg.addr,
            self.local_port()?,
            self.cfg.workers,
            self.cfg.queue_depth,
        );

        let mut events =
            vec![libc::epoll_event { events: 0, u64: 0 }; self.cfg.max_events];

        while !self.shutdown.load(Ordering::Relaxed) {
            let n = self.poller.wait(&mut events, -1)?;
            for ev in &events[..n] {
                let fd = ev.u64 as RawFd;
                let mask = ev.events;

                if fd == self.listener.fd() {
                    self.accept_burst();
                    continue;
                }
                if fd == self.wake.fd() {
                    self.wake.drain();
                    self.arm_writers();
                    continue;
                }
                if mask & EV_ERR_MASK != 0 {
                    self.on_hangup(fd, mask);
                    continue;
                }
                if mask & EV_IN != 0 {
                    self.on_readable(fd);
                }
                if mask & EV_OUT != 0 {
                    self.on_writable(fd);
                }
            }
        }

        self.graceful_shutdown()
    }

    /// Drain the accept backlog until it would block.
    fn accept_burst(&mut self) {
        loop {
            match self.listener.accept_once() {
                Accepted::Conn(cfd, addr) => {
                    if let Err(e) =
                        self.poller.add(cfd, Poller::interest_for(ConnState::ReadPending))
                    {
                        evwarn!("fd={} register failed: {}", cfd, e);
                        sys::sys_close(cfd);
                        self.stats.errors += 1;
                        continue;
                    }
                    evdebug!("fd={} connected from {}", cfd, addr);
                    self.peers.insert(ConnId::new(cfd), addr.clone());
                    self.conns
                        .insert(cfd, Connection::new(cfd, addr, &self.pool));
                    self.stats.accepts += 1;
                }
                Accepted::WouldBlock => break,
                Accepted::Retry(err) => {
                    evtrace!("accept retry: errno {}", err);
                    continue;
                }
                Accepted::Error(err) => {
                    evwarn!("accept failed: errno {}", err);
                    self.stats.errors += 1;
                    break;
                }
            }
        }
    }

    /// Drain the descriptor, copy the burst out, hand it to the pool.
    fn on_readable(&mut self, fd: RawFd) {
        let (id, payload, end) = match self.conns.get_mut(&fd) {
            Some(conn) => {
                let (payload, end) = conn.read_burst();
                (conn.id(), payload, end)
            }
            None => return,
        };
        self.stats.bytes_in += payload.len() as u64;

        match end {
            BurstEnd::WouldBlock => {
                if payload.is_empty() {
                    return;
                }
                if let Some(conn) = self.conns.get_mut(&fd) {
                    conn.set_state(ConnState::ProcessingPending);
                }
                let workers = self.workers.as_ref().expect("worker pool torn down");
                match workers.submit(Job::new(id, payload)) {
                    Ok(()) => self.stats.jobs_submitted += 1,
                    Err(EvError::QueueFull) => {
                        // Reject policy: the busy response arrives
                        // through the registry like any result.
                        evwarn!("conn {} rejected: queue full", id);
                        self.stats.errors += 1;
                        if let Some(conn) = self.conns.get_mut(&fd) {
                            conn.set_state(ConnState::ReadPending);
                        }
                    }
                    Err(e) => {
                        evwarn!("conn {} job dropped: {}", id, e);
                        self.stats.errors += 1;
                    }
                }
            }
            BurstEnd::Eof => {
                evdebug!("conn {} closed by peer", id);
                self.close_conn(fd);
            }
            BurstEnd::Error(err) => {
                evdebug!("conn {} read error: errno {}", id, err);
                self.stats.errors += 1;
                self.close_conn(fd);
            }
        }
    }

    /// Flush the pending payload for a writable connection.
    ///
    /// No registry entry means the worker has not produced the result
    /// yet: skip the descriptor — the wake fd re-arms it on delivery.
    fn on_writable(&mut self, fd: RawFd) {
        let id = ConnId::new(fd);
        let mut data = match self.registry.submit(id) {
            Some(data) => data,
            None => return,
        };

        let outcome = match self.conns.get_mut(&fd) {
            Some(conn) => {
                let mut written = 0usize;
                loop {
                    if written == data.len() {
                        break FlushOutcome::Done(written);
                    }
                    match conn.send_once(&data[written..]) {
                        Ok((true, _)) => break FlushOutcome::Blocked(written),
                        Ok((false, n)) => written += n,
                        Err(EvError::Os(err)) => break FlushOutcome::Fatal(err),
                        Err(_) => break FlushOutcome::Fatal(0),
                    }
                }
            }
            None => FlushOutcome::Gone,
        };

        match outcome {
            FlushOutcome::Done(n) => {
                self.stats.bytes_out += n as u64;
                if let Some(conn) = self.conns.get_mut(&fd) {
                    conn.set_state(ConnState::ReadPending);
                }
                if let Err(e) = self
                    .poller
                    .modify(fd, Poller::interest_for(ConnState::ReadPending))
                {
                    evwarn!("conn {} downgrade failed: {}", id, e);
                    self.close_conn(fd);
                }
            }
            FlushOutcome::Blocked(n) => {
                self.stats.bytes_out += n as u64;
                // Keep write interest; retry on the next edge.
                self.registry.restore(id, data.split_off(n));
            }
            FlushOutcome::Fatal(err) => {
                evdebug!("conn {} write error: errno {}", id, err);
                self.stats.errors += 1;
                self.close_conn(fd);
            }
            FlushOutcome::Gone => {}
        }
    }

    /// Error-class event: fetch the socket error best-effort, log, close.
    fn on_hangup(&mut self, fd: RawFd, mask: u32) {
        if !self.conns.contains_key(&fd) {
            return;
        }
        let soerr = sys::socket_error(fd);
        evdebug!("fd={} hangup mask=0x{:x} soerr={}", fd, mask, soerr);
        if mask & (libc::EPOLLERR as u32) != 0 {
            self.stats.errors += 1;
        }
        self.close_conn(fd);
    }

    /// Upgrade interest for every connection the drain thread delivered
    /// a result for. MOD on an already-writable socket yields a fresh
    /// EPOLLOUT edge, so the flush happens on this same loop iteration's
    /// wait or the next.
    fn arm_writers(&mut self) {
        for id in self.registry.take_armed() {
            let fd = id.as_raw();
            let live = match self.conns.get_mut(&fd) {
                Some(conn) if !conn.state().is_closing() => {
                    conn.set_state(ConnState::WritePending);
                    true
                }
                _ => false,
            };
            if !live {
                // Result for a connection that died in the meantime.
                self.registry.discard(id);
                continue;
            }
            if let Err(e) = self
                .poller
                .modify(fd, Poller::interest_for(ConnState::WritePending))
            {
                evwarn!("conn {} write-arm failed: {}", id, e);
                self.close_conn(fd);
            }
        }
    }

    /// Deregister, scrub shared tables, release buffers, close the fd.
    fn close_conn(&mut self, fd: RawFd) {
        let mut conn = match self.conns.remove(&fd) {
            Some(conn) => conn,
            None => return,
        };
        let id = conn.id();
        self.peers.remove(id);
        self.registry.discard(id);
        let _ = self.poller.delete(fd);
        conn.close(&self.pool);
        self.stats.closes += 1;
    }

    /// Stop accepting, drain every in-flight job to a result, flush
    /// what can be flushed without blocking, close everything.
    fn graceful_shutdown(&mut self) -> Result<()> {
        let workers = self.workers.take().expect("worker pool torn down");
        evinfo!(
            "shutting down: {} queued jobs, {} live conns",
            workers.queued(),
            self.conns.len(),
        );

        let _ = self.poller.delete(self.listener.fd());
        self.listener.close();

        // Barrier: every accepted job reaches the registry (or its
        // handler produced nothing) before any descriptor closes.
        workers.shutdown();
        self.wake.drain();

        // Best-effort flush of completed responses, then close.
        for id in self.registry.pending_ids() {
            self.on_writable(id.as_raw());
        }
        let fds: Vec<RawFd> = self.conns.keys().copied().collect();
        for fd in fds {
            self.close_conn(fd);
        }

        self.stats.print(self.conns.len());
        Ok(())
    }
}

//! `WorkerPool` — fixed worker threads plus one drain thread.
//!
//! Workers dequeue jobs from a bounded MPMC queue, run the injected
//! `Handler`, and push each `Outbound` to the result queue. The single
//! drain thread moves results into the `PendingWriteRegistry` and
//! signals the reactor's wake fd — so registry writes are serialized on
//! one thread while the reactor does the read side under the same lock.
//!
//! Shutdown is an ordered barrier: refuse new jobs → workers finish the
//! queue and exit → join workers → drain thread empties the result
//! queue → join drain. No result produced before shutdown is lost.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_queue::ArrayQueue;

use evpoll_core::{evwarn, EvError, Handler, Job, Notifier, Outbound, PeerTable, Result};

use crate::config::OverloadPolicy;
use crate::registry::PendingWriteRegistry;

const IDLE_PARK: Duration = Duration::from_millis(1);

/// Shared state between the reactor, workers and the drain thread.
struct PoolInner {
    /// Job queue: reactor → workers.
    jobs: ArrayQueue<Job>,
    /// Result queue: workers → drain.
    results: ArrayQueue<Outbound>,
    /// Set by shutdown(): no new jobs; workers exit once `jobs` drains.
    draining: AtomicBool,
    /// Set after the workers are joined; drain exits once `results`
    /// drains.
    stop_drain: AtomicBool,
    /// Workers currently inside the handler.
    active: AtomicUsize,
    /// Jobs fully processed (diagnostics).
    completed: AtomicU64,
}

pub struct WorkerPool {
    inner: Arc<PoolInner>,
    handler: Arc<dyn Handler>,
    policy: OverloadPolicy,
    workers: Vec<thread::JoinHandle<()>>,
    drain: Option<thread::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `n` workers and the drain thread.
    ///
    /// `queue_depth` bounds both queues; a full job queue is the
    /// backpressure point (see [`OverloadPolicy`]).
    pub fn new(
        n: usize,
        queue_depth: usize,
        policy: OverloadPolicy,
        handler: Arc<dyn Handler>,
        peers: Arc<PeerTable>,
        registry: Arc<PendingWriteRegistry>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let n = n.clamp(1, 64);
        let inner = Arc::new(PoolInner {
            jobs: ArrayQueue::new(queue_depth),
            results: ArrayQueue::new(queue_depth),
            draining: AtomicBool::new(false),
            stop_drain: AtomicBool::new(false),
            active: AtomicUsize::new(0),
            completed: AtomicU64::new(0),
        });

        let mut workers = Vec::with_capacity(n);
        for worker_id in 0..n {
            let inner = Arc::clone(&inner);
            let handler = Arc::clone(&handler);
            let peers = Arc::clone(&peers);
            let handle = thread::Builder::new()
                .name(format!("ev-worker-{}", worker_id))
                .spawn(move || worker_loop(inner, handler, peers))
                .expect("failed to spawn worker thread");
            workers.push(handle);
        }

        let drain = {
            let inner = Arc::clone(&inner);
            thread::Builder::new()
                .name("ev-drain".to_string())
                .spawn(move || drain_loop(inner, registry, notifier))
                .expect("failed to spawn drain thread")
        };

        WorkerPool {
            inner,
            handler,
            policy,
            workers,
            drain: Some(drain),
        }
    }

    /// Hand a job to the pool.
    ///
    /// `Block` policy: waits for a queue slot (the reactor stalls under
    /// sustained overload — deliberate, lossless backpressure).
    /// `Reject` policy: returns `QueueFull` immediately and routes the
    /// handler's busy response through the normal result path.
    pub fn submit(&self, job: Job) -> Result<()> {
        if self.inner.draining.load(Ordering::Relaxed) {
            return Err(EvError::ShuttingDown);
        }
        match self.policy {
            OverloadPolicy::Block => {
                let mut job = job;
                loop {
                    match self.inner.jobs.push(job) {
                        Ok(()) => return Ok(()),
                        Err(rejected) => {
                            if self.inner.draining.load(Ordering::Relaxed) {
                                return Err(EvError::ShuttingDown);
                            }
                            job = rejected;
                            thread::park_timeout(IDLE_PARK);
                        }
                    }
                }
            }
            OverloadPolicy::Reject => match self.inner.jobs.push(job) {
                Ok(()) => Ok(()),
                Err(rejected) => {
                    if let Some(busy) = self.handler.busy_response() {
                        push_result(&self.inner, Outbound::new(rejected.conn, busy));
                    }
                    Err(EvError::QueueFull)
                }
            },
        }
    }

    /// Jobs waiting in the input queue.
    pub fn queued(&self) -> usize {
        self.inner.jobs.len()
    }

    /// Workers currently inside the handler.
    pub fn active_workers(&self) -> usize {
        self.inner.active.load(Ordering::Relaxed)
    }

    /// Jobs fully processed since startup.
    pub fn completed(&self) -> u64 {
        self.inner.completed.load(Ordering::Relaxed)
    }

    /// Drain in-flight jobs to completion, then tear the pool down.
    ///
    /// Blocks until every job enqueued before the call has reached the
    /// registry (or its handler produced no output). The caller must
    /// have stopped submitting first; `submit` refuses new jobs from
    /// the moment this starts.
    pub fn shutdown(mut self) {
        self.inner.draining.store(true, Ordering::SeqCst);
        for handle in self.workers.drain(..) {
            handle.thread().unpark();
            let _ = handle.join();
        }
        // Workers are gone: nothing produces results anymore.
        self.inner.stop_drain.store(true, Ordering::SeqCst);
        if let Some(handle) = self.drain.take() {
            handle.thread().unpark();
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // shutdown() is the orderly path (drain, then join). This only
        // covers a pool dropped without it, e.g. on startup failure:
        // flag the threads down and let them exit on their next poll.
        self.inner.draining.store(true, Ordering::SeqCst);
        self.inner.stop_drain.store(true, Ordering::SeqCst);
    }
}

fn worker_loop(inner: Arc<PoolInner>, handler: Arc<dyn Handler>, peers: Arc<PeerTable>) {
    loop {
        match inner.jobs.pop() {
            Some(job) => {
                inner.active.fetch_add(1, Ordering::Relaxed);
                let outs = handler.handle(job, &peers);
                inner.active.fetch_sub(1, Ordering::Relaxed);
                inner.completed.fetch_add(1, Ordering::Relaxed);
                for out in outs {
                    push_result(&inner, out);
                }
            }
            None => {
                if inner.draining.load(Ordering::Relaxed) {
                    break;
                }
                thread::park_timeout(IDLE_PARK);
            }
        }
    }
}

/// Push a result, spin-retrying while the drain thread catches up.
fn push_result(inner: &PoolInner, out: Outbound) {
    let mut out = out;
    let mut retries = 0u32;
    while let Err(rejected) = inner.results.push(out) {
        out = rejected;
        retries += 1;
        if retries > 10_000 {
            evwarn!(
                "result queue full, dropping {} bytes for conn {}",
                out.payload.len(),
                out.conn
            );
            return;
        }
        std::hint::spin_loop();
    }
}

fn drain_loop(
    inner: Arc<PoolInner>,
    registry: Arc<PendingWriteRegistry>,
    notifier: Arc<dyn Notifier>,
) {
    loop {
        match inner.results.pop() {
            Some(out) => {
                registry.add(out.conn, out.payload);
                let _ = notifier.notify();
            }
            None => {
                if inner.stop_drain.load(Ordering::Relaxed) {
                    break;
                }
                thread::park_timeout(IDLE_PARK);
            }
        }
    }
}

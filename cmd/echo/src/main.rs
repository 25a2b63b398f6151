//! evpoll Echo Server
//!
//! Every burst of bytes a connection sends comes straight back to it,
//! through the full pipeline: reactor → worker pool → registry → flush.
//!
//! Usage:
//!     ev-echo [--addr 0.0.0.0] [--port 9000] [--workers N]
//!
//! Test with:
//!     echo "hello" | nc localhost 9000

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use evpoll_core::{everror, Handler, Job, Outbound, PeerTable};
use evpoll_reactor::{Reactor, ServerConfig};

use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};

struct EchoHandler;

impl Handler for EchoHandler {
    fn handle(&self, job: Job, _peers: &PeerTable) -> Vec<Outbound> {
        vec![Outbound::new(job.conn, job.payload)]
    }
}

static SHUTDOWN: OnceLock<Arc<AtomicBool>> = OnceLock::new();

extern "C" fn on_signal(_sig: libc::c_int) {
    if let Some(flag) = SHUTDOWN.get() {
        flag.store(true, Ordering::SeqCst);
    }
}

/// SIGINT/SIGTERM set the flag. No SA_RESTART: the blocked epoll_wait
/// must return EINTR so the run loop observes the flag.
fn install_signal_handlers() {
    let action = SigAction::new(
        SigHandler::Handler(on_signal),
        SaFlags::empty(),
        SigSet::empty(),
    );
    unsafe {
        let _ = signal::sigaction(Signal::SIGINT, &action);
        let _ = signal::sigaction(Signal::SIGTERM, &action);
    }
}

fn parse_args(mut cfg: ServerConfig) -> ServerConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--addr" if i + 1 < args.len() => {
                cfg.addr = args[i + 1].clone();
                i += 2;
            }
            "--port" if i + 1 < args.len() => {
                cfg.port = args[i + 1].parse().unwrap_or(cfg.port);
                i += 2;
            }
            "--workers" if i + 1 < args.len() => {
                cfg.workers = args[i + 1].parse().unwrap_or(cfg.workers);
                i += 2;
            }
            other => {
                eprintln!("ev-echo: unknown argument {}", other);
                eprintln!("usage: ev-echo [--addr A] [--port P] [--workers N]");
                std::process::exit(2);
            }
        }
    }
    cfg
}

fn main() {
    let cfg = parse_args(ServerConfig::from_env().port(9000));

    let shutdown = SHUTDOWN
        .get_or_init(|| Arc::new(AtomicBool::new(false)))
        .clone();
    install_signal_handlers();

    let mut reactor = match Reactor::new(cfg, Arc::new(EchoHandler), shutdown) {
        Ok(reactor) => reactor,
        Err(e) => {
            everror!("ev-echo: startup failed: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = reactor.run() {
        everror!("ev-echo: reactor failed: {}", e);
        std::process::exit(1);
    }
}

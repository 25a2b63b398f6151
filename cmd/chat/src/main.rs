//! evpoll Chat Server
//!
//! Broadcast semantics: a message from one connection is delivered to
//! every other live connection, prefixed with the sender's address
//! ("a.b.c.d:port: message"). The sender receives nothing back.
//!
//! Usage:
//!     ev-chat [--addr 0.0.0.0] [--port 9100] [--workers N]
//!
//! Test with two terminals:
//!     nc localhost 9100   # in each; type in one, read in the other

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use evpoll_core::{everror, Handler, Job, Outbound, PeerTable};
use evpoll_reactor::{Reactor, ServerConfig};

use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};

struct ChatHandler;

impl Handler for ChatHandler {
    fn handle(&self, job: Job, peers: &PeerTable) -> Vec<Outbound> {
        // Sender may already be gone by the time the job runs.
        let from = match peers.addr_of(job.conn) {
            Some(addr) => addr,
            None => return Vec::new(),
        };

        let mut msg = Vec::with_capacity(from.len() + 2 + job.payload.len());
        msg.extend_from_slice(from.as_bytes());
        msg.extend_from_slice(b": ");
        msg.extend_from_slice(&job.payload);

        peers
            .snapshot()
            .into_iter()
            .filter(|peer| peer.id != job.conn)
            .map(|peer| Outbound::new(peer.id, msg.clone()))
            .collect()
    }
}

static SHUTDOWN: OnceLock<Arc<AtomicBool>> = OnceLock::new();

extern "C" fn on_signal(_sig: libc::c_int) {
    if let Some(flag) = SHUTDOWN.get() {
        flag.store(true, Ordering::SeqCst);
    }
}

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
                eprintln!("ev-chat: unknown argument {}", other);
                eprintln!("usage: ev-chat [--addr A] [--port P] [--workers N]");
                std::process::exit(2);
            }
        }
    }
    cfg
}

fn main() {
    let cfg = parse_args(ServerConfig::from_env().port(9100));

    let shutdown = SHUTDOWN
        .get_or_init(|| Arc::new(AtomicBool::new(false)))
        .clone();
    install_signal_handlers();

    let mut reactor = match Reactor::new(cfg, Arc::new(ChatHandler), shutdown) {
        Ok(reactor) => reactor,
        Err(e) => {
            everror!("ev-chat: startup failed: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = reactor.run() {
        everror!("ev-chat: reactor failed: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_three_way_broadcast() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let cfg = ServerConfig::new().addr("127.0.0.1").port(0).workers(2);
        let mut reactor =
            Reactor::new(cfg, Arc::new(ChatHandler), Arc::clone(&shutdown)).unwrap();
        let port = reactor.local_port().unwrap();
        let server = thread::spawn(move || reactor.run().unwrap());

        let connect = || {
            let s = TcpStream::connect(("127.0.0.1", port)).unwrap();
            s.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
            s
        };
        let mut a = connect();
        let mut b = connect();
        let mut c = connect();
        let a_addr = format!("127.0.0.1:{}", a.local_addr().unwrap().port());

        // All three must be in the peer table before the broadcast.
        thread::sleep(Duration::from_millis(50));
        a.write_all(b"hi").unwrap();

        let expected = format!("{}: hi", a_addr).into_bytes();
        let mut buf = vec![0u8; 128];

        let n = b.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], &expected[..]);
        let n = c.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], &expected[..]);

        // The sender hears nothing.
        a.set_read_timeout(Some(Duration::from_millis(100))).unwrap();
        match a.read(&mut buf) {
            Err(e) => assert!(matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            )),
            Ok(n) => panic!("sender received {} bytes of its own message", n),
        }

        shutdown.store(true, Ordering::SeqCst);
        let _ = TcpStream::connect(("127.0.0.1", port));
        server.join().unwrap();
    }
}

//! evpoll HTTP/1.0 Server
//!
//! One request per connection turn: parse on a worker, answer 200 with
//! a body naming the requested path. No keep-alive, no TLS.
//!
//! Usage:
//!     ev-httpd [--addr 0.0.0.0] [--port 8080] [--workers N]
//!              [--secure-pool] [--reject-overload]
//!
//! Test with:
//!     curl -0 http://localhost:8080/hello.txt
//!
//! Benchmark:
//!     ab -n 10000 -c 100 http://127.0.0.1:8080/

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use evpoll_core::everror;
use evpoll_http::HttpHandler;
use evpoll_reactor::{OverloadPolicy, Reactor, ServerConfig};

use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};

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
            "--secure-pool" => {
                cfg.secure_pool = true;
                i += 1;
            }
            "--reject-overload" => {
                cfg.overload = OverloadPolicy::Reject;
                i += 1;
            }
            other => {
                eprintln!("ev-httpd: unknown argument {}", other);
                eprintln!(
                    "usage: ev-httpd [--addr A] [--port P] [--workers N] \
                     [--secure-pool] [--reject-overload]"
                );
                std::process::exit(2);
            }
        }
    }
    cfg
}

fn main() {
    let cfg = parse_args(ServerConfig::from_env());

    let shutdown = SHUTDOWN
        .get_or_init(|| Arc::new(AtomicBool::new(false)))
        .clone();
    install_signal_handlers();

    let mut reactor = match Reactor::new(cfg, Arc::new(HttpHandler::new()), shutdown) {
        Ok(reactor) => reactor,
        Err(e) => {
            everror!("ev-httpd: startup failed: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = reactor.run() {
        everror!("ev-httpd: reactor failed: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::time::Duration;

    #[test]
    fn test_serves_http10_over_loopback() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let cfg = ServerConfig::new().addr("127.0.0.1").port(0).workers(2);
        let mut reactor =
            Reactor::new(cfg, Arc::new(HttpHandler::new()), Arc::clone(&shutdown)).unwrap();
        let port = reactor.local_port().unwrap();
        let server = std::thread::spawn(move || reactor.run().unwrap());

        let mut client = TcpStream::connect(("127.0.0.1", port)).unwrap();
        client
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        client
            .write_all(b"GET /index.html HTTP/1.0\r\nHost: localhost\r\n\r\n")
            .unwrap();

        let mut buf = vec![0u8; 4096];
        let n = client.read(&mut buf).unwrap();
        let text = String::from_utf8_lossy(&buf[..n]);
        assert!(text.starts_with("HTTP/1.0 200 OK\r\n"));
        assert!(text.contains("/index.html"));

        drop(client);
        shutdown.store(true, Ordering::SeqCst);
        let _ = TcpStream::connect(("127.0.0.1", port));
        server.join().unwrap();
    }
}

//! `HttpHandler` — the HTTP/1.0 instantiation of the `Handler` seam.
//!
//! One job is one request. A parse failure drops the job and leaves the
//! connection open: HTTP/1.0 has no pipelining to resynchronize on, so
//! the malformed request simply goes unanswered (known gap of the
//! one-shot model). Under the `Reject` overload policy the busy
//! response is a 503.

use evpoll_core::{evdebug, evwarn, Handler, Job, Outbound, PeerTable};

use crate::request::Request;
use crate::response::{Response, StatusCode};

/// Routes a parsed request to a response.
///
/// The default route answers 200 with a body naming the requested path;
/// inject a closure for anything richer.
pub struct HttpHandler {
    route: Box<dyn Fn(&Request) -> Response + Send + Sync>,
}

impl HttpHandler {
    pub fn new() -> Self {
        Self {
            route: Box::new(|req| {
                Response::new(StatusCode::Ok)
                    .with_header("Content-Type", "text/plain")
                    .with_body(format!("evpoll serving {}\n", req.path))
            }),
        }
    }

    pub fn with_route(route: impl Fn(&Request) -> Response + Send + Sync + 'static) -> Self {
        Self {
            route: Box::new(route),
        }
    }
}

impl Default for HttpHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for HttpHandler {
    fn handle(&self, job: Job, _peers: &PeerTable) -> Vec<Outbound> {
        let request = match Request::parse(&job.payload) {
            Ok(request) => request,
            Err(e) => {
                evwarn!("conn {} parse error: {}", job.conn, e);
                return Vec::new();
            }
        };
        evdebug!(
            "conn {} {} {} {}",
            job.conn,
            request.method,
            request.path,
            request.version
        );
        let response = (self.route)(&request);
        vec![Outbound::new(job.conn, response.encode())]
    }

    fn busy_response(&self) -> Option<Vec<u8>> {
        Some(
            Response::new(StatusCode::ServiceUnavailable)
                .with_header("Content-Type", "text/plain")
                .with_body("server busy\n")
                .encode(),
        )
    }
}

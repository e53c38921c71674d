//! HTTP service
//!
//! A `tiny_http` server shared by a fixed pool of worker threads. Each worker
//! reads a request, hands it to the [`Router`], and writes the JSON response.

pub mod response;
pub mod routes;

pub use response::ApiResponse;
pub use routes::{Request, Router};

use crate::config::Config;
use crate::error::{Error, Result};
use std::io::{self, Read};
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;
use tiny_http::{Header, Server, StatusCode};
use tracing::{error, info, warn};
use uuid::Uuid;

pub struct HttpService {
    server: Arc<Server>,
    router: Arc<Router>,
}

impl HttpService {
    /// Bind the listening socket
    pub fn bind(config: Config) -> Result<Self> {
        let addr = config.server.bind.clone();
        let server = Server::http(&addr).map_err(|e| Error::Server {
            addr,
            message: e.to_string(),
        })?;
        Ok(Self::from_parts(server, Router::new(config)))
    }

    pub fn from_parts(server: Server, router: Router) -> Self {
        Self {
            server: Arc::new(server),
            router: Arc::new(router),
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Serve until the listener shuts down
    pub fn run(self) -> Result<()> {
        let workers = self.router.config().server.workers.max(1);
        info!(
            addr = ?self.local_addr(),
            workers,
            environment = %self.router.config().environment,
            "listening"
        );

        let handles = (0..workers)
            .map(|i| {
                let server = Arc::clone(&self.server);
                let router = Arc::clone(&self.router);
                thread::Builder::new()
                    .name(format!("http-worker-{}", i))
                    .spawn(move || worker(&server, &router))
            })
            .collect::<io::Result<Vec<_>>>()?;

        for handle in handles {
            if handle.join().is_err() {
                error!("worker thread panicked");
            }
        }

        Ok(())
    }
}

fn worker(server: &Server, router: &Router) {
    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, router) {
            warn!(error = %e, "failed to answer request");
        }
    }
}

fn handle_request(mut request: tiny_http::Request, router: &Router) -> io::Result<()> {
    let request_id = Uuid::new_v4().to_string();

    // One byte over the limit is enough for the router to reject it
    let limit = router.config().server.max_body_bytes as u64 + 1;
    let mut body = Vec::new();
    request.as_reader().take(limit).read_to_end(&mut body)?;

    let method = request.method().clone();
    let url = request.url().to_string();
    let response = router.handle(&Request {
        method: &method,
        url: &url,
        base64_body: is_base64_transfer(request.headers()),
        body: &body,
        request_id: &request_id,
    });

    info!(
        %method,
        %url,
        status = response.status,
        request_id = %request_id,
        "handled request"
    );

    request.respond(to_http(&response))
}

/// `Content-Transfer-Encoding: base64` marks a base64 text body
pub fn is_base64_transfer(headers: &[Header]) -> bool {
    headers.iter().any(|h| {
        h.field.equiv("Content-Transfer-Encoding")
            && h.value.as_str().trim().eq_ignore_ascii_case("base64")
    })
}

fn to_http(response: &ApiResponse) -> tiny_http::Response<io::Cursor<Vec<u8>>> {
    response
        .headers()
        .filter_map(|(name, value)| Header::from_bytes(name.as_bytes(), value.as_bytes()).ok())
        .fold(
            tiny_http::Response::from_data(response.body_bytes())
                .with_status_code(StatusCode(response.status)),
            |http, header| http.with_header(header),
        )
}

//! HTTP server and graceful shutdown.
//!
//! On SIGTERM or Ctrl-C the server:
//! 1. stops calling `listener.accept()`,
//! 2. lets every in-flight connection task run to completion,
//! 3. returns from [`Server::serve`].

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::app::Application;
use crate::config::{ServerSettings, Settings};
use crate::error::Error;
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

/// The HTTP server.
pub struct Server {
    addr: String,
    body_limit: usize,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called. The address is parsed there.
    ///
    /// ```rust,no_run
    /// use pergola::Server;
    /// let server = Server::bind("0.0.0.0:3000");
    /// ```
    pub fn bind(addr: &str) -> Self {
        Self { addr: addr.to_owned(), body_limit: ServerSettings::default().body_limit }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::bind(&settings.server.addr).body_limit(settings.server.body_limit)
    }

    /// Request bodies larger than `bytes` are answered with `413`.
    pub fn body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    /// Accepts connections and dispatches them through `app` until a
    /// shutdown signal arrives and all in-flight requests complete.
    pub async fn serve(self, app: Application) -> Result<(), Error> {
        let addr: SocketAddr = self.addr.parse().map_err(|_| Error::Addr(self.addr.clone()))?;
        let listener = TcpListener::bind(addr).await?;
        let app = Arc::new(app);
        let body_limit = self.body_limit;

        info!(%addr, routes = app.routes().len(), "pergola listening");

        let mut tasks = tokio::task::JoinSet::new();
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let app = Arc::clone(&app);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let app = Arc::clone(&app);
                            async move { dispatch(app, req, body_limit).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("pergola stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Converts one hyper request, runs it through the application, and converts
/// the response back. Failures become status codes; hyper never sees an error.
async fn dispatch(
    app: Arc<Application>,
    req: hyper::Request<hyper::body::Incoming>,
    body_limit: usize,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let Ok(method) = Method::try_from(req.method()) else {
        debug!(method = %req.method(), "unsupported method");
        return Ok(Response::status(Status::MethodNotAllowed).into_inner());
    };

    let target = req
        .uri()
        .path_and_query()
        .map_or_else(|| req.uri().path().to_owned(), |pq| pq.as_str().to_owned());
    let mut request = Request::new(method, &target);
    for (name, value) in req.headers() {
        if let Ok(value) = value.to_str() {
            request = request.with_header(name.as_str(), value);
        }
    }

    let body = match read_body(req.into_body(), body_limit).await {
        Ok(body) => body,
        Err(status) => return Ok(Response::status(status).into_inner()),
    };
    let request = request.with_body(body.to_vec());

    Ok(app.respond(request).await.into_inner())
}

/// Collects at most `limit` bytes of `body`.
async fn read_body<B>(body: B, limit: usize) -> Result<Bytes, Status>
where
    B: hyper::body::Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            debug!(limit, "request body over limit");
            Err(Status::PayloadTooLarge)
        }
        Err(e) => {
            debug!("body read failed: {e}");
            Err(Status::BadRequest)
        }
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or Ctrl-C. A signal that cannot be
/// installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn body_within_limit_is_collected() {
        let body = read_body(Full::new(Bytes::from_static(b"name=bolt")), 64).await;
        assert_eq!(body, Ok(Bytes::from_static(b"name=bolt")));
    }

    #[tokio::test]
    async fn body_over_limit_is_payload_too_large() {
        let body = read_body(Full::new(Bytes::from(vec![0u8; 10])), 4).await;
        assert_eq!(body, Err(Status::PayloadTooLarge));
    }

    #[test]
    fn body_limit_comes_from_settings() {
        let settings = Settings::parse("[server]\nbody_limit = 16\n").unwrap();
        assert_eq!(Server::from_settings(&settings).body_limit, 16);
        assert_eq!(Server::bind("127.0.0.1:0").body_limit, 2 * 1024 * 1024);
    }
}

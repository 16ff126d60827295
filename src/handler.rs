//! Low-level handlers.
//!
//! Controllers cover the REST conventions. Anything outside them (health checks,
//! webhooks, a hand-written JSON endpoint) is a plain async function mounted
//! on a `(Method, path)` pair and consulted only when no controller route
//! matched:
//!
//! ```text
//! async fn healthz(req: Request) -> impl IntoResponse
//!        ↓ .handler(Method::Get, "/healthz", healthz)
//! SharedEndpoint = Arc<dyn Endpoint>        one per route, cloned per request
//!        ↓ endpoint.call(req)
//! ResponseFuture                            polled by the connection task
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

pub(crate) type ResponseFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// An erased handler. Only produced through [`Handler`].
#[doc(hidden)]
pub trait Endpoint: Send + Sync + 'static {
    fn call(&self, req: Request) -> ResponseFuture;
}

#[doc(hidden)]
pub type SharedEndpoint = Arc<dyn Endpoint>;

/// Any `async fn(Request) -> impl IntoResponse`.
///
/// Sealed; the blanket impl is the only one.
pub trait Handler: sealed::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_endpoint(self) -> SharedEndpoint;
}

mod sealed {
    pub trait Sealed {}
}

impl<F, Fut, R> sealed::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_endpoint(self) -> SharedEndpoint {
        Arc::new(AsyncFn(self))
    }
}

struct AsyncFn<F>(F);

impl<F, Fut, R> Endpoint for AsyncFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> ResponseFuture {
        let pending = (self.0)(req);
        Box::pin(async move { pending.await.into_response() })
    }
}

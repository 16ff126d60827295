//! The application: everything a request needs, assembled once at startup.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pergola::{Application, Controller, MemoryStore, Method, Request, Response, TeraRenderer};
//!
//! let app = Application::builder(
//!         Arc::new(TeraRenderer::from_dir("views")?),
//!         Arc::new(MemoryStore::new()),
//!     )
//!     .controller(Controller::simple("Home").path("/"))
//!     .controller(Controller::resource("Widget").form(widget_form()))
//!     .handler(Method::Get, "/healthz", |_req: Request| async { Response::text("ok") })
//!     .build()?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::blob::BlobStore;
use crate::descriptor::ControllerKind;
use crate::dispatch::{Dispatcher, Mount};
use crate::controller::Controller;
use crate::error::Error;
use crate::handler::{Handler, SharedEndpoint};
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::routes::{RouteEntry, RouteTable};
use crate::status::Status;
use crate::store::Store;
use crate::template::Renderer;

/// A built application. Read-only while serving; share it behind an `Arc`.
pub struct Application {
    routes: RouteTable,
    mounts: Vec<Mount>,
    dispatcher: Dispatcher,
    handlers: Router,
}

impl Application {
    pub fn builder(renderer: Arc<dyn Renderer>, store: Arc<dyn Store>) -> ApplicationBuilder {
        ApplicationBuilder {
            dispatcher: Dispatcher::new(renderer, store),
            controllers: Vec::new(),
            handlers: Vec::new(),
        }
    }

    /// The controller routes, in match order.
    pub fn routes(&self) -> &[RouteEntry] {
        self.routes.entries()
    }

    /// Serves `request` through the controller routes only.
    ///
    /// Synchronous: every collaborator call blocks. Paths no controller
    /// claims are `404`; use [`Application::respond`] to reach low-level
    /// handlers too.
    pub fn handle(&self, request: Request) -> Response {
        match self.routes.lookup(request.path()) {
            Some((index, params)) => self.serve_route(index, params, request),
            None => {
                debug!(path = request.path(), "no controller route");
                Response::status(Status::NotFound)
            }
        }
    }

    /// Serves `request` through controllers first, then low-level handlers.
    ///
    /// Controller dispatch runs on the blocking pool so a slow store does not
    /// stall the runtime.
    pub async fn respond(self: Arc<Self>, mut request: Request) -> Response {
        if let Some((index, params)) = self.routes.lookup(request.path()) {
            let app = Arc::clone(&self);
            let task = move || app.serve_route(index, params, request);
            return match tokio::task::spawn_blocking(task).await {
                Ok(response) => response,
                Err(e) => {
                    error!("controller task failed: {e}");
                    Response::status(Status::InternalServerError)
                }
            };
        }

        match self.handlers.lookup(request.method(), request.path()) {
            Some((handler, params)) => {
                request.set_params(params);
                handler.call(request).await
            }
            None if self.handlers.has_path(request.path()) => Response::status(Status::MethodNotAllowed),
            None => Response::status(Status::NotFound),
        }
    }

    fn serve_route(&self, index: usize, params: HashMap<String, String>, mut request: Request) -> Response {
        request.set_params(params);
        self.dispatcher.dispatch(&self.mounts[index], request)
    }
}

/// Collects controllers and handlers; [`ApplicationBuilder::build`] validates
/// the whole set and fails on the first misconfiguration.
pub struct ApplicationBuilder {
    dispatcher: Dispatcher,
    controllers: Vec<Controller>,
    handlers: Vec<(Method, String, SharedEndpoint)>,
}

impl ApplicationBuilder {
    /// Registers a controller. Earlier registrations win overlapping paths.
    pub fn controller(mut self, controller: Controller) -> Self {
        self.controllers.push(controller);
        self
    }

    /// Registers a low-level async handler on a `(method, path)` pair.
    /// Path parameters use `{name}` syntax.
    pub fn handler(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.handlers.push((method, path.to_owned(), handler.into_endpoint()));
        self
    }

    /// Supplies the blob collaborator used by blob, upload and download controllers.
    pub fn blobs(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.dispatcher = self.dispatcher.with_blobs(blobs);
        self
    }

    pub fn build(self) -> Result<Application, Error> {
        let descriptors: Vec<_> = self.controllers.iter().map(|c| c.descriptor().clone()).collect();
        let routes = RouteTable::build(&descriptors)?;

        let needs_blobs = self.controllers.iter().find(|c| {
            matches!(c.kind(), ControllerKind::Blob | ControllerKind::Upload | ControllerKind::Download)
        });
        if let (Some(controller), false) = (needs_blobs, self.dispatcher.has_blobs()) {
            return Err(Error::RoutingMisconfiguration {
                controller: controller.descriptor().type_name().to_owned(),
                reason: "blob controllers need a blob store".to_owned(),
            });
        }

        let mounts = self.controllers.into_iter().map(Mount::new).collect::<Result<Vec<_>, _>>()?;

        let mut handlers = Router::default();
        for (method, path, handler) in self.handlers {
            handlers.insert(method, &path, handler)?;
        }

        info!(controllers = mounts.len(), routes = routes.entries().len(), "application built");
        Ok(Application { routes, mounts, dispatcher: self.dispatcher, handlers })
    }
}

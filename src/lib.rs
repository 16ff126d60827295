//! # pergola
//!
//! Convention-over-configuration REST controllers on a minimal hyper server.
//!
//! Name a controller, declare its form, and pergola derives the rest: the
//! URL table, which template to render, how each verb maps to a hook, and
//! where to redirect after a write.
//!
//! | Controller | Routes | Template |
//! |---|---|---|
//! | `Controller::resource("Widget")` | `/widgets` | `widget/index.html` |
//! | | `/widgets/new` | `widget/new.html` |
//! | | `/widgets/{id}` | `widget/show.html` |
//! | | `/widgets/{id}/edit` | `widget/edit.html` |
//!
//! Routes are regular expressions, anchored on both ends, tried in
//! registration order; the first match wins. Index and show routes accept a
//! trailing `.ext`, readable as [`RequestContext::format`].
//!
//! ## Request lifecycle
//!
//! Every controller request runs `init → authorize → action → render |
//! redirect | error`. Writes always end in a `303` redirect. HTML forms can
//! tunnel `PUT` and `DELETE` through a `POST` with a `_method` field. A
//! failed create re-renders the form with errors and the submitted inputs;
//! a failed field on update is skipped while the others are saved.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pergola::{Application, Controller, Form, Length, MemoryStore, Method,
//!               Request, Required, Response, Server, TeraRenderer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), pergola::Error> {
//!     let widgets = Controller::resource("Widget").form(
//!         Form::new()
//!             .field("name", vec![Required::new().boxed(), Length::new(Some(1), Some(40)).boxed()]),
//!     );
//!
//!     let app = Application::builder(
//!             Arc::new(TeraRenderer::from_dir("views")?),
//!             Arc::new(MemoryStore::new()),
//!         )
//!         .controller(widgets)
//!         .handler(Method::Get, "/healthz", |_req: Request| async { Response::text("ok") })
//!         .build()?;
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await
//! }
//! ```

mod app;
mod blob;
mod config;
mod context;
mod controller;
mod descriptor;
mod dispatch;
mod error;
mod form;
mod handler;
mod method;
mod mode;
mod naming;
mod request;
mod response;
mod router;
mod routes;
mod server;
mod status;
mod store;
mod template;

pub use app::{Application, ApplicationBuilder};
pub use blob::BlobStore;
pub use config::{LogSettings, ServerSettings, Settings, TemplateSettings};
pub use context::{RequestContext, RENDER};
pub use controller::{Controller, Gate, Hook};
pub use descriptor::{ControllerDescriptor, ControllerKind};
pub use dispatch::{Dispatcher, Mount};
pub use error::{Abort, Error};
pub use form::{
    AnyOf, Email, EqualTo, FieldErrors, Fields, Form, Length, NoneOf, NumberRange, Optional,
    Regexp, Required, Validation, ValidationFailure, Validator,
};
pub use handler::Handler;
pub use method::Method;
pub use mode::{resolve_mode, Mode};
pub use naming::{camel_case, derive_path};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use routes::{base_path, build_routes, RouteEntry, RouteTable, EXTENSION, ID};
pub use server::Server;
pub use status::Status;
pub use store::{MemoryStore, Resource, Store};
pub use template::{Renderer, TemplateContext, TeraRenderer};

//! Error types.
//!
//! Two families:
//!
//! - [`Error`] surfaces startup and collaborator failures: binding a port,
//!   parsing configuration, building the route table, rendering a template.
//! - [`Abort`] is a terminal per-request outcome (401, 404, 405, 500). Hooks
//!   return it to stop a request; the dispatcher turns it into a response.
//!
//! Validation failures are neither: they are recovered locally and handed to
//! the next render (see [`crate::form`]).

use crate::response::{IntoResponse, Response};
use crate::status::Status;

/// The error type returned by pergola's fallible operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{0}`")]
    Addr(String),

    #[error("config: {0}")]
    Config(#[from] toml::de::Error),

    /// A controller has no derivable path, or its path is not a valid pattern.
    /// Fatal at startup: the route table is never served partially built.
    #[error("routing misconfiguration in `{controller}`: {reason}")]
    RoutingMisconfiguration { controller: String, reason: String },

    #[error("template: {0}")]
    Template(#[from] tera::Error),

    #[error("store: {0}")]
    Store(String),

    #[error("blob: {0}")]
    Blob(String),

    #[error("serialization: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("xml: {0}")]
    Xml(#[from] quick_xml::SeError),
}

/// A terminal per-request outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Abort {
    #[error("unauthorized")]
    Unauthorized,

    #[error("not found")]
    NotFound,

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("internal error: {0}")]
    Internal(String),
}

impl Abort {
    pub fn status(&self) -> Status {
        match self {
            Self::Unauthorized => Status::Unauthorized,
            Self::NotFound => Status::NotFound,
            Self::MethodNotAllowed => Status::MethodNotAllowed,
            Self::Internal(_) => Status::InternalServerError,
        }
    }
}

/// Collaborator failures inside a request are internal errors, never retried.
impl From<Error> for Abort {
    fn from(e: Error) -> Self {
        Self::Internal(e.to_string())
    }
}

impl IntoResponse for Abort {
    fn into_response(self) -> Response {
        Response::status(self.status())
    }
}

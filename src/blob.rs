//! Blob collaborator.
//!
//! Upload and download transport is owned by the blob service. Controllers
//! only ask it for an upload URL, for the key of what was just uploaded, and
//! for a response streaming a stored blob.

use crate::error::Error;
use crate::request::Request;
use crate::response::Response;

pub trait BlobStore: Send + Sync {
    /// A URL the browser posts the upload form to. Once the blob is stored
    /// the service forwards the request to `redirect_path`.
    fn create_upload_target(&self, redirect_path: &str) -> Result<String, Error>;

    /// The opaque key of the blob carried by `request`, if any.
    fn resolve_uploaded_reference(&self, request: &Request) -> Result<Option<String>, Error>;

    /// A response that streams the blob stored under `key`.
    fn stream_blob(&self, key: &str) -> Result<Response, Error>;
}

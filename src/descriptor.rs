//! Static routing traits of a controller.

use crate::naming::derive_path;

/// The behavior family a controller belongs to.
///
/// The dispatcher switches on this instead of on a class hierarchy.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ControllerKind {
    /// A single page: `GET` renders `name/index.html`.
    Simple,
    /// Full REST over one model: index, new, show, edit, create, update, destroy.
    Resource,
    /// A resource whose records carry an uploaded blob.
    Blob,
    /// Accepts the upload form posted for a [`ControllerKind::Blob`] owner.
    Upload,
    /// Streams the blob of one record of a [`ControllerKind::Blob`] owner.
    Download,
    /// Template-less verb handlers.
    Ajax,
}

impl ControllerKind {
    /// Whether the default path is pluralized and records are addressed by id.
    pub fn supports_resource(self) -> bool {
        matches!(self, Self::Resource | Self::Blob | Self::Upload | Self::Download)
    }

    /// Whether the CRUD body routes are replaced by upload/download conventions.
    pub fn supports_blob(self) -> bool {
        matches!(self, Self::Upload | Self::Download)
    }
}

/// Identifies a controller and the routes it claims.
///
/// Created once at startup from static registration; immutable afterwards.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ControllerDescriptor {
    pub(crate) type_name: String,
    pub(crate) path: Option<String>,
    pub(crate) resource: bool,
    pub(crate) blob: bool,
    pub(crate) extension: bool,
}

impl ControllerDescriptor {
    /// A descriptor for `type_name` with the traits of `kind` and extensions allowed.
    pub fn new(type_name: &str, kind: ControllerKind) -> Self {
        Self {
            type_name: type_name.to_owned(),
            path: None,
            resource: kind.supports_resource(),
            blob: kind.supports_blob(),
            extension: true,
        }
    }

    /// Overrides the default path. The value is a regex fragment, like any route.
    pub fn with_path(mut self, path: &str) -> Self {
        self.path = Some(path.to_owned());
        self
    }

    /// Allows or forbids a trailing `.ext` on index and show routes.
    pub fn with_extension(mut self, allowed: bool) -> Self {
        self.extension = allowed;
        self
    }

    pub fn type_name(&self) -> &str { &self.type_name }
    pub fn declared_path(&self) -> Option<&str> { self.path.as_deref() }
    pub fn supports_resource(&self) -> bool { self.resource }
    pub fn supports_blob(&self) -> bool { self.blob }
    pub fn allows_extension(&self) -> bool { self.extension }

    /// The variable-like name used for templates and mode resolution.
    pub fn base_name(&self) -> String {
        derive_path(&self.type_name)
    }
}

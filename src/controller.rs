//! Controllers: a descriptor, a kind, and a table of override closures.
//!
//! ```rust,ignore
//! use pergola::{Controller, Form, Required};
//!
//! let widgets = Controller::resource("Widget")
//!     .form(Form::new().field("name", vec![Required::new().boxed()]))
//!     .authorize(|ctx| ctx.request().cookie("session").is_some())
//!     .on_show(|ctx| {
//!         if ctx.format() == "json" {
//!             let resource = ctx.resource().cloned();
//!             ctx.render_json(&resource)?;
//!         }
//!         Ok(())
//!     });
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::context::RequestContext;
use crate::descriptor::{ControllerDescriptor, ControllerKind};
use crate::error::Abort;
use crate::form::Form;
use crate::method::Method;
use crate::routes::base_path;

/// A lifecycle override point.
pub type Hook = Arc<dyn Fn(&mut RequestContext) -> Result<(), Abort> + Send + Sync>;

/// The authorization predicate.
pub type Gate = Arc<dyn Fn(&RequestContext) -> bool + Send + Sync>;

/// Which override a request reaches.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) enum Stage {
    Init,
    Index,
    New,
    Show,
    Edit,
    Create,
    Update,
    Destroy,
    Download,
}

#[derive(Clone, Default)]
pub(crate) struct Hooks {
    stages: HashMap<Stage, Hook>,
    verbs: HashMap<Method, Hook>,
    authorized: Option<Gate>,
}

impl Hooks {
    /// Runs the hook registered for `stage`; a missing hook does nothing.
    pub(crate) fn run(&self, stage: Stage, ctx: &mut RequestContext) -> Result<(), Abort> {
        match self.stages.get(&stage) {
            Some(hook) => hook(ctx),
            None => Ok(()),
        }
    }

    pub(crate) fn verb(&self, method: Method) -> Option<&Hook> {
        self.verbs.get(&method)
    }

    /// Everyone is authorized unless a gate says otherwise.
    pub(crate) fn authorized(&self, ctx: &RequestContext) -> bool {
        self.authorized.as_ref().is_none_or(|gate| gate(ctx))
    }
}

/// A route-bearing request handler.
#[derive(Clone)]
pub struct Controller {
    pub(crate) descriptor: ControllerDescriptor,
    pub(crate) kind: ControllerKind,
    pub(crate) model: String,
    pub(crate) form: Form,
    pub(crate) owner: Option<ControllerDescriptor>,
    pub(crate) hooks: Hooks,
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("descriptor", &self.descriptor)
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("form", &self.form)
            .finish_non_exhaustive()
    }
}

impl Controller {
    fn with_kind(type_name: &str, kind: ControllerKind) -> Self {
        let descriptor = ControllerDescriptor::new(type_name, kind);
        Self {
            model: descriptor.base_name(),
            descriptor,
            kind,
            form: Form::new(),
            owner: None,
            hooks: Hooks::default(),
        }
    }

    /// A single page rendered from `name/index.html`.
    pub fn simple(type_name: &str) -> Self {
        Self::with_kind(type_name, ControllerKind::Simple)
    }

    /// Full REST over the model named after the controller.
    pub fn resource(type_name: &str) -> Self {
        Self::with_kind(type_name, ControllerKind::Resource)
    }

    /// A resource whose pages carry an `upload_url` for a blob upload form.
    pub fn blob(type_name: &str) -> Self {
        Self::with_kind(type_name, ControllerKind::Blob)
    }

    /// Receives uploads for `owner`, at `owner_base/upload` unless a path is set.
    pub fn upload(type_name: &str, owner: &Controller) -> Self {
        Self::linked(type_name, ControllerKind::Upload, owner, "/upload")
    }

    /// Streams blobs of `owner` records, at `owner_base/serve/{id}` unless a path is set.
    pub fn download(type_name: &str, owner: &Controller) -> Self {
        Self::linked(type_name, ControllerKind::Download, owner, "/serve/(?P<id>[0-9]+)")
            .extension(false)
    }

    /// Template-less handlers, one per verb.
    pub fn ajax(type_name: &str) -> Self {
        Self::with_kind(type_name, ControllerKind::Ajax)
    }

    fn linked(type_name: &str, kind: ControllerKind, owner: &Controller, suffix: &str) -> Self {
        let mut controller = Self::with_kind(type_name, kind);
        controller.model = owner.model.clone();
        controller.form = owner.form.clone();
        controller.owner = Some(owner.descriptor.clone());
        if let Ok(base) = base_path(&owner.descriptor) {
            controller.descriptor = controller.descriptor.with_path(&format!("{base}{suffix}"));
        }
        controller
    }

    // ── routing traits ────────────────────────────────────────────────────────

    /// Overrides the default path (a regex fragment).
    pub fn path(mut self, path: &str) -> Self {
        self.descriptor = self.descriptor.with_path(path);
        self
    }

    /// Allows or forbids a trailing `.ext` on index and show routes.
    pub fn extension(mut self, allowed: bool) -> Self {
        self.descriptor = self.descriptor.with_extension(allowed);
        self
    }

    /// Names the persisted model. Defaults to the controller's base name.
    pub fn model(mut self, model: &str) -> Self {
        self.model = model.to_owned();
        self
    }

    /// Declares the fields accepted on create and update.
    pub fn form(mut self, form: Form) -> Self {
        self.form = form;
        self
    }

    pub fn descriptor(&self) -> &ControllerDescriptor { &self.descriptor }
    pub fn kind(&self) -> ControllerKind { self.kind }
    pub fn model_name(&self) -> &str { &self.model }
    pub fn base_name(&self) -> String { self.descriptor.base_name() }

    // ── overrides ─────────────────────────────────────────────────────────────

    fn hook<F>(mut self, stage: Stage, f: F) -> Self
    where
        F: Fn(&mut RequestContext) -> Result<(), Abort> + Send + Sync + 'static,
    {
        self.hooks.stages.insert(stage, Arc::new(f));
        self
    }

    /// Runs before authorization on every request.
    pub fn on_init<F>(self, f: F) -> Self
    where
        F: Fn(&mut RequestContext) -> Result<(), Abort> + Send + Sync + 'static,
    {
        self.hook(Stage::Init, f)
    }

    /// Rejects the request with `401` when it returns `false`.
    pub fn authorize<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestContext) -> bool + Send + Sync + 'static,
    {
        self.hooks.authorized = Some(Arc::new(f));
        self
    }

    pub fn on_index<F>(self, f: F) -> Self
    where
        F: Fn(&mut RequestContext) -> Result<(), Abort> + Send + Sync + 'static,
    {
        self.hook(Stage::Index, f)
    }

    pub fn on_new<F>(self, f: F) -> Self
    where
        F: Fn(&mut RequestContext) -> Result<(), Abort> + Send + Sync + 'static,
    {
        self.hook(Stage::New, f)
    }

    pub fn on_show<F>(self, f: F) -> Self
    where
        F: Fn(&mut RequestContext) -> Result<(), Abort> + Send + Sync + 'static,
    {
        self.hook(Stage::Show, f)
    }

    pub fn on_edit<F>(self, f: F) -> Self
    where
        F: Fn(&mut RequestContext) -> Result<(), Abort> + Send + Sync + 'static,
    {
        self.hook(Stage::Edit, f)
    }

    /// Runs after a new record was saved; the record is in `ctx.resource()`.
    pub fn on_create<F>(self, f: F) -> Self
    where
        F: Fn(&mut RequestContext) -> Result<(), Abort> + Send + Sync + 'static,
    {
        self.hook(Stage::Create, f)
    }

    /// Runs after an update was saved.
    pub fn on_update<F>(self, f: F) -> Self
    where
        F: Fn(&mut RequestContext) -> Result<(), Abort> + Send + Sync + 'static,
    {
        self.hook(Stage::Update, f)
    }

    /// Runs before the record is deleted.
    pub fn on_destroy<F>(self, f: F) -> Self
    where
        F: Fn(&mut RequestContext) -> Result<(), Abort> + Send + Sync + 'static,
    {
        self.hook(Stage::Destroy, f)
    }

    /// Runs before a blob is streamed.
    pub fn on_download<F>(self, f: F) -> Self
    where
        F: Fn(&mut RequestContext) -> Result<(), Abort> + Send + Sync + 'static,
    {
        self.hook(Stage::Download, f)
    }

    /// Handles `method` on an ajax controller.
    pub fn on<F>(mut self, method: Method, f: F) -> Self
    where
        F: Fn(&mut RequestContext) -> Result<(), Abort> + Send + Sync + 'static,
    {
        self.hooks.verbs.insert(method, Arc::new(f));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_defaults_to_base_name() {
        let c = Controller::resource("PhotoAlbum");
        assert_eq!(c.model_name(), "photo_album");
        assert_eq!(c.model("album").model_name(), "album");
    }

    #[test]
    fn linked_controllers_share_owner_model_and_paths() {
        let photos = Controller::blob("Photo");
        let upload = Controller::upload("PhotoUpload", &photos);
        let download = Controller::download("PhotoDownload", &photos);

        assert_eq!(upload.model_name(), "photo");
        assert_eq!(upload.descriptor().declared_path(), Some("/photos/upload"));
        assert_eq!(download.descriptor().declared_path(), Some("/photos/serve/(?P<id>[0-9]+)"));
        assert!(!download.descriptor().allows_extension());
        assert!(upload.descriptor().supports_blob());
    }

    #[test]
    fn explicit_path_overrides_linked_default() {
        let photos = Controller::blob("Photo");
        let upload = Controller::upload("PhotoUpload", &photos).path("/uploads");
        assert_eq!(upload.descriptor().declared_path(), Some("/uploads"));
    }
}

//! The per-request state machine.
//!
//! ```text
//! INIT ─┬─ authorized? ── no ──▶ 401
//!       └─ yes ──▶ ACTION (by verb) ─┬─▶ RENDER    template for the mode
//!                                    ├─▶ REDIRECT  303 after POST/PUT/DELETE
//!                                    └─▶ ERROR     401 / 404 / 405 / 500
//! ```
//!
//! Every transition runs synchronously to completion. Nothing is retried:
//! a failed fetch or a hook abort ends the request on the spot. The only
//! local recovery is form validation, which turns into render context.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::blob::BlobStore;
use crate::context::RequestContext;
use crate::controller::{Controller, Stage};
use crate::descriptor::ControllerKind;
use crate::error::{Abort, Error};
use crate::method::Method;
use crate::mode::{resolve_mode, Mode};
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::routes::base_path;
use crate::status::Status;
use crate::store::{Resource, Store};
use crate::template::Renderer;

/// A controller with its paths resolved, ready to serve.
#[derive(Clone, Debug)]
pub struct Mount {
    controller: Controller,
    base: String,
    records_base: String,
}

impl Mount {
    /// Resolves the controller's base path and, for upload and download
    /// controllers, the base path of the records they serve.
    pub fn new(controller: Controller) -> Result<Self, Error> {
        if controller.form.names().any(|name| name == "id") {
            return Err(Error::RoutingMisconfiguration {
                controller: controller.descriptor.type_name().to_owned(),
                reason: "`id` is reserved for the record id and cannot be a form field".to_owned(),
            });
        }
        let base = base_path(&controller.descriptor)?;
        let records_base = match &controller.owner {
            Some(owner) => base_path(owner)?,
            None => base.clone(),
        };
        Ok(Self { controller, base, records_base })
    }

    pub fn controller(&self) -> &Controller { &self.controller }
    pub fn base(&self) -> &str { &self.base }
}

/// Drives requests through a controller's hooks against the collaborators.
///
/// Built once at startup; read-only while serving.
#[derive(Clone)]
pub struct Dispatcher {
    renderer: Arc<dyn Renderer>,
    store: Arc<dyn Store>,
    blobs: Option<Arc<dyn BlobStore>>,
}

impl Dispatcher {
    pub fn new(renderer: Arc<dyn Renderer>, store: Arc<dyn Store>) -> Self {
        Self { renderer, store, blobs: None }
    }

    pub fn with_blobs(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    pub fn has_blobs(&self) -> bool {
        self.blobs.is_some()
    }

    /// Runs one request to a terminal response.
    pub fn dispatch(&self, mount: &Mount, request: Request) -> Response {
        let controller = mount.controller.descriptor.type_name().to_owned();
        let method = request.method();
        let path = request.path().to_owned();

        match self.run(mount, request) {
            Ok(response) => response,
            Err(abort) => {
                match &abort {
                    Abort::Internal(reason) => warn!(%controller, %method, %path, %reason, "request failed"),
                    other => info!(%controller, %method, %path, outcome = %other, "request aborted"),
                }
                abort.into_response()
            }
        }
    }

    fn run(&self, mount: &Mount, request: Request) -> Result<Response, Abort> {
        let controller = &mount.controller;
        let mode = resolve_mode(routed_path(&request), &controller.base_name());
        let render = controller.kind != ControllerKind::Ajax;
        let method = request.method();
        debug!(controller = controller.descriptor.type_name(), %method, %mode, "dispatch");

        let mut ctx = RequestContext::new(request, mode, mount.base.clone(), render);

        // INIT
        controller.hooks.run(Stage::Init, &mut ctx)?;
        if !controller.hooks.authorized(&ctx) {
            return Err(Abort::Unauthorized);
        }

        // AUTHORIZED → ACTION
        self.action(mount, &mut ctx, method)
    }

    fn action(&self, mount: &Mount, ctx: &mut RequestContext, method: Method) -> Result<Response, Abort> {
        use ControllerKind as K;

        match (mount.controller.kind, method) {
            (K::Simple, Method::Get) => {
                mount.controller.hooks.run(Stage::Index, ctx)?;
                self.finish(mount, ctx, &Mode::Index)
            }
            (K::Resource | K::Blob, Method::Get) => self.get(mount, ctx),
            (K::Resource | K::Blob, Method::Post) => self.post(mount, ctx),
            (K::Resource | K::Blob, Method::Put) => self.put(mount, ctx),
            (K::Resource | K::Blob, Method::Delete) => self.delete(mount, ctx),
            (K::Upload, Method::Post) => self.upload(mount, ctx),
            (K::Download, Method::Get) => self.download(mount, ctx),
            (K::Ajax, method) => {
                let hook = mount.controller.hooks.verb(method).ok_or(Abort::MethodNotAllowed)?;
                hook(ctx)?;
                let mode = ctx.mode().clone();
                self.finish(mount, ctx, &mode)
            }
            _ => Err(Abort::MethodNotAllowed),
        }
    }

    // ── GET ───────────────────────────────────────────────────────────────────

    fn get(&self, mount: &Mount, ctx: &mut RequestContext) -> Result<Response, Abort> {
        let controller = &mount.controller;

        if controller.kind == ControllerKind::Blob {
            let blobs = self.blobs()?;
            let upload_url = blobs.create_upload_target(&format!("{}/upload", mount.base))?;
            ctx.send_data("upload_url", upload_url)?;
        }

        let mode = ctx.mode().clone();
        match &mode {
            Mode::Index => {
                let resources = self.store.fetch_all(&controller.model)?;
                ctx.set_resources(resources);
                controller.hooks.run(Stage::Index, ctx)?;
            }
            Mode::New => controller.hooks.run(Stage::New, ctx)?,
            Mode::Show | Mode::Edit => {
                let resource = self.fetch(mount, ctx)?;
                ctx.set_resource(resource);
                let stage = if mode == Mode::Show { Stage::Show } else { Stage::Edit };
                controller.hooks.run(stage, ctx)?;
            }
            Mode::Custom(_) => {}
        }

        self.finish(mount, ctx, &mode)
    }

    // ── POST ──────────────────────────────────────────────────────────────────

    fn post(&self, mount: &Mount, ctx: &mut RequestContext) -> Result<Response, Abort> {
        if let Some(verb) = tunneled(mount, ctx) {
            return self.action(mount, ctx, verb);
        }

        let controller = &mount.controller;
        if controller.kind == ControllerKind::Blob || controller.form.is_empty() {
            return Err(Abort::MethodNotAllowed);
        }

        let submitted = controller.form.validate(|name| ctx.request().form(name));
        match submitted {
            Ok(fields) => {
                let mut resource = Resource::with_fields(&controller.model, fields);
                self.store.save(&mut resource)?;
                self.created(mount, ctx, resource)
            }
            Err(errors) => {
                warn!(controller = controller.descriptor.type_name(), %errors, "validation failed");
                let inputs = ctx.form_data(controller.form.names());
                ctx.reject(errors, inputs);
                self.get(mount, ctx)
            }
        }
    }

    /// Runs the create hook and redirects to the new record unless the hook responded.
    fn created(&self, mount: &Mount, ctx: &mut RequestContext, resource: Resource) -> Result<Response, Abort> {
        let location = resource.link(&mount.records_base);
        ctx.set_resource(resource);
        mount.controller.hooks.run(Stage::Create, ctx)?;

        if let Some(response) = ctx.take_outcome() {
            return Ok(response);
        }
        let location = location.ok_or_else(|| Abort::Internal("saved resource has no id".to_owned()))?;
        Ok(Response::redirect(&location))
    }

    // ── PUT ───────────────────────────────────────────────────────────────────

    /// Partial update: each changed field is validated on its own, and a
    /// field that fails keeps its stored value.
    fn put(&self, mount: &Mount, ctx: &mut RequestContext) -> Result<Response, Abort> {
        let controller = &mount.controller;
        if controller.form.is_empty() {
            return Err(Abort::MethodNotAllowed);
        }

        let mut resource = self.fetch(mount, ctx)?;
        for name in controller.form.names() {
            let Some(value) = ctx.request().form(name) else { continue };
            if resource.get(name) == Some(value) {
                continue;
            }
            match controller.form.check(name, value) {
                Ok(value) => resource.set(name, value),
                Err(failure) => debug!(field = %failure.field, message = %failure.message, "update skipped field"),
            }
        }
        self.store.save(&mut resource)?;

        let location = resource.link(&mount.records_base);
        ctx.set_resource(resource);
        controller.hooks.run(Stage::Update, ctx)?;

        if let Some(response) = ctx.take_outcome() {
            return Ok(response);
        }
        let location = location.ok_or_else(|| Abort::Internal("saved resource has no id".to_owned()))?;
        Ok(Response::redirect(&location))
    }

    // ── DELETE ────────────────────────────────────────────────────────────────

    fn delete(&self, mount: &Mount, ctx: &mut RequestContext) -> Result<Response, Abort> {
        let resource = self.fetch(mount, ctx)?;
        ctx.set_resource(resource);
        mount.controller.hooks.run(Stage::Destroy, ctx)?;

        if let Some(resource) = ctx.take_resource() {
            self.store.delete(&resource)?;
            info!(controller = mount.controller.descriptor.type_name(), id = resource.id(), "deleted resource");
        }

        if let Some(response) = ctx.take_outcome() {
            return Ok(response);
        }
        Ok(Response::redirect(&mount.records_base))
    }

    // ── Blob upload / download ────────────────────────────────────────────────

    fn upload(&self, mount: &Mount, ctx: &mut RequestContext) -> Result<Response, Abort> {
        if let Some(verb) = tunneled(mount, ctx) {
            return self.action(mount, ctx, verb);
        }

        let controller = &mount.controller;
        let retry = format!("{}/new", mount.records_base);

        let mut fields = match controller.form.validate(|name| ctx.request().form(name)) {
            Ok(fields) => fields,
            Err(errors) => {
                warn!(controller = controller.descriptor.type_name(), %errors, "upload form rejected");
                return Ok(Response::redirect(&retry));
            }
        };

        let Some(key) = self.blobs()?.resolve_uploaded_reference(ctx.request())? else {
            warn!(controller = controller.descriptor.type_name(), "upload carried no blob");
            return Ok(Response::redirect(&retry));
        };

        fields.retain(|(name, _)| name != "blob");
        fields.push(("blob".to_owned(), key));
        let mut resource = Resource::with_fields(&controller.model, fields);
        self.store.save(&mut resource)?;
        self.created(mount, ctx, resource)
    }

    fn download(&self, mount: &Mount, ctx: &mut RequestContext) -> Result<Response, Abort> {
        let resource = self.fetch(mount, ctx)?;
        let key = resource.get("blob").ok_or(Abort::NotFound)?.to_owned();
        ctx.set_resource(resource);
        mount.controller.hooks.run(Stage::Download, ctx)?;

        if let Some(response) = ctx.take_outcome() {
            return Ok(response);
        }
        Ok(self.blobs()?.stream_blob(&key)?)
    }

    // ── shared steps ──────────────────────────────────────────────────────────

    /// ACTION → RENDER: a hook's redirect or direct output wins, then the
    /// template for `mode` if rendering is still on, else an empty `200`.
    fn finish(&self, mount: &Mount, ctx: &mut RequestContext, mode: &Mode) -> Result<Response, Abort> {
        if let Some(response) = ctx.take_outcome() {
            return Ok(response);
        }
        if !ctx.render_enabled() {
            return Ok(Response::status(Status::Ok));
        }

        let controller = &mount.controller;
        if *mode == Mode::Index && controller.kind.supports_resource() {
            // The collection is read again right before rendering.
            let resources = self.store.fetch_all(&controller.model)?;
            ctx.send_data("resources", &resources)?;
            ctx.set_resources(resources);
        }

        let template = mode.template(&controller.base_name());
        let html = self.renderer.render(&template, &ctx.template_context()?)?;
        Ok(Response::html(html))
    }

    /// Fetches the record addressed by the request, or 404.
    fn fetch(&self, mount: &Mount, ctx: &RequestContext) -> Result<Resource, Abort> {
        let id = record_id(ctx.request()).ok_or(Abort::NotFound)?;
        self.store
            .fetch_by_id(&mount.controller.model, id)?
            .ok_or(Abort::NotFound)
    }

    fn blobs(&self) -> Result<&Arc<dyn BlobStore>, Abort> {
        self.blobs.as_ref().ok_or_else(|| Abort::Internal("no blob store configured".to_owned()))
    }
}

/// The `_method` override of a POST, logged when present.
fn tunneled(mount: &Mount, ctx: &RequestContext) -> Option<Method> {
    let verb = ctx.request().form("_method").and_then(Method::tunneled)?;
    info!(controller = mount.controller.descriptor.type_name(), %verb, "intercepted tunneled method");
    Some(verb)
}

/// The request path without the extension the route captured, so
/// `/widgets.json` resolves like `/widgets`.
fn routed_path(request: &Request) -> &str {
    let path = request.path();
    request
        .param("ext")
        .and_then(|ext| path.strip_suffix(ext))
        .and_then(|rest| rest.strip_suffix('.'))
        .unwrap_or(path)
}

/// The record id: the route's `id` capture, else the digits of a `show`-like
/// final segment (`/gallery/12.json`).
fn record_id(request: &Request) -> Option<i64> {
    if let Some(id) = request.param("id") {
        return id.parse().ok();
    }
    let last = request.path().rsplit('/').next()?;
    let digits = last.split('.').next()?;
    digits.parse().ok()
}

//! Per-request state handed to every hook.
//!
//! A [`RequestContext`] is created when a request reaches its controller and
//! dropped when the response leaves. Nothing in it outlives the request.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::Value;

use crate::error::Error;
use crate::form::FieldErrors;
use crate::mode::Mode;
use crate::request::Request;
use crate::response::Response;
use crate::store::Resource;
use crate::template::TemplateContext;

/// The flag deciding whether a template is rendered after the hooks ran.
pub const RENDER: &str = "render";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

pub struct RequestContext {
    request: Request,
    mode: Mode,
    base_path: String,
    flags: HashMap<String, bool>,
    params: TemplateContext,
    errors: FieldErrors,
    inputs: BTreeMap<String, String>,
    resource: Option<Resource>,
    resources: Vec<Resource>,
    output: Option<Response>,
    redirect: Option<String>,
}

impl RequestContext {
    pub(crate) fn new(request: Request, mode: Mode, base_path: String, render: bool) -> Self {
        Self {
            request,
            mode,
            base_path,
            flags: HashMap::from([(RENDER.to_owned(), render)]),
            params: TemplateContext::new(),
            errors: FieldErrors::default(),
            inputs: BTreeMap::new(),
            resource: None,
            resources: Vec::new(),
            output: None,
            redirect: None,
        }
    }

    pub fn request(&self) -> &Request { &self.request }
    pub fn mode(&self) -> &Mode { &self.mode }

    /// The controller's resolved base path (`/widgets`).
    pub fn base_path(&self) -> &str { &self.base_path }

    /// The extension captured by the route, `html` when there is none.
    pub fn format(&self) -> &str {
        self.request.param("ext").unwrap_or("html")
    }

    // ── flags ─────────────────────────────────────────────────────────────────

    pub fn flag(&self, name: &str) -> Option<bool> {
        self.flags.get(name).copied()
    }

    /// Sets or adds a flag and returns the new value.
    pub fn set_flag(&mut self, name: &str, value: bool) -> bool {
        self.flags.insert(name.to_owned(), value);
        value
    }

    pub fn render_enabled(&self) -> bool {
        self.flag(RENDER).unwrap_or(false)
    }

    // ── template variables ────────────────────────────────────────────────────

    /// Adds a variable for the template.
    pub fn send_data(&mut self, key: &str, value: impl Serialize) -> Result<(), Error> {
        self.params.insert(key.to_owned(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn data(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// The submitted values of `names`; absent fields map to an empty string.
    pub fn form_data<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> BTreeMap<String, String> {
        names.into_iter()
            .map(|name| (name.to_owned(), self.request.form(name).unwrap_or_default().to_owned()))
            .collect()
    }

    // ── resources ─────────────────────────────────────────────────────────────

    /// The record addressed by the request id, once fetched.
    pub fn resource(&self) -> Option<&Resource> { self.resource.as_ref() }
    pub fn resource_mut(&mut self) -> Option<&mut Resource> { self.resource.as_mut() }

    /// The collection fetched for the index page.
    pub fn resources(&self) -> &[Resource] { &self.resources }

    pub(crate) fn set_resource(&mut self, resource: Resource) {
        self.resource = Some(resource);
    }

    pub(crate) fn take_resource(&mut self) -> Option<Resource> {
        self.resource.take()
    }

    pub(crate) fn set_resources(&mut self, resources: Vec<Resource>) {
        self.resources = resources;
    }

    // ── validation side channel ───────────────────────────────────────────────

    /// Field errors of a rejected submission being re-rendered.
    pub fn errors(&self) -> &FieldErrors { &self.errors }

    /// The values of a rejected submission, for refilling the form.
    pub fn inputs(&self) -> &BTreeMap<String, String> { &self.inputs }

    pub(crate) fn reject(&mut self, errors: FieldErrors, inputs: BTreeMap<String, String>) {
        self.errors = errors;
        self.inputs = inputs;
    }

    // ── direct output ─────────────────────────────────────────────────────────

    /// Responds with `value` as JSON instead of rendering a template.
    pub fn render_json(&mut self, value: &impl Serialize) -> Result<(), Error> {
        let body = serde_json::to_vec(value)?;
        self.emit(Response::json(body));
        Ok(())
    }

    /// Responds with `value` as XML instead of rendering a template.
    ///
    /// Fields become child elements of a `<root>` element. Field names must
    /// be valid XML names.
    pub fn render_xml(&mut self, value: &impl Serialize) -> Result<(), Error> {
        let body = quick_xml::se::to_string_with_root("root", value)?;
        self.emit(Response::xml(format!("{XML_DECLARATION}{body}")));
        Ok(())
    }

    /// Responds with any prepared response and disables rendering.
    pub fn emit(&mut self, response: Response) {
        self.set_flag(RENDER, false);
        self.output = Some(response);
    }

    /// Ends the request in a `303` to `location`.
    pub fn redirect(&mut self, location: impl Into<String>) {
        self.set_flag(RENDER, false);
        self.redirect = Some(location.into());
    }

    pub(crate) fn take_outcome(&mut self) -> Option<Response> {
        if let Some(location) = self.redirect.take() {
            return Some(Response::redirect(&location));
        }
        self.output.take()
    }

    /// Everything a template sees: sent data plus `resource`, `errors` and `inputs`.
    pub(crate) fn template_context(&self) -> Result<TemplateContext, Error> {
        let mut ctx = self.params.clone();
        if let Some(resource) = &self.resource {
            ctx.insert("resource".to_owned(), serde_json::to_value(resource)?);
        }
        ctx.insert("errors".to_owned(), serde_json::to_value(&self.errors)?);
        ctx.insert("inputs".to_owned(), serde_json::to_value(&self.inputs)?);
        ctx.insert("mode".to_owned(), Value::String(self.mode.as_str().to_owned()));
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{Form, Length};
    use crate::method::Method;
    use crate::status::Status;

    fn ctx(target: &str) -> RequestContext {
        RequestContext::new(Request::new(Method::Get, target), Mode::Index, "/widgets".into(), true)
    }

    #[test]
    fn flags_default_to_render() {
        let mut c = ctx("/widgets");
        assert!(c.render_enabled());
        assert_eq!(c.flag("missing"), None);
        assert!(c.set_flag("cached", true));
        assert_eq!(c.flag("cached"), Some(true));
    }

    #[test]
    fn json_output_disables_rendering() {
        let mut c = ctx("/widgets");
        c.render_json(&serde_json::json!({ "ok": true })).unwrap();
        assert!(!c.render_enabled());
        let res = c.take_outcome().unwrap();
        assert_eq!(res.header("content-type"), Some("application/json"));
        assert_eq!(res.body(), br#"{"ok":true}"#);
    }

    #[test]
    fn xml_output_wraps_fields_in_root_and_escapes() {
        let mut c = ctx("/widgets");
        let widget = Resource::with_fields("widget", [("name", "a&b")]);
        c.render_xml(&widget).unwrap();
        assert!(!c.render_enabled());

        let res = c.take_outcome().unwrap();
        assert_eq!(res.header("content-type"), Some("application/xml"));
        let body = std::str::from_utf8(res.body()).unwrap();
        assert!(body.starts_with(XML_DECLARATION));
        assert!(body.contains("<root>"));
        assert!(body.contains("<name>a&amp;b</name>"));
        assert!(body.ends_with("</root>"));
    }

    #[test]
    fn xml_output_rejects_invalid_element_names() {
        let mut c = ctx("/widgets");
        let err = c.render_xml(&serde_json::json!({ "2d": 1 })).unwrap_err();
        assert!(matches!(err, Error::Xml(_)));
        assert!(c.render_enabled());
    }

    #[test]
    fn redirect_wins_over_output() {
        let mut c = ctx("/widgets");
        c.emit(Response::text("ignored"));
        c.redirect("/widgets/1");
        let res = c.take_outcome().unwrap();
        assert_eq!(res.status_code(), Status::SeeOther);
    }

    #[test]
    fn template_context_carries_side_channels() {
        let mut c = ctx("/widgets?name=x");
        c.send_data("title", "Widgets").unwrap();
        let form = Form::new().field("name", vec![Length::new(Some(3), None).boxed()]);
        let errors = form.validate(|k| c.request().form(k)).unwrap_err();
        let inputs = c.form_data(["name"]);
        c.reject(errors, inputs);

        let tc = c.template_context().unwrap();
        assert_eq!(tc["title"], "Widgets");
        assert_eq!(tc["errors"]["name"], "Please correct this field.");
        assert_eq!(tc["inputs"]["name"], "x");
        assert_eq!(tc["mode"], "index");
        assert!(!tc.contains_key("resource"));
    }

    #[test]
    fn format_defaults_to_html() {
        assert_eq!(ctx("/widgets").format(), "html");
    }
}

//! Incoming HTTP request type.

use std::collections::HashMap;

use crate::method::Method;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// An incoming HTTP request.
///
/// The body is kept raw. When it is `application/x-www-form-urlencoded` it is
/// also decoded into form fields, merged after the query-string pairs, so
/// [`Request::form`] answers for both `GET ?q=` and `POST` bodies.
#[derive(Clone, Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Vec<u8>,
    pub(crate) params: HashMap<String, String>,
    pub(crate) form: Vec<(String, String)>,
}

impl Request {
    /// Builds a request for `target`, which may carry a query string.
    ///
    /// ```
    /// use pergola::{Method, Request};
    ///
    /// let req = Request::new(Method::Get, "/widgets?page=2");
    /// assert_eq!(req.path(), "/widgets");
    /// assert_eq!(req.form("page"), Some("2"));
    /// ```
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };
        Self {
            method,
            path: path.to_owned(),
            headers: Vec::new(),
            body: Vec::new(),
            params: HashMap::new(),
            form: query.map(decode_pairs).unwrap_or_default(),
        }
    }

    /// Appends a header. Returns `self` for chaining.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Sets the raw body, decoding it as form fields when the content type says so.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        let is_form = self
            .header("content-type")
            .is_some_and(|ct| ct.starts_with(FORM_CONTENT_TYPE));
        if is_form {
            let pairs = std::str::from_utf8(&self.body).map(decode_pairs).unwrap_or_default();
            self.form.extend(pairs);
        }
        self
    }

    /// Sets a urlencoded form body built from `fields`.
    pub fn with_form(self, fields: &[(&str, &str)]) -> Self {
        let body = serde_urlencoded::to_string(fields).unwrap_or_default();
        self.with_header("content-type", FORM_CONTENT_TYPE).with_body(body)
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns a named path parameter.
    ///
    /// Controller routes capture `id` and `ext`; low-level handler routes
    /// capture whatever `{name}` segments they declare.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The last value submitted for a form or query field.
    pub fn form(&self, name: &str) -> Option<&str> {
        self.form.iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every submitted form and query pair, in arrival order.
    pub fn form_pairs(&self) -> &[(String, String)] {
        &self.form
    }

    /// Looks up a cookie from the `cookie` header.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.header("cookie")?
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }

    /// The extension of the final path segment, if any (`/widgets/4.json` → `json`).
    pub fn extension(&self) -> Option<&str> {
        let last = self.path.rsplit('/').next()?;
        let (_, ext) = last.rsplit_once('.')?;
        (!ext.is_empty()).then_some(ext)
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }
}

fn decode_pairs(raw: &str) -> Vec<(String, String)> {
    serde_urlencoded::from_str(raw).unwrap_or_default()
}

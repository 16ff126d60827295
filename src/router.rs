//! Radix-tree router for low-level handlers.
//!
//! One tree per HTTP method, `{name}` segments captured as parameters. It is
//! only consulted for paths no controller route claimed.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;

use crate::error::Error;
use crate::handler::SharedEndpoint;
use crate::method::Method;

#[derive(Default)]
pub(crate) struct Router {
    routes: HashMap<Method, MatchitRouter<SharedEndpoint>>,
}

impl Router {
    pub(crate) fn insert(&mut self, method: Method, path: &str, handler: SharedEndpoint) -> Result<(), Error> {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler)
            .map_err(|e| Error::RoutingMisconfiguration {
                controller: format!("{method} {path}"),
                reason: e.to_string(),
            })
    }

    pub(crate) fn lookup(&self, method: Method, path: &str) -> Option<(SharedEndpoint, HashMap<String, String>)> {
        let tree = self.routes.get(&method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }

    /// Whether any method has a handler at `path`.
    pub(crate) fn has_path(&self, path: &str) -> bool {
        self.routes.values().any(|tree| tree.at(path).is_ok())
    }
}

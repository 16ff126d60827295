//! Route table: controller descriptors in, ordered regex routes out.
//!
//! Matching is first-match-wins in declaration order. There is no
//! longest-prefix rule and no overlap check: a controller declared earlier
//! shadows any later one whose pattern also matches. Duplicates are logged,
//! never rejected.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use tracing::{debug, warn};

use crate::descriptor::ControllerDescriptor;
use crate::error::Error;
use crate::naming::derive_path;

/// Optional `.ext` suffix, captured for content negotiation.
pub const EXTENSION: &str = r"(?:\.(?P<ext>[^.]+))?";
/// A record id: one or more decimal digits.
pub const ID: &str = r"(?P<id>[0-9]+)";

/// One `(pattern, controller)` pair.
#[derive(Clone, Debug)]
pub struct RouteEntry {
    pattern: String,
    controller: usize,
    regex: Regex,
}

impl RouteEntry {
    /// The pattern as declared, without anchors.
    pub fn pattern(&self) -> &str { &self.pattern }

    /// Position of the owning descriptor in the registration list.
    pub fn controller(&self) -> usize { self.controller }
}

/// Resolves a descriptor's base path: the declared one, else `/` + derived
/// name, pluralized for resource controllers.
pub fn base_path(descriptor: &ControllerDescriptor) -> Result<String, Error> {
    if let Some(path) = descriptor.declared_path() {
        if path.is_empty() {
            return Err(misconfigured(descriptor, "declared path is empty"));
        }
        return Ok(path.to_owned());
    }

    let name = derive_path(descriptor.type_name());
    if name.is_empty() {
        return Err(misconfigured(descriptor, "no path declared and none derivable from the name"));
    }
    let plural = if descriptor.supports_resource() { "s" } else { "" };
    Ok(format!("/{name}{plural}"))
}

/// Builds the ordered route list for `descriptors`.
///
/// Every descriptor yields an index route. Resource descriptors without blob
/// support add `new`, show and edit routes, always in that order.
pub fn build_routes(descriptors: &[ControllerDescriptor]) -> Result<Vec<RouteEntry>, Error> {
    let mut entries = Vec::new();
    let mut seen = HashSet::new();

    for (index, descriptor) in descriptors.iter().enumerate() {
        let base = base_path(descriptor)?;
        let ext = if descriptor.allows_extension() { EXTENSION } else { "" };

        let mut patterns = vec![format!("{base}{ext}")];
        if descriptor.supports_resource() && !descriptor.supports_blob() {
            patterns.push(format!("{base}/new"));
            patterns.push(format!("{base}/{ID}{ext}"));
            patterns.push(format!("{base}/{ID}/edit"));
        }

        for pattern in patterns {
            let regex = Regex::new(&format!("^(?:{pattern})$"))
                .map_err(|e| misconfigured(descriptor, &format!("invalid pattern `{pattern}`: {e}")))?;
            if !seen.insert(pattern.clone()) {
                warn!(controller = descriptor.type_name(), %pattern, "duplicate route is shadowed by an earlier controller");
            }
            debug!(controller = descriptor.type_name(), %pattern, "route");
            entries.push(RouteEntry { pattern, controller: index, regex });
        }
    }

    Ok(entries)
}

/// The built, read-only route table.
#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    /// Builds the table, failing fast on the first misconfigured descriptor.
    pub fn build(descriptors: &[ControllerDescriptor]) -> Result<Self, Error> {
        Ok(Self { entries: build_routes(descriptors)? })
    }

    pub fn entries(&self) -> &[RouteEntry] { &self.entries }

    /// Finds the first route matching `path`.
    ///
    /// Returns the controller position and the captured parameters. Named
    /// groups are captured by name; a pattern whose first group is unnamed
    /// and all digits (`/photos/serve/([0-9]+)`) also yields `id`.
    pub fn lookup(&self, path: &str) -> Option<(usize, HashMap<String, String>)> {
        self.entries.iter().find_map(|entry| {
            let caps = entry.regex.captures(path)?;
            let mut params: HashMap<String, String> = entry.regex
                .capture_names()
                .flatten()
                .filter_map(|name| caps.name(name).map(|m| (name.to_owned(), m.as_str().to_owned())))
                .collect();

            if !params.contains_key("id") {
                let first_unnamed = entry.regex.capture_names()
                    .enumerate()
                    .skip(1)
                    .find(|(_, name)| name.is_none())
                    .and_then(|(i, _)| caps.get(i));
                if let Some(m) = first_unnamed.filter(|m| !m.as_str().is_empty() && m.as_str().bytes().all(|b| b.is_ascii_digit())) {
                    params.insert("id".to_owned(), m.as_str().to_owned());
                }
            }

            Some((entry.controller, params))
        })
    }
}

fn misconfigured(descriptor: &ControllerDescriptor, reason: &str) -> Error {
    Error::RoutingMisconfiguration {
        controller: descriptor.type_name().to_owned(),
        reason: reason.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ControllerKind;

    fn patterns(entries: &[RouteEntry]) -> Vec<&str> {
        entries.iter().map(RouteEntry::pattern).collect()
    }

    #[test]
    fn resource_yields_four_routes_in_order() {
        let widget = ControllerDescriptor::new("Widget", ControllerKind::Resource).with_extension(false);
        let entries = build_routes(&[widget]).unwrap();
        assert_eq!(
            patterns(&entries),
            [
                "/widgets",
                "/widgets/new",
                "/widgets/(?P<id>[0-9]+)",
                "/widgets/(?P<id>[0-9]+)/edit",
            ]
        );
    }

    #[test]
    fn extension_suffix_on_index_and_show_only() {
        let entries = build_routes(&[ControllerDescriptor::new("Widget", ControllerKind::Resource)]).unwrap();
        assert_eq!(entries.len(), 4);
        assert!(entries[0].pattern().ends_with(EXTENSION));
        assert!(!entries[1].pattern().ends_with(EXTENSION));
        assert!(entries[2].pattern().ends_with(EXTENSION));
        assert!(!entries[3].pattern().ends_with(EXTENSION));
    }

    #[test]
    fn simple_and_blob_controllers_get_only_index() {
        let entries = build_routes(&[
            ControllerDescriptor::new("AboutPage", ControllerKind::Simple).with_extension(false),
            ControllerDescriptor::new("PhotoUpload", ControllerKind::Upload).with_path("/photos/upload"),
        ])
        .unwrap();
        assert_eq!(patterns(&entries)[0], "/about_page");
        assert_eq!(entries[1].pattern(), format!("/photos/upload{EXTENSION}"));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].controller(), 1);
    }

    #[test]
    fn declared_path_is_not_pluralized() {
        let d = ControllerDescriptor::new("Photo", ControllerKind::Resource).with_path("/gallery");
        assert_eq!(base_path(&d).unwrap(), "/gallery");
    }

    #[test]
    fn missing_path_is_a_misconfiguration() {
        let nameless = ControllerDescriptor::new("", ControllerKind::Simple);
        assert!(matches!(
            RouteTable::build(&[nameless]),
            Err(Error::RoutingMisconfiguration { .. })
        ));

        let broken = ControllerDescriptor::new("Broken", ControllerKind::Simple).with_path("/(unclosed");
        assert!(matches!(
            RouteTable::build(&[broken]),
            Err(Error::RoutingMisconfiguration { .. })
        ));
    }

    #[test]
    fn lookup_captures_id_and_extension() {
        let table = RouteTable::build(&[ControllerDescriptor::new("Widget", ControllerKind::Resource)]).unwrap();

        let (controller, params) = table.lookup("/widgets/42.json").unwrap();
        assert_eq!(controller, 0);
        assert_eq!(params.get("id").map(String::as_str), Some("42"));
        assert_eq!(params.get("ext").map(String::as_str), Some("json"));

        let (_, params) = table.lookup("/widgets/7/edit").unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("7"));
        assert!(!params.contains_key("ext"));

        assert!(table.lookup("/widgets/abc").is_none());
        assert!(table.lookup("/widgets/7/delete").is_none());
    }

    #[test]
    fn first_declared_wins() {
        let table = RouteTable::build(&[
            ControllerDescriptor::new("Featured", ControllerKind::Simple).with_path("/widgets/new"),
            ControllerDescriptor::new("Widget", ControllerKind::Resource),
        ])
        .unwrap();
        assert_eq!(table.lookup("/widgets/new").unwrap().0, 0);
        assert_eq!(table.lookup("/widgets").unwrap().0, 1);
    }

    #[test]
    fn unnamed_digit_group_becomes_id() {
        let table = RouteTable::build(&[
            ControllerDescriptor::new("PhotoDownload", ControllerKind::Download)
                .with_path("/photos/serve/([0-9]+)")
                .with_extension(false),
        ])
        .unwrap();
        let (_, params) = table.lookup("/photos/serve/12").unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("12"));
    }
}

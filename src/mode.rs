//! Mode resolution: which logical action a request path asks for.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static SHOW_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+(\.[^.]+)?$").expect("SHOW_SEGMENT: invalid pattern"));

/// The resolved logical action of a request.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Mode {
    Index,
    New,
    Show,
    Edit,
    /// Any other final path segment, passed through verbatim.
    Custom(String),
}

impl Mode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Index => "index",
            Self::New => "new",
            Self::Show => "show",
            Self::Edit => "edit",
            Self::Custom(name) => name,
        }
    }

    /// The template rendered for this mode under `base_name/`.
    pub fn template(&self, base_name: &str) -> String {
        format!("{base_name}/{}.html", self.as_str())
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves the mode of `path` for the controller named `base_name`.
///
/// 1. `/base_name` or `/base_name` + `s` (one trailing slash ignored) is `index`.
/// 2. A final segment of digits, optionally with an extension, is `show`.
/// 3. Anything else is the final segment itself (`new`, `edit`, or custom).
///
/// Total and pure.
///
/// ```
/// use pergola::{resolve_mode, Mode};
///
/// assert_eq!(resolve_mode("/widgets", "widget"), Mode::Index);
/// assert_eq!(resolve_mode("/widgets/42.json", "widget"), Mode::Show);
/// assert_eq!(resolve_mode("/widgets/7/edit", "widget").as_str(), "edit");
/// ```
pub fn resolve_mode(path: &str, base_name: &str) -> Mode {
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    let singular = format!("/{base_name}");
    if trimmed == singular || trimmed.strip_suffix('s') == Some(singular.as_str()) {
        return Mode::Index;
    }

    let last = trimmed.rsplit('/').next().unwrap_or_default();
    if SHOW_SEGMENT.is_match(last) {
        return Mode::Show;
    }

    match last {
        "new" => Mode::New,
        "edit" => Mode::Edit,
        other => Mode::Custom(other.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_conventional_modes() {
        assert_eq!(resolve_mode("/widgets", "widget"), Mode::Index);
        assert_eq!(resolve_mode("/widgets/", "widget"), Mode::Index);
        assert_eq!(resolve_mode("/widget", "widget"), Mode::Index);
        assert_eq!(resolve_mode("/widgets/42", "widget"), Mode::Show);
        assert_eq!(resolve_mode("/widgets/42.json", "widget"), Mode::Show);
        assert_eq!(resolve_mode("/widgets/new", "widget"), Mode::New);
        assert_eq!(resolve_mode("/widgets/7/edit", "widget"), Mode::Edit);
    }

    #[test]
    fn passes_custom_segments_through() {
        let mode = resolve_mode("/widgets/7/publish", "widget");
        assert_eq!(mode, Mode::Custom("publish".into()));
        assert_eq!(mode.template("widget"), "widget/publish.html");
        assert_eq!(resolve_mode("/gallery", "photo").as_str(), "gallery");
    }

    #[test]
    fn only_one_trailing_slash_is_ignored() {
        assert_eq!(resolve_mode("/widgets//", "widget"), Mode::Custom(String::new()));
    }

    #[test]
    fn template_names() {
        assert_eq!(Mode::Index.template("photo_album"), "photo_album/index.html");
        assert_eq!(Mode::Edit.template("widget"), "widget/edit.html");
    }
}

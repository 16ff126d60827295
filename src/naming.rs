//! Identifier conventions.
//!
//! Controllers are declared by type-like names (`PhotoAlbum`); URLs, template
//! folders and model names use the variable-like form (`photo_album`).

use std::sync::LazyLock;

use regex::Regex;

// An uppercase letter starting a lowercase run, preceded by anything.
static WORD_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.)([A-Z][a-z]+)").expect("WORD_START: invalid pattern"));

// A lowercase letter or digit immediately followed by an uppercase letter.
static CASE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("CASE_BOUNDARY: invalid pattern"));

/// Converts a class-like identifier into a path segment.
///
/// ```
/// assert_eq!(pergola::derive_path("PhotoAlbum"), "photo_album");
/// assert_eq!(pergola::derive_path("HTTPServer"), "http_server");
/// assert_eq!(pergola::derive_path("Upload"), "upload");
/// ```
pub fn derive_path(type_name: &str) -> String {
    let first = WORD_START.replace_all(type_name, "${1}_${2}");
    CASE_BOUNDARY
        .replace_all(&first, "${1}_${2}")
        .to_lowercase()
}

/// The inverse of [`derive_path`] for simple identifiers: `photo_album` → `PhotoAlbum`.
pub fn camel_case(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase(),
                None => String::new(),
            }
        })
        .collect()
}

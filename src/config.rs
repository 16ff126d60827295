//! Settings loaded from a TOML file.
//!
//! ```toml
//! [server]
//! addr = "127.0.0.1:8080"
//! body_limit = 1048576
//!
//! [templates]
//! dir = "views"
//!
//! [log]
//! filter = "pergola=debug,info"
//! ```
//!
//! Every key is optional. Routes are not configuration: controllers are
//! registered in code.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::Error;

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub templates: TemplateSettings,
    pub log: LogSettings,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerSettings {
    pub addr: String,
    /// Largest request body accepted, in bytes.
    pub body_limit: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { addr: "0.0.0.0:3000".to_owned(), body_limit: 2 * 1024 * 1024 }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TemplateSettings {
    /// Directory scanned for `**/*.html` templates.
    pub dir: String,
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self { dir: "views".to_owned() }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogSettings {
    /// An `EnvFilter` directive string.
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self { filter: "info".to_owned() }
    }
}

impl Settings {
    /// Reads and parses `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, Error> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let settings = Settings::parse("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.server.addr, "0.0.0.0:3000");
        assert_eq!(settings.server.body_limit, 2 * 1024 * 1024);
        assert_eq!(settings.templates.dir, "views");
        assert_eq!(settings.log.filter, "info");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let settings = Settings::parse("[server]\naddr = \"127.0.0.1:8080\"\n").unwrap();
        assert_eq!(settings.server.addr, "127.0.0.1:8080");
        assert_eq!(settings.server.body_limit, 2 * 1024 * 1024);
        assert_eq!(settings.templates.dir, "views");
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = Settings::parse("[server\naddr = 1").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = Settings::load("/nonexistent/pergola.toml").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}

//! Template collaborator.
//!
//! The environment is configured once at startup and handed to the
//! application; it is read-only while serving.

use serde_json::{Map, Value};
use tera::{Context, Tera};
use tracing::debug;

use crate::error::Error;

/// Template variables for one render.
pub type TemplateContext = Map<String, Value>;

/// Renders a named template with accumulated context.
pub trait Renderer: Send + Sync {
    fn render(&self, template: &str, context: &TemplateContext) -> Result<String, Error>;
}

/// A [`Renderer`] over a Tera environment.
#[derive(Debug)]
pub struct TeraRenderer {
    tera: Tera,
}

impl TeraRenderer {
    /// Loads every `*.html` under `dir`, named by path relative to it
    /// (`widget/index.html`).
    pub fn from_dir(dir: &str) -> Result<Self, Error> {
        let glob = format!("{}/**/*.html", dir.trim_end_matches('/'));
        let tera = Tera::new(&glob)?;
        debug!(dir, templates = tera.get_template_names().count(), "templates loaded");
        Ok(Self { tera })
    }

    /// Builds an environment from in-memory `(name, source)` pairs.
    pub fn from_sources<'a, I>(sources: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut tera = Tera::default();
        tera.add_raw_templates(sources)?;
        Ok(Self { tera })
    }

    /// Further Tera configuration (filters, functions, autoescape) before serving.
    pub fn tera_mut(&mut self) -> &mut Tera {
        &mut self.tera
    }
}

impl Renderer for TeraRenderer {
    fn render(&self, template: &str, context: &TemplateContext) -> Result<String, Error> {
        let context = Context::from_value(Value::Object(context.clone()))?;
        Ok(self.tera.render(template, &context)?)
    }
}

//! Page template rendering.

use std::path::Path;

use anyhow::{Context, Result};
use handlebars::Handlebars;
use serde::Serialize;

use super::GistError;
use super::scrape::Author;
use super::timeline::Timeline;

const GIST_TEMPLATE: &str = "gist";
const BUILTIN_GIST_TEMPLATE: &str = include_str!("../../templates/gist.html");

/// View model handed to the `gist` template.
#[derive(Debug, Clone, Serialize)]
pub struct GistView {
    pub last_update: Timeline,
    pub author: Author,
    /// Highlighted source, already HTML.
    pub content: String,
    /// Run transcript, already HTML.
    pub run_tutorial: String,
    pub description: String,
    pub source: String,
    pub chapter: String,
}

/// Renders [`GistView`]s through the `gist` template.
pub struct GistRenderer {
    registry: Handlebars<'static>,
}

impl GistRenderer {
    /// Use `templates_dir/gist.html` when a directory is given, otherwise the
    /// template compiled into the binary.  With `reload` the file is re-read
    /// on every render.
    pub fn new(templates_dir: Option<&Path>, reload: bool) -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);

        match templates_dir {
            Some(dir) => {
                let file = dir.join("gist.html");
                registry.set_dev_mode(reload);
                registry
                    .register_template_file(GIST_TEMPLATE, &file)
                    .with_context(|| format!("failed to load template {}", file.display()))?;
            }
            None => registry
                .register_template_string(GIST_TEMPLATE, BUILTIN_GIST_TEMPLATE)
                .context("failed to compile built-in gist template")?,
        }

        Ok(Self { registry })
    }

    pub fn render(&self, view: &GistView) -> Result<String, GistError> {
        Ok(self.registry.render(GIST_TEMPLATE, view)?)
    }
}

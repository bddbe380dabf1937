use std::path::Path;

use serde::Serialize;
use tera::{Context, Tera};

#[derive(Debug)]
pub enum TemplateError {
    TeraError(tera::Error),
    IoError(std::io::Error),
}

impl From<tera::Error> for TemplateError {
    fn from(err: tera::Error) -> Self {
        TemplateError::TeraError(err)
    }
}

impl From<std::io::Error> for TemplateError {
    fn from(err: std::io::Error) -> Self {
        TemplateError::IoError(err)
    }
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateError::TeraError(e) => write!(f, "Template error: {}", e),
            TemplateError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for TemplateError {}

/// The single-page template used when no theme directory is configured.
pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/page.html");

pub struct Renderer {
    tera: Tera,
    globals: Context,
}

impl Renderer {
    /// Load every `*.html` template under `theme_dir`. A theme must at
    /// least provide `page.html`.
    pub fn from_theme(theme_dir: &Path) -> Result<Self, TemplateError> {
        let pattern = theme_dir.join("**").join("*.html");
        let tera = Tera::new(&pattern.to_string_lossy())?;
        Ok(Self {
            tera,
            globals: Context::new(),
        })
    }

    /// The built-in theme: one embedded `page.html`.
    pub fn built_in() -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        tera.add_raw_template("page.html", DEFAULT_TEMPLATE)?;
        Ok(Self {
            tera,
            globals: Context::new(),
        })
    }

    /// Add a value visible to every render (site config, navigation).
    pub fn set_global<T: Serialize>(&mut self, key: &str, value: &T) {
        self.globals.insert(key, value);
    }

    /// Render a template with the global context plus per-page `context`.
    pub fn render(&self, template: &str, context: &Context) -> Result<String, TemplateError> {
        let mut merged = self.globals.clone();
        merged.extend(context.clone());
        Ok(self.tera.render(template, &merged)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_template_renders_title_and_content() {
        let mut renderer = Renderer::built_in().unwrap();
        renderer.set_global("site", &serde_json::json!({ "title": "My Vault", "tagline": null }));
        renderer.set_global("nav", &serde_json::json!([]));

        let mut context = Context::new();
        context.insert("title", "A Page");
        context.insert("content", "<p>hello</p>");
        context.insert("root", "");

        let html = renderer.render("page.html", &context).unwrap();
        assert!(html.contains("A Page"));
        assert!(html.contains("<p>hello</p>"));
        assert!(html.contains("My Vault"));
    }

    #[test]
    fn per_page_context_overrides_globals() {
        let mut renderer = Renderer::built_in().unwrap();
        renderer.set_global("site", &serde_json::json!({ "title": "Global", "tagline": null }));
        renderer.set_global("nav", &serde_json::json!([]));
        renderer.set_global("title", &"global title");

        let mut context = Context::new();
        context.insert("title", "page title");
        context.insert("content", "");
        context.insert("root", "");

        let html = renderer.render("page.html", &context).unwrap();
        assert!(html.contains("page title"));
    }
}

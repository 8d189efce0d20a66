//! Template rendering for handlers.
//!
//! Handlers call [`Context::render`](crate::Context::render) with a template
//! name and JSON data; the server's [`TemplateEngine`] turns that into bytes.
//! [`MiniJinjaEngine`] is the bundled implementation.

use std::fmt;
use std::fs;
use std::path::Path;

use minijinja::Environment;
use serde_json::Value as JsonValue;

/// Template rendering failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// No template engine was configured on the server
    NotConfigured,
    /// The template is unknown or failed to render
    Render(String),
    /// Template sources could not be loaded
    Load(String),
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::NotConfigured => write!(f, "no template engine configured"),
            TemplateError::Render(msg) => write!(f, "template render failed: {}", msg),
            TemplateError::Load(msg) => write!(f, "template load failed: {}", msg),
        }
    }
}

impl std::error::Error for TemplateError {}

impl From<minijinja::Error> for TemplateError {
    fn from(e: minijinja::Error) -> Self {
        TemplateError::Render(e.to_string())
    }
}

/// Renders a named template with data into bytes
pub trait TemplateEngine: Send + Sync {
    fn render(&self, name: &str, data: &JsonValue) -> Result<Vec<u8>, TemplateError>;
}

/// [`TemplateEngine`] backed by a `minijinja` environment
pub struct MiniJinjaEngine {
    env: Environment<'static>,
}

impl Default for MiniJinjaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MiniJinjaEngine {
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
        }
    }

    /// Register a template from source
    pub fn add_template(
        &mut self,
        name: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<(), TemplateError> {
        self.env
            .add_template_owned(name.into(), source.into())
            .map_err(TemplateError::from)
    }

    /// Register every `*.html` file in `dir` under its file name
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let mut engine = Self::new();
        let entries = fs::read_dir(dir.as_ref()).map_err(|e| TemplateError::Load(e.to_string()))?;
        for entry in entries {
            let path = entry.map_err(|e| TemplateError::Load(e.to_string()))?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("html") {
                continue;
            }
            let Some(name) = path.file_name().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            let source =
                fs::read_to_string(&path).map_err(|e| TemplateError::Load(e.to_string()))?;
            engine.add_template(name, source)?;
        }
        Ok(engine)
    }
}

impl TemplateEngine for MiniJinjaEngine {
    fn render(&self, name: &str, data: &JsonValue) -> Result<Vec<u8>, TemplateError> {
        let tmpl = self.env.get_template(name)?;
        let rendered = tmpl.render(data)?;
        Ok(rendered.into_bytes())
    }
}

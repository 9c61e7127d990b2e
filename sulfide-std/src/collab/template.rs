//! Rendering collaborator.
//!
//! Real template engines are external. Handlers talk to them through
//! [`Renderer`]; [`TextRenderer`] is a minimal engine that substitutes
//! `{{key}}` placeholders.

use crate::config::ConfigTree;
use indexmap::IndexMap;
use regex::{Captures, Regex};
use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    sync::OnceLock,
};
use sulfide_core::{ConfigError, Response};
use thiserror::Error;

/// The `template` settings group.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TemplateSettings {
    /// Where templates are read from.
    pub template_dir: PathBuf,
    /// Engine cache directory.
    #[serde(default)]
    pub cache_dir: PathBuf,
    /// Engine compile directory.
    #[serde(default)]
    pub compile_dir: PathBuf,
}

impl TemplateSettings {
    /// Read the `template` group.
    pub fn from_config(config: &ConfigTree) -> Result<Self, ConfigError> {
        config.get_as(&["template"])
    }
}

/// Rendering failures.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The template file could not be read.
    #[error("failed to read template {path:?}")]
    Io {
        /// The template path.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

/// A template engine bound to one page.
pub trait Renderer {
    /// Make `value` available to the template as `key`.
    fn assign(&mut self, key: &str, value: String);

    /// Render the named template.
    fn render(&self, template: &str) -> Result<String, RenderError>;

    /// Render the named template as a response.
    fn display(&self, template: &str) -> Result<Response, RenderError> {
        self.render(template).map(Response::Content)
    }
}

fn placeholder_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.]*)\s*\}\}").expect("Invalid regex"))
}

/// Substitutes `{{key}}` placeholders. Unassigned keys render as nothing.
#[derive(Debug, Clone)]
pub struct TextRenderer {
    settings: TemplateSettings,
    values: IndexMap<String, String>,
}

impl TextRenderer {
    /// Create a renderer reading templates from `settings.template_dir`.
    pub fn new(settings: TemplateSettings) -> Self {
        Self {
            settings,
            values: IndexMap::new(),
        }
    }

    /// Create a renderer from the `template` settings group.
    pub fn from_config(config: &ConfigTree) -> Result<Self, ConfigError> {
        TemplateSettings::from_config(config).map(Self::new)
    }

    /// The template directory.
    pub fn template_dir(&self) -> &Path {
        &self.settings.template_dir
    }

    /// Render template source directly.
    pub fn render_source(&self, source: &str) -> String {
        placeholder_regex()
            .replace_all(source, |caps: &Captures<'_>| {
                self.values.get(&caps[1]).cloned().unwrap_or_default()
            })
            .into_owned()
    }
}

impl Renderer for TextRenderer {
    fn assign(&mut self, key: &str, value: String) {
        self.values.insert(key.to_owned(), value);
    }

    fn render(&self, template: &str) -> Result<String, RenderError> {
        let path = self.settings.template_dir.join(template);
        let source = std::fs::read_to_string(&path).map_err(|source| RenderError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(self.render_source(&source))
    }
}

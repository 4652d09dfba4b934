//! YAML configuration for a [`Renderer`](crate::Renderer).
//!
//! ```rust
//! use standout_views::{Undefined, ViewConfig};
//!
//! let config = ViewConfig::from_yaml(r#"
//! base_path: templates
//! undefined: lenient
//! "#).unwrap();
//!
//! assert_eq!(config.base_path, "templates");
//! assert_eq!(config.undefined, Undefined::Lenient);
//! assert!(!config.pretty_json);
//! ```

use std::fs;
use std::path::Path;

use minijinja::UndefinedBehavior;
use serde::Deserialize;

use crate::error::ConfigError;

/// How templates treat references to variables missing from the context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Undefined {
    /// Any use of an undefined variable fails the render.
    #[default]
    Strict,
    /// Undefined values print as empty and are falsy.
    Lenient,
    /// Like lenient, and attribute access on undefined is allowed too.
    Chainable,
}

impl From<Undefined> for UndefinedBehavior {
    fn from(value: Undefined) -> Self {
        match value {
            Undefined::Strict => UndefinedBehavior::Strict,
            Undefined::Lenient => UndefinedBehavior::Lenient,
            Undefined::Chainable => UndefinedBehavior::Chainable,
        }
    }
}

/// Renderer settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewConfig {
    /// Directory all template names are relative to.
    pub base_path: String,
    #[serde(default)]
    pub undefined: Undefined,
    /// Indent JSON response bodies.
    #[serde(default)]
    pub pretty_json: bool,
}

impl ViewConfig {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            undefined: Undefined::default(),
            pretty_json: false,
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }
}

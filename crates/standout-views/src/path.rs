//! Base directory normalization for template lookup.
//!
//! Every template name handed to a [`Renderer`](crate::Renderer) is relative to
//! a single base directory. [`BasePath`] stores that directory normalized to end
//! with exactly one separator, so joining is plain concatenation:
//!
//! ```rust
//! use standout_views::BasePath;
//!
//! let base = BasePath::new("templates//").unwrap();
//! assert_eq!(base.as_str(), "templates/");
//! assert_eq!(base.resolve("x.html").to_str(), Some("templates/x.html"));
//! ```
//!
//! No existence check happens here. A missing file surfaces later as
//! [`RenderError::TemplateNotFound`](crate::RenderError::TemplateNotFound).

use std::fmt;
use std::path::{is_separator, PathBuf, MAIN_SEPARATOR};

use crate::error::ConfigError;

/// A template base directory ending in exactly one path separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasePath(String);

impl BasePath {
    /// Normalizes `path`: trailing separators are trimmed, then one is appended.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyBasePath`] for an empty string.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.is_empty() {
            return Err(ConfigError::EmptyBasePath);
        }
        let mut normalized = path.trim_end_matches(is_separator).to_string();
        normalized.push(MAIN_SEPARATOR);
        Ok(Self(normalized))
    }

    /// Joins a relative template name onto the base directory.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        PathBuf::from(format!("{}{}", self.0, relative))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BasePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

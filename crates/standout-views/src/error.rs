//! Error types for view rendering.
//!
//! [`RenderError`] is returned by every render entry point. It abstracts over
//! minijinja's errors so the public API stays stable if the engine changes.
//! [`ConfigError`] covers building a [`Renderer`](crate::Renderer) and
//! [`HelperError`] covers template function registration.

use std::io;
use std::path::PathBuf;

/// Error type for template resolution, compilation and response writing.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A multi-file entry point was called with an empty file list.
    #[error("no template files named in call to render")]
    NoFilesSpecified,

    /// A template name contains the cache key delimiter (a newline).
    #[error("invalid template name {0:?}: names cannot contain newlines")]
    InvalidTemplateName(String),

    /// A template file does not exist under the base path.
    #[error("template not found: {name} ({})", .path.display())]
    TemplateNotFound {
        /// Relative name as passed by the caller
        name: String,
        /// Resolved path that was read
        path: PathBuf,
    },

    /// The engine rejected the template set (syntax error, unknown filter, ...).
    #[error("template parse error: {0}")]
    Parse(String),

    /// The compiled template failed while writing the body.
    #[error("template execution error: {0}")]
    Execution(String),

    /// A JSON body or a render context could not be serialized.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// I/O error reading a template or writing to the response.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RenderError {
    /// Wraps an engine error raised while compiling.
    pub fn parse(err: impl std::fmt::Display) -> Self {
        Self::Parse(err.to_string())
    }

    /// Wraps an engine error raised while executing.
    pub fn execution(err: impl std::fmt::Display) -> Self {
        Self::Execution(err.to_string())
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(err: serde_json::Error) -> Self {
        RenderError::Encoding(err.to_string())
    }
}

/// Errors raised while registering template helper functions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HelperError {
    /// Helper names may only contain ASCII letters.
    #[error("helper name {0:?} can only have alphabetic characters")]
    InvalidName(String),

    /// A dynamic value registered as a helper cannot be called.
    #[error("helper {0:?} is not a function")]
    NotCallable(String),

    /// A helper with the same name was already registered.
    #[error("helper {0:?} is already registered")]
    Duplicate(String),
}

/// Errors raised while building a renderer or loading its configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The renderer was built without a base path.
    #[error("template base path is not set")]
    MissingBasePath,

    /// The configured base path is an empty string.
    #[error("template base path cannot be empty")]
    EmptyBasePath,

    /// The configuration file could not be read.
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The configuration could not be parsed.
    #[error("invalid view config: {0}")]
    Parse(String),

    /// A helper could not be registered.
    #[error(transparent)]
    Helper(#[from] HelperError),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

//! # Standout Views - Cached Template Responses for HTTP Handlers
//!
//! `standout-views` renders HTML views from a directory of template files and
//! writes them as HTTP responses. Templates are identified by an ordered list
//! of file names, compiled once with MiniJinja, and cached for the life of the
//! process.
//!
//! ## Core Concepts
//!
//! - [`Renderer`]: built once at startup, shared by all request handlers
//! - [`BasePath`]: the template directory, fixed when the renderer is built
//! - [`TemplateCache`]: compile-once cache keyed by ordered file lists
//! - [`ResponseSink`]: where responses go; adapt it to your server's response
//!   type, or use [`BufferedResponse`] and convert to an [`http::Response`]
//! - [`HelperRegistry`]: typed helper functions available in every template
//!
//! ## Quick Start
//!
//! ```rust
//! use standout_views::{BufferedResponse, Renderer};
//! use serde_json::json;
//!
//! let dir = tempfile::tempdir()?;
//! std::fs::write(dir.path().join("layout.html"), "<main>{% block body %}{% endblock %}</main>")?;
//! std::fs::write(dir.path().join("hello.html"), "{% block body %}Hi {{ name }}{% endblock %}")?;
//!
//! let views = Renderer::builder()
//!     .base_path(dir.path().to_str().unwrap())
//!     .build()?;
//!
//! let mut res = BufferedResponse::new();
//! let ctx = json!({ "name": "Ann" });
//! views.render_file_in_layout(&mut res, "layout.html", "hello.html", &ctx, None)?;
//!
//! let res = res.into_response();
//! assert_eq!(res.status(), 200);
//! assert_eq!(res.headers()["content-type"], "text/html");
//! assert_eq!(res.body(), b"<main>Hi Ann</main>");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Layouts
//!
//! A set is composed in list order: the first file is the outer document and
//! each following file fills in (or overrides) blocks of the files before
//! it. The layout entry points always put the layout first.
//!
//! ## Errors
//!
//! Template, encoding and I/O failures surface as [`RenderError`]. The
//! primary entry points never try a second response on failure;
//! [`Renderer::render_error`] is the one path that recovers, with a plain text
//! body holding the status reason phrase.

pub mod config;
mod error;
pub mod path;
pub mod renderer;
pub mod response;
pub mod template;

pub use config::{Undefined, ViewConfig};
pub use error::{ConfigError, HelperError, RenderError};
pub use path::BasePath;
pub use renderer::{Renderer, RendererBuilder};
pub use response::{BufferedResponse, ResponseSink};
pub use template::{
    CompiledTemplate, HelperFn, HelperRegistry, MiniJinjaEngine, TemplateCache, TemplateEngine,
    TemplateKey, TemplateSource,
};

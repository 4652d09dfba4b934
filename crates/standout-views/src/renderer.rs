//! HTTP view renderer.
//!
//! [`Renderer`] is the entry point request handlers call. It owns the
//! [`TemplateCache`] and the base path, is built once at startup and then
//! shared by reference (it is `Send + Sync`).
//!
//! # Entry Points
//!
//! | Method | Template set |
//! |--------|--------------|
//! | [`render_file`](Renderer::render_file) | `[file]` |
//! | [`render_files`](Renderer::render_files) | `[f₁, f₂, …]` |
//! | [`render_file_in_layout`](Renderer::render_file_in_layout) | `[layout, file]` |
//! | [`render_files_in_layout`](Renderer::render_files_in_layout) | `[layout, f₁, f₂, …]` |
//! | [`render_json`](Renderer::render_json) | none, serialized value |
//! | [`render_error`](Renderer::render_error) | `[file]`, buffered, plain text fallback |
//!
//! The layout always comes first: it is the outer document and the content
//! files fill in its blocks (see [`crate::template::engine`]).
//!
//! # Response Sequence
//!
//! Every successful render runs the same steps, in this order:
//!
//! 1. fetch or compile the template and serialize the context
//! 2. pick the status: the explicit argument, or `200 OK`
//! 3. set `Content-Type`
//! 4. write the status line
//! 5. stream the body straight from the template into the sink
//!
//! A failure in step 1 writes nothing. A failure in step 5 happens after the
//! status line, and possibly part of the body, went out. That response is
//! truncated and cannot be replaced by another one; the error is returned and
//! logged, and the request should be aborted. This is an accepted failure
//! mode, not something to retry.
//!
//! # Errors
//!
//! Errors from the primary entry points are fatal for the request. Only
//! [`render_error`](Renderer::render_error) recovers: it buffers the page
//! instead of streaming it, so any failure can still be replaced by a fixed
//! plain-text body.
//!
//! # Example
//!
//! ```rust,no_run
//! use standout_views::{BufferedResponse, Renderer};
//! use http::StatusCode;
//! use serde_json::json;
//!
//! let views = Renderer::builder().base_path("templates").build()?;
//!
//! let mut res = BufferedResponse::new();
//! let ctx = json!({ "user": "ann" });
//! views.render_file_in_layout(&mut res, "layout.html", "home.html", &ctx, None)?;
//!
//! let mut res = BufferedResponse::new();
//! views.render_error(&mut res, "errors/404.html", StatusCode::NOT_FOUND);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use http::header::{HeaderValue, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use http::StatusCode;
use minijinja::{Error, Value};
use serde::Serialize;

use crate::config::{Undefined, ViewConfig};
use crate::error::{ConfigError, HelperError, RenderError};
use crate::path::BasePath;
use crate::response::{BodyWriter, ResponseSink};
use crate::template::{HelperRegistry, MiniJinjaEngine, TemplateCache, TemplateEngine};

const TEXT_HTML: &str = "text/html";
const APPLICATION_JSON: &str = "application/json";
const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Renders cached templates and JSON values into HTTP responses.
#[derive(Debug)]
pub struct Renderer {
    cache: TemplateCache,
    pretty_json: bool,
}

impl Renderer {
    pub fn builder() -> RendererBuilder {
        RendererBuilder::default()
    }

    /// Builds a renderer from configuration, with no helpers.
    pub fn from_config(config: &ViewConfig) -> Result<Self, ConfigError> {
        RendererBuilder::from_config(config).build()
    }

    pub fn base_path(&self) -> &BasePath {
        self.cache.base_path()
    }

    /// The compiled template cache, for inspection.
    pub fn cache(&self) -> &TemplateCache {
        &self.cache
    }

    /// Compiles a template set without rendering it.
    ///
    /// Useful at startup to fail fast on broken templates and to keep the
    /// first requests from paying the compile cost.
    pub fn precompile<N: AsRef<str>>(&self, files: &[N]) -> Result<(), RenderError> {
        self.cache.get_or_compile(files).map(|_| ())
    }

    /// Serializes `value` and writes it as an `application/json` response.
    ///
    /// The whole body is encoded before anything is written, so on
    /// [`RenderError::Encoding`] the sink is left untouched.
    pub fn render_json<S, T>(
        &self,
        out: &mut S,
        value: &T,
        status: Option<StatusCode>,
    ) -> Result<(), RenderError>
    where
        S: ResponseSink + ?Sized,
        T: Serialize + ?Sized,
    {
        let encoded = if self.pretty_json {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };
        let body = encoded.map_err(|err| {
            tracing::error!(error = %err, "failed to encode JSON response");
            RenderError::from(err)
        })?;

        out.set_header(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        out.write_status(status.unwrap_or(StatusCode::OK));
        out.write_body(&body).map_err(|err| {
            tracing::error!(error = %err, "failed to write JSON response");
            RenderError::Io(err)
        })
    }

    /// Renders a single template file.
    pub fn render_file<S, T>(
        &self,
        out: &mut S,
        file: &str,
        context: &T,
        status: Option<StatusCode>,
    ) -> Result<(), RenderError>
    where
        S: ResponseSink + ?Sized,
        T: Serialize + ?Sized,
    {
        self.render(out, &[file], context, status)
    }

    /// Renders several files composed as one template, in the given order.
    pub fn render_files<S, T, N>(
        &self,
        out: &mut S,
        files: &[N],
        context: &T,
        status: Option<StatusCode>,
    ) -> Result<(), RenderError>
    where
        S: ResponseSink + ?Sized,
        T: Serialize + ?Sized,
        N: AsRef<str>,
    {
        let names: Vec<&str> = files.iter().map(AsRef::as_ref).collect();
        self.render(out, &names, context, status)
    }

    /// Renders `file` inside `layout`.
    pub fn render_file_in_layout<S, T>(
        &self,
        out: &mut S,
        layout: &str,
        file: &str,
        context: &T,
        status: Option<StatusCode>,
    ) -> Result<(), RenderError>
    where
        S: ResponseSink + ?Sized,
        T: Serialize + ?Sized,
    {
        self.render(out, &[layout, file], context, status)
    }

    /// Renders `files` inside `layout`.
    ///
    /// # Errors
    ///
    /// [`RenderError::NoFilesSpecified`] if `files` is empty.
    pub fn render_files_in_layout<S, T, N>(
        &self,
        out: &mut S,
        layout: &str,
        files: &[N],
        context: &T,
        status: Option<StatusCode>,
    ) -> Result<(), RenderError>
    where
        S: ResponseSink + ?Sized,
        T: Serialize + ?Sized,
        N: AsRef<str>,
    {
        if files.is_empty() {
            tracing::error!(layout, "layout render called without content files");
            return Err(RenderError::NoFilesSpecified);
        }
        let names: Vec<&str> = std::iter::once(layout)
            .chain(files.iter().map(AsRef::as_ref))
            .collect();
        self.render(out, &names, context, status)
    }

    /// Renders an error page, falling back to plain text.
    ///
    /// Renders `file` with an empty context into a buffer first. Only a
    /// complete page is sent, as `text/html` with `status`. If the page fails
    /// for any reason (missing file, parse error, execution error), the
    /// response becomes `text/plain` with `status` and the status's reason
    /// phrase followed by a newline as body, e.g. `"Internal Server Error\n"`.
    pub fn render_error<S>(&self, out: &mut S, file: &str, status: StatusCode)
    where
        S: ResponseSink + ?Sized,
    {
        let page = self.cache.get_or_compile(&[file]).and_then(|template| {
            let mut body: Vec<u8> = Vec::new();
            template.execute(&serde_json::Value::Object(Default::default()), &mut body)?;
            Ok(body)
        });

        let (content_type, body) = match page {
            Ok(body) => (TEXT_HTML, body),
            Err(err) => {
                tracing::warn!(
                    file,
                    %status,
                    error = %err,
                    "error page unavailable, sending plain text"
                );
                out.set_header(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
                let reason = status.canonical_reason().unwrap_or("");
                (TEXT_PLAIN, format!("{reason}\n").into_bytes())
            }
        };

        out.set_header(CONTENT_TYPE, HeaderValue::from_static(content_type));
        out.write_status(status);
        if let Err(err) = out.write_body(&body) {
            tracing::error!(file, %status, error = %err, "failed to write error response body");
        }
    }

    fn render<S, T>(
        &self,
        out: &mut S,
        names: &[&str],
        context: &T,
        status: Option<StatusCode>,
    ) -> Result<(), RenderError>
    where
        S: ResponseSink + ?Sized,
        T: Serialize + ?Sized,
    {
        self.execute(out, names, context, status).inspect_err(|err| {
            tracing::error!(files = ?names, error = %err, "render failed");
        })
    }

    fn execute<S, T>(
        &self,
        out: &mut S,
        names: &[&str],
        context: &T,
        status: Option<StatusCode>,
    ) -> Result<(), RenderError>
    where
        S: ResponseSink + ?Sized,
        T: Serialize + ?Sized,
    {
        let template = self.cache.get_or_compile(names)?;
        let context = serde_json::to_value(context)?;

        out.set_header(CONTENT_TYPE, HeaderValue::from_static(TEXT_HTML));
        out.write_status(status.unwrap_or(StatusCode::OK));
        template.execute(&context, &mut BodyWriter::new(out))
    }
}

/// Builder for [`Renderer`].
///
/// The base path is required; everything else has a default.
///
/// ```rust
/// use standout_views::{Renderer, Undefined};
/// use minijinja::Value;
///
/// let views = Renderer::builder()
///     .base_path("templates/")
///     .undefined(Undefined::Lenient)
///     .helper("year", |_: &[Value]| Ok(Value::from(2026)))?
///     .build()?;
///
/// assert_eq!(views.base_path().as_str(), "templates/");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Default)]
pub struct RendererBuilder {
    base_path: Option<String>,
    helpers: HelperRegistry,
    undefined: Undefined,
    pretty_json: bool,
    engine: Option<Box<dyn TemplateEngine>>,
}

impl RendererBuilder {
    pub fn from_config(config: &ViewConfig) -> Self {
        Self::default()
            .base_path(config.base_path.clone())
            .undefined(config.undefined)
            .pretty_json(config.pretty_json)
    }

    /// Directory template names are resolved against.
    pub fn base_path(mut self, path: impl Into<String>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Registers a helper function callable from every template.
    pub fn helper<F>(mut self, name: &str, f: F) -> Result<Self, HelperError>
    where
        F: Fn(&[Value]) -> Result<Value, Error> + Send + Sync + 'static,
    {
        self.helpers.register(name, f)?;
        Ok(self)
    }

    /// Replaces the helper registry.
    pub fn helpers(mut self, helpers: HelperRegistry) -> Self {
        self.helpers = helpers;
        self
    }

    pub fn undefined(mut self, undefined: Undefined) -> Self {
        self.undefined = undefined;
        self
    }

    pub fn pretty_json(mut self, pretty: bool) -> Self {
        self.pretty_json = pretty;
        self
    }

    /// Uses a custom engine instead of [`MiniJinjaEngine`].
    ///
    /// Helpers and the undefined setting only configure the default engine
    /// and are ignored when a custom one is given.
    pub fn engine(mut self, engine: Box<dyn TemplateEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// # Errors
    ///
    /// [`ConfigError::MissingBasePath`] if no base path was set and
    /// [`ConfigError::EmptyBasePath`] if it is empty.
    pub fn build(self) -> Result<Renderer, ConfigError> {
        let base = BasePath::new(self.base_path.ok_or(ConfigError::MissingBasePath)?)?;
        let engine = match self.engine {
            Some(engine) => engine,
            None => Box::new(
                MiniJinjaEngine::with_helpers(self.helpers)
                    .undefined_behavior(self.undefined.into()),
            ),
        };
        tracing::debug!(base = %base, "view renderer ready");
        Ok(Renderer {
            cache: TemplateCache::new(base, engine),
            pretty_json: self.pretty_json,
        })
    }
}

//! Template engine abstraction.
//!
//! This module defines the [`TemplateEngine`] and [`CompiledTemplate`] traits,
//! the seam between the view cache and the templating language. The default
//! implementation is [`MiniJinjaEngine`].
//!
//! ## Composing a File Set
//!
//! A template set is an ordered list of files compiled as one unit. The first
//! file is the outer document. Each later file inherits from the one before
//! it, so a block defined further down the list overrides the block of the
//! same name above it:
//!
//! ```text
//! ["layout.html", "content.html"]
//!
//! layout.html:   <body>{% block content %}{% endblock %}</body>
//! content.html:  {% block content %}Hello{% endblock %}
//! output:        <body>Hello</body>
//! ```
//!
//! Text outside of blocks in the inheriting files is not emitted. Every file is
//! also registered under its own name, so `{% include %}` and `{% import %}`
//! between members of the set work. Files other than the first must not carry
//! their own `{% extends %}` tag.

use std::io;
use std::sync::Arc;

use minijinja::{AutoEscape, Environment, ErrorKind, UndefinedBehavior, Value};

use super::helpers::HelperRegistry;
use crate::error::RenderError;

/// Prefix of the internal names that chain a set's files together.
const LINK_MARKER: char = '\n';

/// One template file: the relative name it was requested under and its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSource {
    pub name: String,
    pub source: String,
}

impl TemplateSource {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }
}

/// A template engine that compiles ordered file sets.
pub trait TemplateEngine: Send + Sync {
    /// Compiles `sources`, in order, into one executable template.
    ///
    /// Called at most once per distinct file list by the cache.
    fn compile(
        &self,
        sources: &[TemplateSource],
    ) -> Result<Arc<dyn CompiledTemplate>, RenderError>;
}

/// An immutable, compiled template set.
pub trait CompiledTemplate: Send + Sync {
    /// Executes the template, streaming output into `out`.
    ///
    /// Output already written before a failure stays written.
    fn execute(
        &self,
        context: &serde_json::Value,
        out: &mut dyn io::Write,
    ) -> Result<(), RenderError>;
}

/// MiniJinja-based template engine.
///
/// Each compiled set gets its own environment holding the set's files plus the
/// registered helpers. Output is always HTML-escaped, whatever the file
/// extension.
///
/// # Example
///
/// ```rust
/// use standout_views::{MiniJinjaEngine, TemplateEngine, TemplateSource};
///
/// let engine = MiniJinjaEngine::new();
/// let compiled = engine
///     .compile(&[TemplateSource::new("hello.txt", "Hello, {{ name }}!")])
///     .unwrap();
///
/// let mut out = Vec::new();
/// compiled
///     .execute(&serde_json::json!({ "name": "World" }), &mut out)
///     .unwrap();
/// assert_eq!(out, b"Hello, World!");
/// ```
#[derive(Debug, Clone)]
pub struct MiniJinjaEngine {
    helpers: HelperRegistry,
    undefined: UndefinedBehavior,
}

impl MiniJinjaEngine {
    /// Creates an engine with no helpers and strict undefined handling.
    pub fn new() -> Self {
        Self::with_helpers(HelperRegistry::new())
    }

    pub fn with_helpers(helpers: HelperRegistry) -> Self {
        Self {
            helpers,
            undefined: UndefinedBehavior::Strict,
        }
    }

    /// Sets how references to missing context variables behave.
    pub fn undefined_behavior(mut self, behavior: UndefinedBehavior) -> Self {
        self.undefined = behavior;
        self
    }

    pub fn helpers(&self) -> &HelperRegistry {
        &self.helpers
    }
}

impl Default for MiniJinjaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine for MiniJinjaEngine {
    fn compile(
        &self,
        sources: &[TemplateSource],
    ) -> Result<Arc<dyn CompiledTemplate>, RenderError> {
        let Some(first) = sources.first() else {
            return Err(RenderError::NoFilesSpecified);
        };

        let mut env = Environment::new();
        env.set_undefined_behavior(self.undefined);
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        self.helpers.bind(&mut env);

        for file in sources {
            if file.name.contains(LINK_MARKER) {
                return Err(RenderError::InvalidTemplateName(file.name.clone()));
            }
            env.add_template_owned(file.name.clone(), file.source.clone())
                .map_err(RenderError::parse)?;
        }

        // Chain each file onto its predecessor. Link names carry the marker,
        // which no file name may contain.
        let mut entry = first.name.clone();
        for (index, file) in sources.iter().enumerate().skip(1) {
            let link = format!("{LINK_MARKER}{index}{LINK_MARKER}{}", file.name);
            let source = format!(
                "{{% extends {} %}}{}",
                serde_json::to_string(&entry)?,
                file.source
            );
            env.add_template_owned(link.clone(), source)
                .map_err(RenderError::parse)?;
            entry = link;
        }

        Ok(Arc::new(MiniJinjaTemplate { env, entry }))
    }
}

struct MiniJinjaTemplate {
    env: Environment<'static>,
    entry: String,
}

impl CompiledTemplate for MiniJinjaTemplate {
    fn execute(
        &self,
        context: &serde_json::Value,
        out: &mut dyn io::Write,
    ) -> Result<(), RenderError> {
        let template = self
            .env
            .get_template(&self.entry)
            .map_err(RenderError::execution)?;
        template
            .render_to_write(Value::from_serialize(context), out)
            .map(|_| ())
            .map_err(|err| match err.kind() {
                ErrorKind::WriteFailure => RenderError::Io(io::Error::other(err.to_string())),
                _ => RenderError::execution(err),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(engine: &MiniJinjaEngine, sources: &[TemplateSource], ctx: serde_json::Value) -> String {
        let compiled = engine.compile(sources).unwrap();
        let mut out = Vec::new();
        compiled.execute(&ctx, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_single_file() {
        let engine = MiniJinjaEngine::new();
        let out = run(
            &engine,
            &[TemplateSource::new("page.txt", "{% for i in items %}{{ i }},{% endfor %}")],
            json!({ "items": ["a", "b", "c"] }),
        );
        assert_eq!(out, "a,b,c,");
    }

    #[test]
    fn test_later_file_overrides_blocks() {
        let engine = MiniJinjaEngine::new();
        let out = run(
            &engine,
            &[
                TemplateSource::new("layout.txt", "[{% block body %}default{% endblock %}]"),
                TemplateSource::new(
                    "content.txt",
                    "ignored {% block body %}{{ msg }}{% endblock %}",
                ),
            ],
            json!({ "msg": "hi" }),
        );
        assert_eq!(out, "[hi]");
    }

    #[test]
    fn test_three_file_chain_last_wins() {
        let engine = MiniJinjaEngine::new();
        let out = run(
            &engine,
            &[
                TemplateSource::new(
                    "a.txt",
                    "{% block x %}a{% endblock %}-{% block y %}a{% endblock %}",
                ),
                TemplateSource::new(
                    "b.txt",
                    "{% block x %}b{% endblock %}{% block y %}b{% endblock %}",
                ),
                TemplateSource::new("c.txt", "{% block y %}c{% endblock %}"),
            ],
            json!({}),
        );
        assert_eq!(out, "b-c");
    }

    #[test]
    fn test_include_between_set_members() {
        let engine = MiniJinjaEngine::new();
        let out = run(
            &engine,
            &[
                TemplateSource::new("page.txt", "<{% include 'nav.txt' %}>"),
                TemplateSource::new("nav.txt", "nav"),
            ],
            json!({}),
        );
        assert_eq!(out, "<nav>");
    }

    #[test]
    fn test_html_files_are_escaped() {
        let engine = MiniJinjaEngine::new();
        let sources = [
            TemplateSource::new("layout.html", "{% block body %}{% endblock %}"),
            TemplateSource::new("content.html", "{% block body %}{{ text }}{% endblock %}"),
        ];
        let out = run(&engine, &sources, json!({ "text": "<b>" }));
        assert_eq!(out, "&lt;b&gt;");
    }

    #[test]
    fn test_non_html_extension_is_still_escaped() {
        let engine = MiniJinjaEngine::new();
        let out = run(
            &engine,
            &[TemplateSource::new("page.tmpl", "<p>{{ x }}</p>")],
            json!({ "x": "<script>alert(1)</script>" }),
        );
        assert_eq!(out, "<p>&lt;script&gt;alert(1)&lt;/script&gt;</p>");
    }

    #[test]
    fn test_member_named_like_a_chain_step_is_kept() {
        let engine = MiniJinjaEngine::new();
        let out = run(
            &engine,
            &[
                TemplateSource::new("layout.txt", "[{% block b %}{% endblock %}]"),
                TemplateSource::new(
                    "content.txt",
                    "{% block b %}{% include '#1/content.txt' %}{% endblock %}",
                ),
                TemplateSource::new("#1/content.txt", "x"),
            ],
            json!({}),
        );
        assert_eq!(out, "[x]");
    }

    #[test]
    fn test_name_with_link_marker_rejected() {
        let engine = MiniJinjaEngine::new();
        let result = engine.compile(&[TemplateSource::new("a\nb.txt", "x")]);
        assert!(matches!(result, Err(RenderError::InvalidTemplateName(_))));
    }

    #[test]
    fn test_syntax_error_is_parse_error() {
        let engine = MiniJinjaEngine::new();
        let result = engine.compile(&[TemplateSource::new("bad.txt", "{{ unclosed")]);
        assert!(matches!(result, Err(RenderError::Parse(_))));
    }

    #[test]
    fn test_empty_set_rejected() {
        let engine = MiniJinjaEngine::new();
        assert!(matches!(engine.compile(&[]), Err(RenderError::NoFilesSpecified)));
    }

    #[test]
    fn test_strict_undefined_fails_at_execution() {
        let engine = MiniJinjaEngine::new();
        let compiled = engine
            .compile(&[TemplateSource::new("t.txt", "{{ missing }}")])
            .unwrap();
        let mut out = Vec::new();
        let result = compiled.execute(&json!({}), &mut out);
        assert!(matches!(result, Err(RenderError::Execution(_))));
    }

    #[test]
    fn test_lenient_undefined_renders_empty() {
        let engine = MiniJinjaEngine::new().undefined_behavior(UndefinedBehavior::Lenient);
        let out = run(&engine, &[TemplateSource::new("t.txt", "[{{ missing }}]")], json!({}));
        assert_eq!(out, "[]");
    }

    #[test]
    fn test_helpers_are_bound() {
        let mut helpers = HelperRegistry::new();
        helpers
            .register("greet", |args: &[Value]| {
                Ok(Value::from(format!("hello {}", args[0])))
            })
            .unwrap();
        let engine = MiniJinjaEngine::with_helpers(helpers);
        let out = run(
            &engine,
            &[TemplateSource::new("t.txt", "{{ greet(name) }}")],
            json!({ "name": "ann" }),
        );
        assert_eq!(out, "hello ann");
    }
}

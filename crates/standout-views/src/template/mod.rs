//! Template compilation and caching.
//!
//! - [`TemplateEngine`] / [`CompiledTemplate`]: the seam to the templating
//!   language, with [`MiniJinjaEngine`] as the default
//! - [`HelperRegistry`]: named functions bound into every compiled set
//! - [`TemplateCache`]: compile-once cache keyed by ordered file lists
//!
//! See [`engine`] for how a multi-file set is composed.

pub mod cache;
pub mod engine;
pub mod helpers;

pub use cache::{TemplateCache, TemplateKey};
pub use engine::{CompiledTemplate, MiniJinjaEngine, TemplateEngine, TemplateSource};
pub use helpers::{HelperFn, HelperRegistry};

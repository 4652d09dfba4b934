//! Named helper functions bound into every compiled template.
//!
//! Helpers are registered once, before the [`Renderer`](crate::Renderer) is
//! built, and then bound into each template set when it is compiled:
//!
//! ```rust
//! use standout_views::HelperRegistry;
//! use minijinja::Value;
//!
//! let mut helpers = HelperRegistry::new();
//! helpers
//!     .register("shout", |args: &[Value]| {
//!         let text = args.first().map(|v| v.to_string()).unwrap_or_default();
//!         Ok(Value::from(text.to_uppercase()))
//!     })
//!     .unwrap();
//!
//! assert!(helpers.register("to_upper", |_: &[Value]| Ok(Value::UNDEFINED)).is_err());
//! ```
//!
//! Names are restricted to ASCII letters.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use minijinja::value::{Rest, ValueKind};
use minijinja::{Environment, Error, Value};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::HelperError;

static HELPER_NAME: Lazy<Regex> = Lazy::new(|| Regex::new("^[a-zA-Z]+$").unwrap());

/// Signature every typed helper implements.
pub type HelperFn = dyn Fn(&[Value]) -> Result<Value, Error> + Send + Sync;

#[derive(Clone)]
enum Helper {
    Typed(Arc<HelperFn>),
    Dynamic(Value),
}

/// Registry of template helper functions, keyed by name.
#[derive(Clone, Default)]
pub struct HelperRegistry {
    helpers: BTreeMap<String, Helper>,
}

impl HelperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a typed helper.
    ///
    /// # Errors
    ///
    /// [`HelperError::InvalidName`] if `name` is not purely alphabetic,
    /// [`HelperError::Duplicate`] if the name is taken.
    pub fn register<F>(&mut self, name: &str, f: F) -> Result<(), HelperError>
    where
        F: Fn(&[Value]) -> Result<Value, Error> + Send + Sync + 'static,
    {
        self.insert(name, Helper::Typed(Arc::new(f)))
    }

    /// Registers an existing minijinja value as a helper.
    ///
    /// Useful for values built with [`Value::from_function`]. Plain data
    /// (strings, numbers, sequences, maps, ...) is rejected with
    /// [`HelperError::NotCallable`].
    pub fn register_value(&mut self, name: &str, value: Value) -> Result<(), HelperError> {
        if value.kind() != ValueKind::Plain {
            return Err(HelperError::NotCallable(name.to_string()));
        }
        self.insert(name, Helper::Dynamic(value))
    }

    fn insert(&mut self, name: &str, helper: Helper) -> Result<(), HelperError> {
        if !HELPER_NAME.is_match(name) {
            return Err(HelperError::InvalidName(name.to_string()));
        }
        if self.helpers.contains_key(name) {
            return Err(HelperError::Duplicate(name.to_string()));
        }
        self.helpers.insert(name.to_string(), helper);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.helpers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.helpers.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.helpers.keys().map(String::as_str)
    }

    /// Binds every helper into a minijinja environment.
    pub fn bind(&self, env: &mut Environment<'static>) {
        for (name, helper) in &self.helpers {
            match helper {
                Helper::Typed(f) => {
                    let f = Arc::clone(f);
                    env.add_function(name.clone(), move |args: Rest<Value>| f(&args.0));
                }
                Helper::Dynamic(value) => env.add_global(name.clone(), value.clone()),
            }
        }
    }
}

impl fmt::Debug for HelperRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

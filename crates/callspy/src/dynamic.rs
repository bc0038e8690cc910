//! Dynamically-typed spy targets.
//!
//! Typed spies get their "is this callable?" check from the compiler. When
//! the target is only known at runtime, as a JSON value, a registered name,
//! or a boxed function, the check happens here, once, when the spy is
//! built. Arguments are passed as a `Vec<Value>` and forwarded unchanged.
//!
//! ```
//! use callspy::dynamic::{Registry, Target};
//! use serde_json::{json, Value};
//!
//! let registry = Registry::new().with("stub_fn", |args: &[Value]| {
//!     json!(args[0].as_i64().unwrap_or(0) * args[1].as_i64().unwrap_or(0))
//! });
//!
//! let spy = registry.spy(Target::named("stub_fn")).unwrap();
//! assert_eq!(spy.call_with([5, 3]), json!(15));
//!
//! assert!(registry.spy(json!(42)).is_err());
//! ```

use crate::config::SpyConfig;
use crate::invocable::Invocable;
use crate::result::{SpyError, SpyResult};
use crate::spy::{Spy, SpyBuilder};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Boxed function over a JSON argument list
pub type DynFn = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// Spy over a dynamically-typed target
pub type DynamicSpy = Spy<DynamicCallable, Vec<Value>>;

/// Something that may or may not be invocable
#[derive(Clone)]
pub enum Target {
    /// A function value
    Function(DynFn),
    /// A name to look up in a [`Registry`]
    Named(String),
    /// A plain value; never invocable
    Value(Value),
}

impl Target {
    /// Wrap a function
    pub fn function<F>(func: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Self::Function(Arc::new(func))
    }

    /// Refer to a registered function by name
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

impl From<Value> for Target {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(_) => f.write_str("Function(..)"),
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

/// A resolved, invocable dynamic target
#[derive(Clone)]
pub struct DynamicCallable {
    name: Option<String>,
    func: DynFn,
}

impl DynamicCallable {
    /// Registered name, for targets resolved by name
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl Invocable<Vec<Value>> for DynamicCallable {
    type Output = Value;

    fn invoke(&self, args: Vec<Value>) -> Value {
        (self.func)(&args)
    }
}

impl fmt::Debug for DynamicCallable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicCallable")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Name → function table for [`Target::Named`]
#[derive(Clone, Default)]
pub struct Registry {
    functions: HashMap<String, DynFn>,
}

impl Registry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function, replacing any previous one with that name
    pub fn register<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(func));
    }

    /// Builder form of [`Registry::register`]
    #[must_use]
    pub fn with<F>(mut self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        self.register(name, func);
        self
    }

    /// Whether `name` is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Number of registered functions
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Check that `target` is invocable and resolve it
    ///
    /// # Errors
    ///
    /// Returns [`SpyError::InvalidTarget`] for plain values and for names
    /// that aren't registered.
    pub fn resolve(&self, target: &Target) -> SpyResult<DynamicCallable> {
        match target {
            Target::Function(func) => Ok(DynamicCallable {
                name: None,
                func: Arc::clone(func),
            }),
            Target::Named(name) => self
                .functions
                .get(name)
                .map(|func| DynamicCallable {
                    name: Some(name.clone()),
                    func: Arc::clone(func),
                })
                .ok_or_else(|| {
                    SpyError::invalid_target(format!("no function registered as '{name}'"))
                }),
            Target::Value(value) => Err(SpyError::invalid_target(format!(
                "{} {value} is not invocable",
                value_kind(value)
            ))),
        }
    }

    /// Build a spy around `target`
    ///
    /// # Errors
    ///
    /// Returns [`SpyError::InvalidTarget`] if the target isn't invocable.
    pub fn spy(&self, target: impl Into<Target>) -> SpyResult<DynamicSpy> {
        self.spy_with_config(target, SpyConfig::default())
    }

    /// Build a spy around `target` with a configuration
    ///
    /// A named target without a configured spy name takes its registered
    /// name.
    ///
    /// # Errors
    ///
    /// Returns [`SpyError::InvalidTarget`] if the target isn't invocable.
    pub fn spy_with_config(
        &self,
        target: impl Into<Target>,
        mut config: SpyConfig,
    ) -> SpyResult<DynamicSpy> {
        let target = target.into();
        let callable = self.resolve(&target).map_err(|err| {
            tracing::debug!(?target, %err, "rejected spy target");
            err
        })?;
        if config.name.is_none() {
            config.name = callable.name.clone();
        }
        Ok(SpyBuilder::new(callable).config(config).build())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("Registry").field("functions", &names).finish()
    }
}

impl Spy<DynamicCallable, Vec<Value>> {
    /// Build a spy around a target that needs no registry
    ///
    /// # Errors
    ///
    /// Returns [`SpyError::InvalidTarget`] for plain values and for any
    /// named target.
    pub fn try_new(target: impl Into<Target>) -> SpyResult<Self> {
        Registry::new().spy(target)
    }

    /// Call with anything convertible to JSON values
    #[track_caller]
    pub fn call_with<I>(&self, args: I) -> Value
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.call(args.into_iter().map(Into::into).collect())
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

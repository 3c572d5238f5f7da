//! The code under test, seen as a set of named single-argument callables.

use crate::compare::Value;
use anyhow::Result;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

pub type Callable = Arc<dyn Fn(&str) -> Result<Value> + Send + Sync>;
type InitFn = Box<dyn Fn() -> Result<()> + Send + Sync>;

/// Outcome of looking a method name up on a subject.
#[derive(Clone)]
pub enum Resolution {
    Resolved(Callable),
    Unresolved,
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Resolved(_) => f.write_str("Resolved(..)"),
            Resolution::Unresolved => f.write_str("Unresolved"),
        }
    }
}

pub trait Subject {
    /// Logical name, e.g. `foo` for a data source called `test_foo`
    fn name(&self) -> &str;

    fn lookup(&self, method: &str) -> Resolution;

    /// Runs once before the first case.
    fn init(&self) -> Result<()> {
        Ok(())
    }
}

/// Name -> callable map, built once and then only queried.
pub struct Registry {
    name: String,
    methods: IndexMap<String, Callable>,
    init: Option<InitFn>,
}

impl Registry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: IndexMap::new(),
            init: None,
        }
    }

    pub fn method<F, V>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&str) -> Result<V> + Send + Sync + 'static,
        V: Into<Value>,
    {
        let callable: Callable =
            Arc::new(move |input: &str| -> Result<Value> { f(input).map(Into::into) });
        self.insert(name, callable);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, callable: Callable) {
        self.methods.insert(name.into(), callable);
    }

    pub fn on_init<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.init = Some(Box::new(f));
        self
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl Subject for Registry {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, method: &str) -> Resolution {
        match self.methods.get(method) {
            Some(callable) => Resolution::Resolved(Arc::clone(callable)),
            None => Resolution::Unresolved,
        }
    }

    fn init(&self) -> Result<()> {
        match &self.init {
            Some(init) => init(),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("name", &self.name)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("init", &self.init.is_some())
            .finish()
    }
}

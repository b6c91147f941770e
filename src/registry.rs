use std::collections::HashMap;
use std::sync::Arc;

use futures::FutureExt;
use futures::future;
use serde_json::Value;

use crate::method::{Arguments, CallContext, FnMethod, HandlerError, Method, ParamSpec};

/// A registered method: its binding descriptor plus the invocable handler.
pub struct RegisteredMethod {
    spec: ParamSpec,
    handler: Arc<dyn Method>,
}

impl RegisteredMethod {
    pub fn spec(&self) -> &ParamSpec {
        &self.spec
    }

    pub fn handler(&self) -> &Arc<dyn Method> {
        &self.handler
    }
}

/// An immutable mapping from method name to handler.
///
/// Built once via [`MethodRegistry::builder`] and read-only thereafter, so it
/// is safely shared across concurrent dispatches without locking.
#[derive(Default)]
pub struct MethodRegistry {
    methods: HashMap<String, RegisteredMethod>,
}

impl MethodRegistry {
    pub fn builder() -> MethodRegistryBuilder {
        MethodRegistryBuilder::default()
    }

    pub fn lookup(&self, name: &str) -> Option<&RegisteredMethod> {
        self.methods.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn method_names(&self) -> Vec<String> {
        self.methods.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// One-time build step for a [`MethodRegistry`].
///
/// Registering the same name twice keeps the last handler, matching a plain
/// map insert.
#[derive(Default)]
pub struct MethodRegistryBuilder {
    methods: HashMap<String, RegisteredMethod>,
}

impl MethodRegistryBuilder {
    /// Register a method with its binding descriptor.
    pub fn method<M>(mut self, name: impl Into<String>, spec: ParamSpec, handler: M) -> Self
    where
        M: Method + 'static,
    {
        self.methods.insert(
            name.into(),
            RegisteredMethod {
                spec,
                handler: Arc::new(handler),
            },
        );
        self
    }

    /// Register a synchronous closure as a method.
    pub fn method_fn<F>(self, name: impl Into<String>, spec: ParamSpec, f: F) -> Self
    where
        F: Fn(Arguments, CallContext) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        self.method(
            name,
            spec,
            FnMethod::new(move |args, cx| future::ready(f(args, cx)).boxed()),
        )
    }

    pub fn build(self) -> MethodRegistry {
        MethodRegistry {
            methods: self.methods,
        }
    }
}

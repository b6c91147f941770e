use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::request::{JsonRpcRequest, RequestParams};

/// How an incoming `params` value maps onto a method's arguments.
///
/// Declared at registration time as data — no signature introspection
/// happens at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamSpec {
    /// An ordered list of parameter names. Array params bind positionally;
    /// object params bind each declared name in declaration order. An empty
    /// list declares a zero-argument method that ignores its params.
    Named(Vec<String>),
    /// The method receives the whole params value as one argument,
    /// whatever its shape.
    Aggregate,
    /// Raw pass-through without name-based remapping: array params spread
    /// positionally, object params arrive as one aggregate value.
    Variadic,
}

impl ParamSpec {
    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ParamSpec::Named(names.into_iter().map(Into::into).collect())
    }
}

/// Bound arguments as seen by a method.
#[derive(Debug, Clone, PartialEq)]
pub enum Arguments {
    /// A positional list produced by `ParamSpec::Named` or variadic array
    /// params. Slots for parameters absent from the request hold `Value::Null`.
    Positional(Vec<Value>),
    /// The raw params value, for aggregate methods and variadic object params.
    Aggregate(Value),
}

impl Arguments {
    pub fn get(&self, index: usize) -> Option<&Value> {
        match self {
            Arguments::Positional(args) => args.get(index),
            Arguments::Aggregate(_) => None,
        }
    }

    pub fn aggregate(&self) -> Option<&Value> {
        match self {
            Arguments::Positional(_) => None,
            Arguments::Aggregate(value) => Some(value),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Arguments::Positional(args) => args.len(),
            Arguments::Aggregate(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Arguments::Positional(args) if args.is_empty())
    }
}

/// Bind a params value to a method's declared argument shape.
///
/// Total over its input domain: every params shape binds to something, so
/// binding can never fail a request. Extra positional elements beyond the
/// declared names are dropped; missing trailing ones pad with null.
pub fn bind(spec: &ParamSpec, params: &RequestParams) -> Arguments {
    match spec {
        ParamSpec::Aggregate => Arguments::Aggregate(params.to_value()),
        ParamSpec::Variadic => match params {
            RequestParams::Array(items) => Arguments::Positional(items.clone()),
            RequestParams::Object(_) => Arguments::Aggregate(params.to_value()),
        },
        ParamSpec::Named(names) => {
            let args = match params {
                RequestParams::Array(items) => names
                    .iter()
                    .enumerate()
                    .map(|(i, _)| items.get(i).cloned().unwrap_or(Value::Null))
                    .collect(),
                RequestParams::Object(map) => names
                    .iter()
                    .map(|name| map.get(name).cloned().unwrap_or(Value::Null))
                    .collect(),
            };
            Arguments::Positional(args)
        }
    }
}

/// A failed method invocation.
///
/// `Application` errors carry an explicit code/message/data and pass through
/// to the caller verbatim. Anything else is a `Fault`: it is logged and
/// masked as `-32603 Internal error` so implementation detail never leaks
/// into a response.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{message} (code {code})")]
    Application {
        code: i64,
        message: String,
        data: Option<Value>,
    },
    #[error("handler fault: {0}")]
    Fault(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    pub fn application(code: i64, message: impl Into<String>) -> Self {
        HandlerError::Application {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn application_with_data(code: i64, message: impl Into<String>, data: Value) -> Self {
        HandlerError::Application {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// `-32602 Invalid params` — reserved for handlers rejecting their
    /// arguments; the dispatcher never raises it itself.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::application(-32602, message)
    }

    pub fn fault(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        HandlerError::Fault(Box::new(err))
    }
}

/// Per-dispatch context handed to a method alongside its arguments.
///
/// Carries caller-supplied metadata plus the validated request being served.
/// Cloned per dispatch; methods only ever read it.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub metadata: HashMap<String, Value>,
    pub request: JsonRpcRequest,
}

impl CallContext {
    pub fn new(metadata: HashMap<String, Value>, request: JsonRpcRequest) -> Self {
        Self { metadata, request }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }
}

/// A named, invocable unit owned by the registry.
#[async_trait]
pub trait Method: Send + Sync {
    async fn call(&self, args: Arguments, cx: CallContext) -> Result<Value, HandlerError>;
}

/// A method backed by an async closure.
pub struct FnMethod<F>
where
    F: Fn(Arguments, CallContext) -> futures::future::BoxFuture<'static, Result<Value, HandlerError>>
        + Send
        + Sync,
{
    f: F,
}

impl<F> FnMethod<F>
where
    F: Fn(Arguments, CallContext) -> futures::future::BoxFuture<'static, Result<Value, HandlerError>>
        + Send
        + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> Method for FnMethod<F>
where
    F: Fn(Arguments, CallContext) -> futures::future::BoxFuture<'static, Result<Value, HandlerError>>
        + Send
        + Sync,
{
    async fn call(&self, args: Arguments, cx: CallContext) -> Result<Value, HandlerError> {
        (self.f)(args, cx).await
    }
}

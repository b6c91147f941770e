//! # JSON-RPC 2.0 Request Processor
//!
//! A pure, transport-agnostic JSON-RPC 2.0 request processor. This crate owns
//! the validation, method resolution, parameter binding and batch
//! orchestration logic — and nothing else. It holds no socket, no HTTP
//! framework and no wire transport; callers hand it a parsed value or a JSON
//! string and receive back a response envelope (or no value, for
//! notifications).
//!
//! ## Features
//! - Full JSON-RPC 2.0 envelope validation with the standard error codes
//! - Declarative parameter binding: positional, named, aggregate or variadic,
//!   declared as data at registration time
//! - Immutable method registry, safely shared across concurrent dispatches
//! - Batch fan-out with concurrent execution and input-order responses
//! - Application errors pass through verbatim; unclassified handler faults
//!   are logged and masked as `Internal error`
//!
//! ## Example
//! ```
//! use jsonrpc_dispatch::prelude::*;
//! use serde_json::{Value, json};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let registry = MethodRegistry::builder()
//!     .method_fn("add", ParamSpec::named(["a", "b"]), |args, _cx| {
//!         let a = args.get(0).and_then(Value::as_i64).unwrap_or(0);
//!         let b = args.get(1).and_then(Value::as_i64).unwrap_or(0);
//!         Ok(json!(a + b))
//!     })
//!     .build();
//!
//! let processor = JsonRpcProcessor::new(registry);
//! let output = processor
//!     .handle_str(r#"{"jsonrpc":"2.0","method":"add","params":[2,2],"id":1}"#)
//!     .await
//!     .expect("a request with an id always gets a response");
//! assert_eq!(
//!     serde_json::to_value(&output).unwrap(),
//!     json!({"jsonrpc": "2.0", "result": 4, "id": 1})
//! );
//! # }
//! ```

pub mod dispatch;
pub mod error;
pub mod method;
pub mod prelude;
pub mod registry;
pub mod request;
pub mod response;
pub mod types;

// Re-export main types
pub use dispatch::{JsonRpcProcessor, validate};
pub use error::{JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject};
pub use method::{Arguments, CallContext, FnMethod, HandlerError, Method, ParamSpec, bind};
pub use registry::{MethodRegistry, MethodRegistryBuilder, RegisteredMethod};
pub use request::{JsonRpcRequest, RequestParams};
pub use response::{JsonRpcMessage, JsonRpcOutput, JsonRpcResponse};
pub use types::{JsonRpcVersion, RequestId};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}

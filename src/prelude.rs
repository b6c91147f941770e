//! Convenient re-exports of the most commonly used types.
//!
//! ```rust
//! use jsonrpc_dispatch::prelude::*;
//! ```

pub use crate::dispatch::{JsonRpcProcessor, validate};
pub use crate::error::{JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject};
pub use crate::method::{Arguments, CallContext, FnMethod, HandlerError, Method, ParamSpec};
pub use crate::registry::{MethodRegistry, MethodRegistryBuilder};
pub use crate::request::{JsonRpcRequest, RequestParams};
pub use crate::response::{JsonRpcMessage, JsonRpcOutput, JsonRpcResponse};
pub use crate::types::{JsonRpcVersion, RequestId};

// Standard error codes
pub use crate::error_codes::*;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::JsonRpcError;
use crate::types::{JsonRpcVersion, RequestId};

/// A successful JSON-RPC response envelope.
///
/// The `result` member is the handler's return value verbatim — a `null`
/// result is a legitimate result and still serializes into the envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub result: Value,
    pub id: RequestId,
}

impl JsonRpcResponse {
    pub fn new(id: RequestId, result: Value) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            result,
            id,
        }
    }
}

/// Either a successful response or an error response.
///
/// Keeping the two envelopes as separate types means a message can never
/// carry both `result` and `error` members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    Response(JsonRpcResponse),
    Error(JsonRpcError),
}

impl JsonRpcMessage {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self::Response(JsonRpcResponse::new(id, result))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, JsonRpcMessage::Error(_))
    }

    /// The id of the request this message answers. `None` only for error
    /// envelopes whose originating id was unextractable (serialized as null).
    pub fn id(&self) -> Option<&RequestId> {
        match self {
            JsonRpcMessage::Response(resp) => Some(&resp.id),
            JsonRpcMessage::Error(err) => err.id.as_ref(),
        }
    }
}

impl From<JsonRpcResponse> for JsonRpcMessage {
    fn from(response: JsonRpcResponse) -> Self {
        Self::Response(response)
    }
}

impl From<JsonRpcError> for JsonRpcMessage {
    fn from(error: JsonRpcError) -> Self {
        Self::Error(error)
    }
}

/// Everything one `handle` call can yield: a single envelope or a batch of
/// them. Notifications yield nothing at all, so the processor wraps this in
/// `Option` — an all-notification batch is `None`, never an empty array.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JsonRpcOutput {
    Single(JsonRpcMessage),
    Batch(Vec<JsonRpcMessage>),
}

impl JsonRpcOutput {
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn as_single(&self) -> Option<&JsonRpcMessage> {
        match self {
            JsonRpcOutput::Single(msg) => Some(msg),
            JsonRpcOutput::Batch(_) => None,
        }
    }

    pub fn as_batch(&self) -> Option<&[JsonRpcMessage]> {
        match self {
            JsonRpcOutput::Single(_) => None,
            JsonRpcOutput::Batch(msgs) => Some(msgs),
        }
    }
}

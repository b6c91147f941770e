use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::JSONRPC_VERSION;
use crate::error::{JsonRpcError, JsonRpcErrorObject};
use crate::method::{CallContext, HandlerError, bind};
use crate::registry::MethodRegistry;
use crate::request::{JsonRpcRequest, RequestParams};
use crate::response::{JsonRpcMessage, JsonRpcOutput, JsonRpcResponse};
use crate::types::{JsonRpcVersion, RequestId};

/// Check a candidate value against the JSON-RPC 2.0 envelope rules and
/// normalize it into a [`JsonRpcRequest`].
///
/// Every failure is `-32600 Invalid Request`. The id travels into the error
/// envelope whenever it is extractable (string, number or null); a top-level
/// value that is not even an object reports with `id: null`.
pub fn validate(value: Value) -> Result<JsonRpcRequest, JsonRpcError> {
    let Value::Object(obj) = value else {
        return Err(JsonRpcError::invalid_request(None));
    };

    // Extract the id up front so later failures can echo it back.
    let id = match obj.get("id") {
        None => None,
        Some(Value::Null) => Some(RequestId::Null),
        Some(Value::String(s)) => Some(RequestId::String(s.clone())),
        Some(Value::Number(n)) => Some(RequestId::Number(n.clone())),
        Some(_) => return Err(JsonRpcError::invalid_request(None)),
    };

    match obj.get("jsonrpc") {
        Some(Value::String(version)) if version == JSONRPC_VERSION => {}
        _ => return Err(JsonRpcError::invalid_request(id)),
    }

    let method = match obj.get("method") {
        Some(Value::String(method)) => method.clone(),
        _ => return Err(JsonRpcError::invalid_request(id)),
    };

    let params = match obj.get("params") {
        None | Some(Value::Null) => RequestParams::empty(),
        Some(Value::Array(items)) => RequestParams::Array(items.clone()),
        Some(Value::Object(map)) => RequestParams::Object(
            map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        ),
        Some(_) => return Err(JsonRpcError::invalid_request(id)),
    };

    Ok(JsonRpcRequest {
        version: JsonRpcVersion::V2_0,
        method,
        params,
        id,
    })
}

/// Transport-agnostic JSON-RPC 2.0 request processor.
///
/// Owns an immutable [`MethodRegistry`] and turns raw payloads (single
/// objects, batches, or JSON text) into response envelopes. It holds no
/// socket and no serialization transport; callers hand it a parsed value or
/// a string and collect whatever output the protocol defines for it.
#[derive(Clone)]
pub struct JsonRpcProcessor {
    registry: Arc<MethodRegistry>,
}

impl JsonRpcProcessor {
    pub fn new(registry: MethodRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &MethodRegistry {
        &self.registry
    }

    /// Process a JSON text payload. Unparseable input yields
    /// `-32700 Parse error` with `id: null` before any dispatch happens.
    pub async fn handle_str(&self, input: &str) -> Option<JsonRpcOutput> {
        self.handle_str_with_context(input, HashMap::new()).await
    }

    pub async fn handle_str_with_context(
        &self,
        input: &str,
        metadata: HashMap<String, Value>,
    ) -> Option<JsonRpcOutput> {
        let value: Value = match serde_json::from_str(input) {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(error = %err, "rejecting unparseable payload");
                return Some(JsonRpcOutput::Single(JsonRpcError::parse_error().into()));
            }
        };
        self.handle_value_with_context(value, metadata).await
    }

    /// Process an already-parsed payload: one request object or a batch array.
    ///
    /// Returns `None` when the protocol defines no response — a single
    /// notification, or a batch consisting solely of notifications.
    pub async fn handle_value(&self, value: Value) -> Option<JsonRpcOutput> {
        self.handle_value_with_context(value, HashMap::new()).await
    }

    pub async fn handle_value_with_context(
        &self,
        value: Value,
        metadata: HashMap<String, Value>,
    ) -> Option<JsonRpcOutput> {
        match value {
            Value::Array(entries) => {
                if entries.is_empty() {
                    return Some(JsonRpcOutput::Single(
                        JsonRpcError::invalid_request(None).into(),
                    ));
                }

                tracing::debug!(requests = entries.len(), "dispatching batch");

                // Each entry is its own future; join_all runs them
                // concurrently and yields completions in input order, so the
                // response array keeps the relative order of its requests
                // even when execution finishes out of order.
                let dispatches: Vec<_> = entries
                    .into_iter()
                    .map(|entry| self.dispatch_single(entry, &metadata))
                    .collect();
                let outcomes = futures::future::join_all(dispatches).await;

                // Drop suppressed notification slots, never falsy values.
                let responses: Vec<JsonRpcMessage> = outcomes.into_iter().flatten().collect();
                if responses.is_empty() {
                    None
                } else {
                    Some(JsonRpcOutput::Batch(responses))
                }
            }
            single => self
                .dispatch_single(single, &metadata)
                .await
                .map(JsonRpcOutput::Single),
        }
    }

    /// Validate → resolve → bind → invoke → format, for one request object.
    ///
    /// A validation failure always produces an error envelope, since an
    /// invalid envelope has no well-defined notification status. Once the
    /// envelope is valid, a missing id suppresses every outcome — resolution
    /// errors and handler failures included.
    async fn dispatch_single(
        &self,
        value: Value,
        metadata: &HashMap<String, Value>,
    ) -> Option<JsonRpcMessage> {
        let request = match validate(value) {
            Ok(request) => request,
            Err(error) => return Some(error.into()),
        };

        let suppress = request.is_notification();
        let outcome = self.invoke(request, metadata).await;
        if suppress { None } else { Some(outcome) }
    }

    async fn invoke(
        &self,
        request: JsonRpcRequest,
        metadata: &HashMap<String, Value>,
    ) -> JsonRpcMessage {
        let id = request.id.clone();

        let Some(entry) = self.registry.lookup(&request.method) else {
            return JsonRpcError::method_not_found(id, &request.method).into();
        };

        tracing::debug!(method = %request.method, notification = id.is_none(), "dispatching request");

        let args = bind(entry.spec(), &request.params);
        let cx = CallContext::new(metadata.clone(), request.clone());

        match entry.handler().call(args, cx).await {
            Ok(result) => {
                // An explicit `id: null` is present for response-shape purposes.
                JsonRpcResponse::new(id.unwrap_or(RequestId::Null), result).into()
            }
            Err(HandlerError::Application {
                code,
                message,
                data,
            }) => JsonRpcError::new(id, JsonRpcErrorObject { code, message, data }).into(),
            Err(HandlerError::Fault(fault)) => {
                tracing::error!(method = %request.method, fault = %fault, "handler fault masked as internal error");
                JsonRpcError::internal_error(id, None).into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::{FnMethod, ParamSpec};
    use futures::FutureExt;
    use serde_json::json;
    use std::time::Duration;

    fn arithmetic_registry() -> MethodRegistry {
        MethodRegistry::builder()
            .method_fn("add", ParamSpec::named(["a", "b"]), |args, _cx| {
                let a = args.get(0).and_then(Value::as_i64).unwrap_or(0);
                let b = args.get(1).and_then(Value::as_i64).unwrap_or(0);
                Ok(json!(a + b))
            })
            .method_fn("ping", ParamSpec::named(Vec::<String>::new()), |_args, _cx| {
                Ok(json!("pong"))
            })
            .method_fn("fail", ParamSpec::Aggregate, |_args, _cx| {
                Err(HandlerError::fault(std::io::Error::other(
                    "database exploded",
                )))
            })
            .method_fn("teapot", ParamSpec::Aggregate, |_args, _cx| {
                Err(HandlerError::application_with_data(
                    418,
                    "I'm a teapot",
                    json!({"short": true}),
                ))
            })
            .method_fn("echo", ParamSpec::Aggregate, |args, _cx| {
                Ok(args.aggregate().cloned().unwrap_or(Value::Null))
            })
            .build()
    }

    fn processor() -> JsonRpcProcessor {
        JsonRpcProcessor::new(arithmetic_registry())
    }

    fn single(output: Option<JsonRpcOutput>) -> JsonRpcMessage {
        match output {
            Some(JsonRpcOutput::Single(msg)) => msg,
            other => panic!("expected single response, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_non_object() {
        for value in [json!(null), json!(42), json!("hi"), json!(true)] {
            let error = validate(value).unwrap_err();
            assert_eq!(error.error.code, -32600);
            assert_eq!(error.id, None);
        }
    }

    #[test]
    fn test_validate_version_token() {
        let error = validate(json!({"jsonrpc": "1.0", "method": "add", "id": 1})).unwrap_err();
        assert_eq!(error.error.code, -32600);
        assert_eq!(error.id, Some(RequestId::from(1)));

        let error = validate(json!({"method": "add", "id": "x"})).unwrap_err();
        assert_eq!(error.id, Some(RequestId::from("x")));
    }

    #[test]
    fn test_validate_method_must_be_string() {
        let error = validate(json!({"jsonrpc": "2.0", "method": 5, "id": 1})).unwrap_err();
        assert_eq!(error.error.code, -32600);
        assert_eq!(error.id, Some(RequestId::from(1)));
    }

    #[test]
    fn test_validate_params_shape() {
        let error =
            validate(json!({"jsonrpc": "2.0", "method": "add", "params": 5, "id": 1})).unwrap_err();
        assert_eq!(error.error.code, -32600);

        // absent and null params normalize to an empty array
        let request = validate(json!({"jsonrpc": "2.0", "method": "ping"})).unwrap();
        assert_eq!(request.params, RequestParams::empty());
        let request =
            validate(json!({"jsonrpc": "2.0", "method": "ping", "params": null})).unwrap();
        assert_eq!(request.params, RequestParams::empty());
    }

    #[test]
    fn test_validate_id_types() {
        let error =
            validate(json!({"jsonrpc": "2.0", "method": "add", "id": true})).unwrap_err();
        assert_eq!(error.error.code, -32600);
        assert_eq!(error.id, None);

        let request = validate(json!({"jsonrpc": "2.0", "method": "add", "id": null})).unwrap();
        assert_eq!(request.id, Some(RequestId::Null));
        assert!(!request.is_notification());

        let request = validate(json!({"jsonrpc": "2.0", "method": "add"})).unwrap();
        assert!(request.is_notification());
    }

    #[tokio::test]
    async fn test_single_request_echoes_id() {
        let output = processor()
            .handle_value(json!({"jsonrpc": "2.0", "method": "add", "params": [2, 2], "id": 1}))
            .await;
        let msg = single(output);
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"jsonrpc": "2.0", "result": 4, "id": 1})
        );
    }

    #[tokio::test]
    async fn test_string_round_trip() {
        let output = processor()
            .handle_str(r#"{"jsonrpc":"2.0","method":"add","params":[4,4],"id":2}"#)
            .await
            .expect("request with id must produce output");
        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({"jsonrpc": "2.0", "result": 8, "id": 2})
        );
    }

    #[tokio::test]
    async fn test_positional_and_named_binding_agree() {
        let p = processor();
        let positional = single(
            p.handle_value(json!({"jsonrpc": "2.0", "method": "add", "params": [2, 2], "id": 1}))
                .await,
        );
        let named = single(
            p.handle_value(
                json!({"jsonrpc": "2.0", "method": "add", "params": {"a": 2, "b": 2}, "id": 1}),
            )
            .await,
        );
        assert_eq!(positional, named);
    }

    #[tokio::test]
    async fn test_notification_produces_no_output() {
        let p = processor();

        // success, handler fault, and unknown method alike
        for payload in [
            json!({"jsonrpc": "2.0", "method": "ping"}),
            json!({"jsonrpc": "2.0", "method": "fail"}),
            json!({"jsonrpc": "2.0", "method": "no_such_method"}),
        ] {
            assert_eq!(p.handle_value(payload).await, None);
        }
    }

    #[tokio::test]
    async fn test_falsy_ids_are_answered() {
        let p = processor();

        let msg = single(
            p.handle_value(json!({"jsonrpc": "2.0", "method": "ping", "id": 0}))
                .await,
        );
        assert_eq!(msg.id(), Some(&RequestId::from(0)));

        let msg = single(
            p.handle_value(json!({"jsonrpc": "2.0", "method": "ping", "id": ""}))
                .await,
        );
        assert_eq!(msg.id(), Some(&RequestId::from("")));

        let msg = single(
            p.handle_value(json!({"jsonrpc": "2.0", "method": "ping", "id": null}))
                .await,
        );
        assert_eq!(msg.id(), Some(&RequestId::Null));
        assert!(!msg.is_error());
    }

    #[tokio::test]
    async fn test_method_not_found() {
        let msg = single(
            processor()
                .handle_value(json!({"jsonrpc": "2.0", "method": "no_such_method", "id": 9}))
                .await,
        );
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["error"]["code"], -32601);
        assert_eq!(value["id"], 9);
    }

    #[tokio::test]
    async fn test_handler_fault_is_masked() {
        let msg = single(
            processor()
                .handle_value(json!({"jsonrpc": "2.0", "method": "fail", "id": 3}))
                .await,
        );
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["error"]["code"], -32603);
        assert_eq!(value["error"]["message"], "Internal error");
        assert!(value["error"].get("data").is_none());
        assert_eq!(value["id"], 3);
    }

    #[tokio::test]
    async fn test_application_error_passes_through_verbatim() {
        let msg = single(
            processor()
                .handle_value(json!({"jsonrpc": "2.0", "method": "teapot", "id": 4}))
                .await,
        );
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["error"]["code"], 418);
        assert_eq!(value["error"]["message"], "I'm a teapot");
        assert_eq!(value["error"]["data"], json!({"short": true}));
    }

    #[tokio::test]
    async fn test_parse_error() {
        let msg = single(processor().handle_str("{not json").await);
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["error"]["code"], -32700);
        assert_eq!(value["error"]["message"], "Parse error");
        assert_eq!(value["id"], json!(null));
    }

    #[tokio::test]
    async fn test_empty_batch_is_invalid_request() {
        let msg = single(processor().handle_value(json!([])).await);
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["error"]["code"], -32600);
        assert_eq!(value["id"], json!(null));
    }

    #[tokio::test]
    async fn test_batch_drops_notification_slots_and_keeps_order() {
        let output = processor()
            .handle_value(json!([
                {"jsonrpc": "2.0", "method": "add", "params": [2, 2], "id": 1},
                {"jsonrpc": "2.0", "method": "add", "params": [4, 4], "id": 2},
                {"jsonrpc": "2.0", "method": "ping"},
            ]))
            .await
            .expect("batch with ids must produce output");

        let batch = output.as_batch().expect("expected batch output");
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].id(), Some(&RequestId::from(1)));
        assert_eq!(batch[1].id(), Some(&RequestId::from(2)));
        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!([
                {"jsonrpc": "2.0", "result": 4, "id": 1},
                {"jsonrpc": "2.0", "result": 8, "id": 2},
            ])
        );
    }

    #[tokio::test]
    async fn test_all_notification_batch_yields_nothing() {
        let output = processor()
            .handle_value(json!([
                {"jsonrpc": "2.0", "method": "ping"},
                {"jsonrpc": "2.0", "method": "ping"},
            ]))
            .await;
        assert_eq!(output, None);
    }

    #[tokio::test]
    async fn test_batch_of_invalid_entries() {
        let output = processor()
            .handle_value(json!([1, 2, 3]))
            .await
            .expect("invalid entries still get error envelopes");
        let batch = output.as_batch().unwrap();
        assert_eq!(batch.len(), 3);
        for msg in batch {
            let value = serde_json::to_value(msg).unwrap();
            assert_eq!(value["error"]["code"], -32600);
            assert_eq!(value["id"], json!(null));
        }
    }

    #[tokio::test]
    async fn test_batch_mixes_successes_and_errors() {
        let output = processor()
            .handle_value(json!([
                {"jsonrpc": "2.0", "method": "add", "params": [1, 1], "id": "a"},
                {"jsonrpc": "2.0", "method": "no_such_method", "id": "b"},
                {"jsonrpc": "1.0", "method": "add", "id": "c"},
            ]))
            .await
            .expect("batch must produce output");

        let batch = output.as_batch().unwrap();
        assert_eq!(batch.len(), 3);
        assert!(!batch[0].is_error());
        assert!(batch[1].is_error());
        assert!(batch[2].is_error());
        assert_eq!(batch[2].id(), Some(&RequestId::from("c")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_output_order_is_input_order_despite_completion_order() {
        let registry = MethodRegistry::builder()
            .method(
                "slow",
                ParamSpec::Aggregate,
                FnMethod::new(|_args, _cx| {
                    async {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(json!("slow"))
                    }
                    .boxed()
                }),
            )
            .method(
                "fast",
                ParamSpec::Aggregate,
                FnMethod::new(|_args, _cx| {
                    async {
                        tokio::time::sleep(Duration::from_millis(1)).await;
                        Ok(json!("fast"))
                    }
                    .boxed()
                }),
            )
            .build();
        let p = JsonRpcProcessor::new(registry);

        let output = p
            .handle_value(json!([
                {"jsonrpc": "2.0", "method": "slow", "id": 1},
                {"jsonrpc": "2.0", "method": "fast", "id": 2},
            ]))
            .await
            .expect("batch must produce output");

        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!([
                {"jsonrpc": "2.0", "result": "slow", "id": 1},
                {"jsonrpc": "2.0", "result": "fast", "id": 2},
            ])
        );
    }

    #[tokio::test]
    async fn test_aggregate_method_through_processor() {
        let msg = single(
            processor()
                .handle_value(
                    json!({"jsonrpc": "2.0", "method": "echo", "params": {"k": [1, 2]}, "id": 5}),
                )
                .await,
        );
        assert_eq!(
            serde_json::to_value(&msg).unwrap()["result"],
            json!({"k": [1, 2]})
        );
    }

    #[tokio::test]
    async fn test_context_metadata_reaches_handler() {
        let registry = MethodRegistry::builder()
            .method_fn("whoami", ParamSpec::named(Vec::<String>::new()), |_args, cx| {
                Ok(cx.get("user").cloned().unwrap_or(Value::Null))
            })
            .build();
        let p = JsonRpcProcessor::new(registry);

        let mut metadata = HashMap::new();
        metadata.insert("user".to_string(), json!("alice"));

        let msg = single(
            p.handle_value_with_context(
                json!({"jsonrpc": "2.0", "method": "whoami", "id": 1}),
                metadata,
            )
            .await,
        );
        assert_eq!(serde_json::to_value(&msg).unwrap()["result"], json!("alice"));
    }

    #[tokio::test]
    async fn test_context_carries_originating_request() {
        let registry = MethodRegistry::builder()
            .method_fn("method_name", ParamSpec::named(Vec::<String>::new()), |_args, cx| {
                Ok(json!(cx.request.method))
            })
            .build();
        let p = JsonRpcProcessor::new(registry);

        let msg = single(
            p.handle_value(json!({"jsonrpc": "2.0", "method": "method_name", "id": 1}))
                .await,
        );
        assert_eq!(
            serde_json::to_value(&msg).unwrap()["result"],
            json!("method_name")
        );
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default)]
    pub id: Option<Value>,
}

impl JsonRpcRequest {
    /// New request with a random string id.
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params: Some(params),
            id: Some(Value::String(uuid::Uuid::new_v4().simple().to_string())),
        }
    }
}

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self { jsonrpc: JSONRPC_VERSION.to_string(), id, result: Some(result), error: None }
    }

    pub fn error(id: Option<Value>, error: JsonRpcError) -> Self {
        Self { jsonrpc: JSONRPC_VERSION.to_string(), id, result: None, error: Some(error) }
    }
}

pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const TASK_NOT_FOUND: i32 = -32001;
    pub const TASK_NOT_CANCELABLE: i32 = -32002;
    pub const PUSH_NOTIFICATION_NOT_SUPPORTED: i32 = -32003;
    pub const UNSUPPORTED_OPERATION: i32 = -32004;
    pub const CONTENT_TYPE_NOT_SUPPORTED: i32 = -32005;
}

/// JSON-RPC 2.0 error object, including the A2A task error codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} ({code})")]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), data: None }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn parse_error() -> Self {
        Self::new(codes::PARSE_ERROR, "Invalid JSON payload")
    }

    pub fn invalid_request(detail: impl Into<String>) -> Self {
        Self::new(codes::INVALID_REQUEST, "Request payload validation error")
            .with_data(Value::String(detail.into()))
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(codes::METHOD_NOT_FOUND, "Method not found")
            .with_data(Value::String(method.to_string()))
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(codes::INVALID_PARAMS, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(codes::INTERNAL_ERROR, message)
    }

    pub fn task_not_found() -> Self {
        Self::new(codes::TASK_NOT_FOUND, "Task not found")
    }

    pub fn task_not_cancelable() -> Self {
        Self::new(codes::TASK_NOT_CANCELABLE, "Task cannot be canceled")
    }

    pub fn unsupported_operation() -> Self {
        Self::new(codes::UNSUPPORTED_OPERATION, "This operation is not supported")
    }

    pub fn incompatible_content_types() -> Self {
        Self::new(codes::CONTENT_TYPE_NOT_SUPPORTED, "Incompatible content types")
    }
}

/// A2A method names.
pub mod methods {
    pub const TASKS_SEND: &str = "tasks/send";
    pub const TASKS_SEND_SUBSCRIBE: &str = "tasks/sendSubscribe";
    pub const TASKS_GET: &str = "tasks/get";
    pub const TASKS_CANCEL: &str = "tasks/cancel";
    pub const TASKS_PUSH_NOTIFICATION_SET: &str = "tasks/pushNotification/set";
    pub const TASKS_PUSH_NOTIFICATION_GET: &str = "tasks/pushNotification/get";
    pub const TASKS_RESUBSCRIBE: &str = "tasks/resubscribe";
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_round_trips_id() {
        let json = r#"{"jsonrpc":"2.0","method":"tasks/get","params":{"id":"t1"},"id":1}"#;
        let req: JsonRpcRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.method, methods::TASKS_GET);
        assert_eq!(req.id, Some(json!(1)));

        let generated = JsonRpcRequest::new(methods::TASKS_SEND, json!({}));
        assert_eq!(generated.jsonrpc, "2.0");
        assert!(generated.id.is_some());
    }

    #[test]
    fn error_response_omits_result() {
        let resp = JsonRpcResponse::error(Some(json!("a")), JsonRpcError::task_not_found());
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["error"]["code"], -32001);
        assert_eq!(value["error"]["message"], "Task not found");
        assert!(value.get("result").is_none());
    }

    #[test]
    fn error_codes() {
        assert_eq!(JsonRpcError::parse_error().code, -32700);
        assert_eq!(JsonRpcError::invalid_request("x").code, -32600);
        assert_eq!(JsonRpcError::method_not_found("tasks/x").code, -32601);
        assert_eq!(JsonRpcError::invalid_params("x").code, -32602);
        assert_eq!(JsonRpcError::internal_error("x").code, -32603);
        assert_eq!(JsonRpcError::task_not_cancelable().code, -32002);
        assert_eq!(JsonRpcError::unsupported_operation().code, -32004);
        assert_eq!(JsonRpcError::incompatible_content_types().code, -32005);
        assert_eq!(
            JsonRpcError::unsupported_operation().to_string(),
            "This operation is not supported (-32004)"
        );
    }
}

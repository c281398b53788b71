use thiserror::Error;

#[derive(Debug, Error)]
pub enum A2aClientError {
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSON-RPC error {code}: {message}")]
    JsonRpc { code: i32, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

pub type ClientResult<T> = std::result::Result<T, A2aClientError>;

impl From<crate::jsonrpc::JsonRpcError> for A2aClientError {
    fn from(error: crate::jsonrpc::JsonRpcError) -> Self {
        A2aClientError::JsonRpc { code: error.code, message: error.message }
    }
}

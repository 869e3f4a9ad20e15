//! Error type for the OSINT client: transport / protocol / generic variants
//! via `thiserror`, covering what a client with no session handshake and no
//! multi-transport abstraction actually needs.

use osint_json_rpc::JsonRpcErrorObject;
use thiserror::Error;

pub type OsintClientResult<T> = Result<T, OsintClientError>;

#[derive(Debug, Error)]
pub enum OsintClientError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid JSON in server response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("server rejected the call: {} (code {})", .0.message, .0.code)]
    Rpc(JsonRpcErrorObject),

    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("stream ended unexpectedly")]
    StreamClosed,
}

impl OsintClientError {
    pub fn rpc(error: JsonRpcErrorObject) -> Self {
        Self::Rpc(error)
    }
}

//! Transport-agnostic JSON-RPC 2.0 plumbing shared by the dispatcher's
//! client-facing and collector-facing RPC surfaces.
//!
//! This crate knows nothing about HTTP, SSE, or the dispatcher's domain
//! types. It provides the request/response/error envelopes the JSON-RPC
//! 2.0 spec defines, plus a small method-name dispatcher that routes a
//! parsed request to a registered handler and turns a domain error into
//! a JSON-RPC error object via [`ToJsonRpcError`].

pub mod async_dispatch;
pub mod dispatch;
pub mod error;
pub mod request;
pub mod response;
pub mod types;

pub const JSONRPC_VERSION: &str = "2.0";

pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const SERVER_ERROR_RANGE_START: i64 = -32099;
    pub const SERVER_ERROR_RANGE_END: i64 = -32000;
}

pub use async_dispatch::{JsonRpcDispatcher, JsonRpcHandler, SessionContext, ToJsonRpcError};
pub use dispatch::parse_json_rpc_message;
pub use error::{JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject, JsonRpcTransportError};
pub use request::{JsonRpcNotification, JsonRpcRequest, RequestParams};
pub use response::{JsonRpcMessage, JsonRpcResponse, ResponseResult};
pub use types::{JsonRpcVersion, RequestId};

pub mod prelude {
    pub use crate::async_dispatch::{JsonRpcDispatcher, JsonRpcHandler, SessionContext, ToJsonRpcError};
    pub use crate::dispatch::parse_json_rpc_message;
    pub use crate::error::{JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject};
    pub use crate::request::{JsonRpcNotification, JsonRpcRequest, RequestParams};
    pub use crate::response::{JsonRpcMessage, JsonRpcResponse, ResponseResult};
    pub use crate::types::{JsonRpcVersion, RequestId};
    pub use crate::JSONRPC_VERSION;
}

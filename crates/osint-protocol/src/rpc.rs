use osint_json_rpc::error::JsonRpcErrorObject;
use osint_json_rpc::JsonRpcErrorCode;
use osint_json_rpc::ToJsonRpcError;

use crate::error::OsintError;

/// Maps [`OsintError`] onto JSON-RPC error objects for the handlers that
/// report failures as protocol errors rather than as a `(success, message)`
/// response field (notably transport-level failures outside a handler's own
/// `Result<Value, OsintError>`, and any method that has no success/message
/// shape of its own).
///
/// This lives here rather than in `osint-dispatcher-server` because neither
/// `ToJsonRpcError` nor `OsintError` is owned by that crate.
impl ToJsonRpcError for OsintError {
    fn to_error_object(&self) -> JsonRpcErrorObject {
        match self {
            OsintError::AuthError(_) => {
                JsonRpcErrorObject::server_error(-32001, &self.public_message(), None)
            }
            OsintError::NotFound(msg) => JsonRpcErrorObject::server_error(-32002, msg, None),
            OsintError::Conflict(msg) => JsonRpcErrorObject::server_error(-32003, msg, None),
            OsintError::Unavailable(msg) => JsonRpcErrorObject::server_error(-32004, msg, None),
            OsintError::InvalidArgument(msg) => JsonRpcErrorObject::invalid_params(msg),
            OsintError::Internal(_) => JsonRpcErrorObject::new(
                JsonRpcErrorCode::InternalError,
                Some(self.public_message()),
                None,
            ),
        }
    }
}

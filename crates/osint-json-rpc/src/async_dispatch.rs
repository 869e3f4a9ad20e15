use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    error::JsonRpcError,
    request::{JsonRpcNotification, JsonRpcRequest, RequestParams},
    response::{JsonRpcMessage, ResponseResult},
};

/// Per-call context a handler may need beyond its own params: which
/// transport connection this came in on, and any bearer token already
/// extracted from the request by the caller.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub peer: Option<String>,
    pub metadata: HashMap<String, Value>,
}

/// Trait for handling one JSON-RPC method call. Handlers return domain
/// errors only (`Self::Error`); the dispatcher converts them to protocol
/// errors via [`ToJsonRpcError`].
#[async_trait]
pub trait JsonRpcHandler: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn handle(
        &self,
        method: &str,
        params: Option<RequestParams>,
        session_context: Option<SessionContext>,
    ) -> Result<Value, Self::Error>;

    async fn handle_notification(
        &self,
        method: &str,
        params: Option<RequestParams>,
        session_context: Option<SessionContext>,
    ) -> Result<(), Self::Error> {
        let _ = (method, params, session_context);
        Ok(())
    }

    fn supported_methods(&self) -> Vec<String> {
        vec![]
    }
}

/// Trait for domain error enums that know how to present themselves as a
/// JSON-RPC error object.
pub trait ToJsonRpcError: std::error::Error + Send + Sync + 'static {
    fn to_error_object(&self) -> crate::error::JsonRpcErrorObject;
}

/// Routes JSON-RPC requests by method name to a registered handler.
pub struct JsonRpcDispatcher<E>
where
    E: ToJsonRpcError,
{
    handlers: HashMap<String, Arc<dyn JsonRpcHandler<Error = E>>>,
}

impl<E> JsonRpcDispatcher<E>
where
    E: ToJsonRpcError,
{
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register_method<H>(&mut self, method: impl Into<String>, handler: H)
    where
        H: JsonRpcHandler<Error = E> + 'static,
    {
        self.handlers.insert(method.into(), Arc::new(handler));
    }

    pub fn register_methods<H>(&mut self, methods: Vec<String>, handler: H)
    where
        H: JsonRpcHandler<Error = E> + 'static,
    {
        let handler = Arc::new(handler);
        for method in methods {
            self.handlers.insert(method, handler.clone());
        }
    }

    pub async fn handle_request(
        &self,
        request: JsonRpcRequest,
        session_context: Option<SessionContext>,
    ) -> JsonRpcMessage {
        match self.handlers.get(&request.method) {
            Some(handler) => match handler.handle(&request.method, request.params, session_context).await {
                Ok(result) => JsonRpcMessage::success(request.id, ResponseResult::Success(result)),
                Err(domain_error) => {
                    let error_object = domain_error.to_error_object();
                    JsonRpcMessage::error(JsonRpcError::new(Some(request.id), error_object))
                }
            },
            None => JsonRpcMessage::error(JsonRpcError::method_not_found(request.id, &request.method)),
        }
    }

    pub async fn handle_notification(&self, notification: JsonRpcNotification) {
        if let Some(handler) = self.handlers.get(&notification.method) {
            let _ = handler
                .handle_notification(&notification.method, notification.params, None)
                .await;
        }
    }

    pub fn registered_methods(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }
}

impl<E> Default for JsonRpcDispatcher<E>
where
    E: ToJsonRpcError,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RequestId;
    use serde_json::json;

    #[derive(thiserror::Error, Debug)]
    enum TestError {
        #[error("boom: {0}")]
        Boom(String),
    }

    impl ToJsonRpcError for TestError {
        fn to_error_object(&self) -> crate::error::JsonRpcErrorObject {
            crate::error::JsonRpcErrorObject::internal_error(Some(self.to_string()))
        }
    }

    struct EchoHandler;

    #[async_trait]
    impl JsonRpcHandler for EchoHandler {
        type Error = TestError;

        async fn handle(
            &self,
            method: &str,
            _params: Option<RequestParams>,
            _session_context: Option<SessionContext>,
        ) -> Result<Value, Self::Error> {
            match method {
                "echo" => Ok(json!({"echoed": true})),
                "fail" => Err(TestError::Boom("nope".to_string())),
                _ => unreachable!(),
            }
        }
    }

    #[tokio::test]
    async fn dispatches_to_the_registered_handler() {
        let mut dispatcher: JsonRpcDispatcher<TestError> = JsonRpcDispatcher::new();
        dispatcher.register_method("echo", EchoHandler);

        let request = JsonRpcRequest::new_no_params(RequestId::Number(1), "echo".to_string());
        let response = dispatcher.handle_request(request, None).await;
        assert!(!response.is_error());
    }

    #[tokio::test]
    async fn unregistered_methods_are_method_not_found() {
        let dispatcher: JsonRpcDispatcher<TestError> = JsonRpcDispatcher::new();
        let request = JsonRpcRequest::new_no_params(RequestId::Number(1), "missing".to_string());
        let response = dispatcher.handle_request(request, None).await;
        assert!(response.is_error());
    }

    #[tokio::test]
    async fn handler_errors_convert_to_json_rpc_errors() {
        let mut dispatcher: JsonRpcDispatcher<TestError> = JsonRpcDispatcher::new();
        dispatcher.register_method("fail", EchoHandler);
        let request = JsonRpcRequest::new_no_params(RequestId::Number(1), "fail".to_string());
        let response = dispatcher.handle_request(request, None).await;
        assert!(response.is_error());
    }
}

//! HTTP transport: two independent servers (client-facing, collector-
//! facing), each a JSON-RPC POST endpoint plus one SSE GET route for its
//! streaming RPC. `TcpListener::bind`, then `tokio::spawn` one
//! `http1::Builder::serve_connection` per accepted connection.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use osint_json_rpc::async_dispatch::JsonRpcDispatcher;
use osint_json_rpc::dispatch::JsonRpcMessage as DispatchMessage;
use osint_json_rpc::parse_json_rpc_message;
use osint_protocol::OsintError;
use tokio::net::TcpListener;

use crate::sse::SseStreamBody;
use crate::state::SharedAppState;
use crate::stream::{stream_results, stream_tasks};

type ResponseBody = UnsyncBoxBody<Bytes, Infallible>;

fn text_response(status: StatusCode, body: impl Into<Bytes>) -> Response<ResponseBody> {
    Response::builder()
        .status(status)
        .body(Full::new(body.into()).boxed_unsync())
        .expect("static response is always well-formed")
}

fn json_response(status: StatusCode, body: serde_json::Value) -> Response<ResponseBody> {
    let bytes = Bytes::from(serde_json::to_vec(&body).unwrap_or_default());
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Full::new(bytes).boxed_unsync())
        .expect("static response is always well-formed")
}

fn sse_response(body: SseStreamBody) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "text/event-stream")
        .header("cache-control", "no-cache")
        .body(body.boxed_unsync())
        .expect("static response is always well-formed")
}

fn query_param(req: &Request<Incoming>, name: &str) -> Option<String> {
    let query = req.uri().query()?;
    url_decode_form(query).into_iter().find(|(k, _)| k == name).map(|(_, v)| v)
}

/// Minimal `application/x-www-form-urlencoded`-style query parser: splits
/// on `&` and `=`, percent-decoding neither key nor value beyond the
/// trivial `+`-as-space case the two RPC query params (`token`, `task_id`,
/// both opaque hex/uuid strings) never need.
fn url_decode_form(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?.to_string();
            let value = parts.next().unwrap_or("").replace('+', " ");
            Some((key, value))
        })
        .collect()
}

async fn handle_rpc(
    req: Request<Incoming>,
    dispatcher: Arc<JsonRpcDispatcher<OsintError>>,
) -> Response<ResponseBody> {
    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => return text_response(StatusCode::BAD_REQUEST, "could not read request body"),
    };

    match parse_json_rpc_message(&body) {
        Ok(DispatchMessage::Request(request)) => {
            let message = dispatcher.handle_request(request, None).await;
            let value = serde_json::to_value(&message).unwrap_or(serde_json::Value::Null);
            json_response(StatusCode::OK, value)
        }
        Ok(DispatchMessage::Notification(notification)) => {
            dispatcher.handle_notification(notification).await;
            text_response(StatusCode::NO_CONTENT, "")
        }
        Err(error) => json_response(StatusCode::BAD_REQUEST, serde_json::to_value(&error).unwrap_or(serde_json::Value::Null)),
    }
}

#[derive(Clone)]
struct ClientService {
    state: SharedAppState,
    dispatcher: Arc<JsonRpcDispatcher<OsintError>>,
}

async fn handle_client_request(req: Request<Incoming>, service: ClientService) -> Result<Response<ResponseBody>, Infallible> {
    let path = req.uri().path().to_string();
    let response = match (req.method(), path.as_str()) {
        (&Method::POST, "/rpc") => handle_rpc(req, service.dispatcher).await,
        (&Method::GET, "/stream/results") => {
            let Some(token) = query_param(&req, "token") else {
                return Ok(text_response(StatusCode::BAD_REQUEST, "missing token"));
            };
            let Some(task_id) = query_param(&req, "task_id") else {
                return Ok(text_response(StatusCode::BAD_REQUEST, "missing task_id"));
            };
            if service.state.auth_sessions.username_for(&token).await.is_none() {
                return Ok(text_response(StatusCode::UNAUTHORIZED, "invalid token"));
            }
            sse_response(SseStreamBody::new(stream_results(service.state, task_id)))
        }
        _ => text_response(StatusCode::NOT_FOUND, "not found"),
    };
    Ok(response)
}

#[derive(Clone)]
struct CollectorService {
    state: SharedAppState,
    dispatcher: Arc<JsonRpcDispatcher<OsintError>>,
}

async fn handle_collector_request(
    req: Request<Incoming>,
    service: CollectorService,
) -> Result<Response<ResponseBody>, Infallible> {
    let path = req.uri().path().to_string();
    let response = match (req.method(), path.as_str()) {
        (&Method::POST, "/rpc") => handle_rpc(req, service.dispatcher).await,
        (&Method::GET, "/stream/tasks") => {
            let Some(token) = query_param(&req, "token") else {
                return Ok(text_response(StatusCode::BAD_REQUEST, "missing token"));
            };
            if !service.state.fleet.is_token_live(&token) {
                return Ok(text_response(StatusCode::UNAUTHORIZED, "invalid token"));
            }
            sse_response(SseStreamBody::new(stream_tasks(service.state, token)))
        }
        (&Method::GET, "/metrics") => {
            let metrics = service.state.fleet.all_metrics();
            json_response(StatusCode::OK, serde_json::to_value(metrics).unwrap_or(serde_json::Value::Null))
        }
        _ => text_response(StatusCode::NOT_FOUND, "not found"),
    };
    Ok(response)
}

async fn serve<S, F, Fut>(addr: SocketAddr, service: S, handler: F) -> std::io::Result<()>
where
    S: Clone + Send + Sync + 'static,
    F: Fn(Request<Incoming>, S) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Response<ResponseBody>, Infallible>> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "dispatcher HTTP listener started");

    loop {
        let (stream, peer) = listener.accept().await?;
        tracing::debug!(%peer, "accepted connection");

        let service = service.clone();
        let handler = handler.clone();
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let conn = service_fn(move |req| {
                let service = service.clone();
                let handler = handler.clone();
                async move { handler(req, service).await }
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, conn).await {
                tracing::debug!(error = %err, "connection ended");
            }
        });
    }
}

pub async fn run_client_server(
    state: SharedAppState,
    dispatcher: Arc<JsonRpcDispatcher<OsintError>>,
) -> std::io::Result<()> {
    let addr: SocketAddr = state
        .config
        .client_addr()
        .parse()
        .expect("config.client_addr() is always a valid socket address");
    serve(addr, ClientService { state, dispatcher }, handle_client_request).await
}

pub async fn run_collector_server(
    state: SharedAppState,
    dispatcher: Arc<JsonRpcDispatcher<OsintError>>,
) -> std::io::Result<()> {
    let addr: SocketAddr = state
        .config
        .collector_addr()
        .parse()
        .expect("config.collector_addr() is always a valid socket address");
    serve(addr, CollectorService { state, dispatcher }, handle_collector_request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_decode_form_splits_pairs() {
        let parsed = url_decode_form("token=abc&task_id=t1");
        assert_eq!(
            parsed,
            vec![("token".to_string(), "abc".to_string()), ("task_id".to_string(), "t1".to_string())]
        );
    }

    #[test]
    fn url_decode_form_handles_a_value_less_key() {
        let parsed = url_decode_form("token=abc&flag");
        assert_eq!(parsed[1], ("flag".to_string(), String::new()));
    }
}

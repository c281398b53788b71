use crate::jsonrpc::{JSONRPC_VERSION, JsonRpcError, JsonRpcRequest, JsonRpcResponse, methods};
use crate::task_manager::{TaskManager, TaskResult};
use crate::types::{
    AgentCard, TaskIdParams, TaskPushNotificationConfig, TaskQueryParams, TaskSendParams,
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, Method, StatusCode, header},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::StreamExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::Instrument;

pub const AGENT_CARD_PATH: &str = "/.well-known/agent.json";
pub const DEFAULT_ENDPOINT: &str = "/";
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;
/// Longer than the slowest blockchain call a task manager waits for.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Clone)]
struct AppState {
    agent_card: Arc<AgentCard>,
    task_manager: Arc<dyn TaskManager>,
}

/// HTTP front end for a [`TaskManager`]: JSON-RPC on [`DEFAULT_ENDPOINT`], the card at [`AGENT_CARD_PATH`].
pub struct A2aServer {
    host: String,
    port: u16,
    agent_card: AgentCard,
    task_manager: Arc<dyn TaskManager>,
    max_body_size: usize,
    request_timeout: Duration,
}

impl A2aServer {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        agent_card: AgentCard,
        task_manager: Arc<dyn TaskManager>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            agent_card,
            task_manager,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn agent_card(&self) -> &AgentCard {
        &self.agent_card
    }

    pub fn router(&self) -> Router {
        let state = AppState {
            agent_card: Arc::new(self.agent_card.clone()),
            task_manager: self.task_manager.clone(),
        };

        let cors = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_origin(AllowOrigin::any());

        Router::new()
            .route(AGENT_CARD_PATH, get(get_agent_card))
            .route(DEFAULT_ENDPOINT, post(handle_jsonrpc))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(TimeoutLayer::with_status_code(
                        StatusCode::REQUEST_TIMEOUT,
                        self.request_timeout,
                    ))
                    .layer(DefaultBodyLimit::max(self.max_body_size))
                    .layer(cors)
                    .layer(SetResponseHeaderLayer::if_not_present(
                        header::X_CONTENT_TYPE_OPTIONS,
                        HeaderValue::from_static("nosniff"),
                    )),
            )
    }

    /// Binds `host:port` and serves until Ctrl-C.
    pub async fn serve(self) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.address()).await?;
        self.serve_with_shutdown(listener, shutdown_signal()).await
    }

    pub async fn serve_with_shutdown<F>(
        self,
        listener: tokio::net::TcpListener,
        shutdown: F,
    ) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local = listener.local_addr()?;
        tracing::info!(address = %local, card = AGENT_CARD_PATH, "A2A server listening");
        axum::serve(listener, self.router()).with_graceful_shutdown(shutdown).await?;
        tracing::info!("A2A server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

async fn get_agent_card(State(state): State<AppState>) -> Json<AgentCard> {
    Json(state.agent_card.as_ref().clone())
}

async fn handle_jsonrpc(State(state): State<AppState>, body: Bytes) -> Response {
    let value: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "rejecting unparsable JSON-RPC body");
            return envelope_error(None, JsonRpcError::parse_error());
        }
    };
    let id = value.get("id").cloned();
    let request: JsonRpcRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(e) => return envelope_error(id, JsonRpcError::invalid_request(e.to_string())),
    };
    if request.jsonrpc != JSONRPC_VERSION {
        let detail = format!("unsupported jsonrpc version '{}'", request.jsonrpc);
        return envelope_error(request.id, JsonRpcError::invalid_request(detail));
    }

    let task_id = request.params.as_ref().and_then(|p| p.get("id")).and_then(Value::as_str);
    let span = w3a_telemetry::a2a_request_span(&request.method, task_id);
    dispatch(state.task_manager, request).instrument(span).await
}

async fn dispatch(manager: Arc<dyn TaskManager>, request: JsonRpcRequest) -> Response {
    let JsonRpcRequest { method, params, id, .. } = request;
    match method.as_str() {
        methods::TASKS_SEND => match parse_params::<TaskSendParams>(params) {
            Ok(params) => reply(id, manager.on_send_task(params).await),
            Err(e) => envelope_error(id, e),
        },
        methods::TASKS_SEND_SUBSCRIBE => match parse_params::<TaskSendParams>(params) {
            Ok(params) => match manager.on_send_task_subscribe(params).await {
                Ok(events) => stream_events(id, events),
                Err(e) => reply::<Value>(id, Err(e)),
            },
            Err(e) => envelope_error(id, e),
        },
        methods::TASKS_GET => match parse_params::<TaskQueryParams>(params) {
            Ok(params) => reply(id, manager.on_get_task(params).await),
            Err(e) => envelope_error(id, e),
        },
        methods::TASKS_CANCEL => match parse_params::<TaskIdParams>(params) {
            Ok(params) => reply(id, manager.on_cancel_task(params).await),
            Err(e) => envelope_error(id, e),
        },
        methods::TASKS_PUSH_NOTIFICATION_SET => {
            match parse_params::<TaskPushNotificationConfig>(params) {
                Ok(params) => reply(id, manager.on_set_task_push_notification(params).await),
                Err(e) => envelope_error(id, e),
            }
        }
        methods::TASKS_PUSH_NOTIFICATION_GET => match parse_params::<TaskIdParams>(params) {
            Ok(params) => reply(id, manager.on_get_task_push_notification(params).await),
            Err(e) => envelope_error(id, e),
        },
        methods::TASKS_RESUBSCRIBE => match parse_params::<TaskIdParams>(params) {
            Ok(params) => match manager.on_resubscribe_to_task(params).await {
                Ok(events) => stream_events(id, events),
                Err(e) => reply::<Value>(id, Err(e)),
            },
            Err(e) => envelope_error(id, e),
        },
        other => {
            tracing::warn!(method = %other, "unknown JSON-RPC method");
            envelope_error(id, JsonRpcError::method_not_found(other))
        }
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, JsonRpcError> {
    let params = params.ok_or_else(|| JsonRpcError::invalid_params("Missing params"))?;
    serde_json::from_value(params).map_err(|e| JsonRpcError::invalid_params(e.to_string()))
}

/// Malformed envelopes are rejected with 400.
fn envelope_error(id: Option<Value>, error: JsonRpcError) -> Response {
    (StatusCode::BAD_REQUEST, Json(JsonRpcResponse::error(id, error))).into_response()
}

fn reply<T: Serialize>(id: Option<Value>, result: TaskResult<T>) -> Response {
    let response = match result.and_then(|value| {
        serde_json::to_value(value).map_err(|e| JsonRpcError::internal_error(e.to_string()))
    }) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(error) => JsonRpcResponse::error(id, error),
    };
    Json(response).into_response()
}

fn stream_events(id: Option<Value>, events: crate::task_manager::TaskEventStream) -> Response {
    let stream = events.map(move |item| {
        let response = match item.and_then(|event| {
            serde_json::to_value(event).map_err(|e| JsonRpcError::internal_error(e.to_string()))
        }) {
            Ok(value) => JsonRpcResponse::success(id.clone(), value),
            Err(error) => JsonRpcResponse::error(id.clone(), error),
        };
        Event::default().json_data(response)
    });
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))).into_response()
}

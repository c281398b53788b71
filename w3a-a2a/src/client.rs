use crate::error::{A2aClientError, ClientResult};
use crate::jsonrpc::{JsonRpcRequest, JsonRpcResponse, methods};
use crate::server::AGENT_CARD_PATH;
use crate::types::{
    AgentCard, Task, TaskIdParams, TaskPushNotificationConfig, TaskQueryParams, TaskSendParams,
    TaskUpdateEvent,
};
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::pin::Pin;

pub type TaskUpdateStream = Pin<Box<dyn Stream<Item = ClientResult<TaskUpdateEvent>> + Send>>;

/// Fetches an agent card from `{base_url}/.well-known/agent.json`.
pub struct A2aCardResolver {
    http_client: reqwest::Client,
    base_url: String,
    agent_card_path: String,
}

impl A2aCardResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            agent_card_path: AGENT_CARD_PATH.to_string(),
        }
    }

    pub fn with_agent_card_path(mut self, path: impl Into<String>) -> Self {
        self.agent_card_path = path.into();
        self
    }

    pub async fn get_agent_card(&self) -> ClientResult<AgentCard> {
        let url = format!("{}/{}", self.base_url, self.agent_card_path.trim_start_matches('/'));
        let response = self.http_client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(A2aClientError::Http { status: status.as_u16(), message });
        }
        Ok(response.json().await?)
    }
}

/// JSON-RPC client for one A2A agent endpoint.
pub struct A2aClient {
    http_client: reqwest::Client,
    url: String,
}

impl A2aClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self { http_client: reqwest::Client::new(), url: url.into() }
    }

    pub fn from_card(card: &AgentCard) -> Self {
        Self::new(card.url.clone())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn send_task(&self, params: TaskSendParams) -> ClientResult<Task> {
        self.call(methods::TASKS_SEND, &params).await
    }

    pub async fn get_task(&self, params: TaskQueryParams) -> ClientResult<Task> {
        self.call(methods::TASKS_GET, &params).await
    }

    pub async fn cancel_task(&self, params: TaskIdParams) -> ClientResult<Task> {
        self.call(methods::TASKS_CANCEL, &params).await
    }

    pub async fn set_task_callback(
        &self,
        params: TaskPushNotificationConfig,
    ) -> ClientResult<TaskPushNotificationConfig> {
        self.call(methods::TASKS_PUSH_NOTIFICATION_SET, &params).await
    }

    pub async fn get_task_callback(
        &self,
        params: TaskIdParams,
    ) -> ClientResult<TaskPushNotificationConfig> {
        self.call(methods::TASKS_PUSH_NOTIFICATION_GET, &params).await
    }

    /// Sends `tasks/sendSubscribe` and yields each update carried by the SSE response.
    pub async fn send_task_streaming(
        &self,
        params: TaskSendParams,
    ) -> ClientResult<TaskUpdateStream> {
        let request =
            JsonRpcRequest::new(methods::TASKS_SEND_SUBSCRIBE, serde_json::to_value(&params)?);
        let response = self.post(&request).await?;

        let is_sse = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/event-stream"));
        if !is_sse {
            // Errors come back as a plain JSON-RPC response.
            let rpc: JsonRpcResponse = response.json().await?;
            return Err(rpc_failure(rpc));
        }

        let stream = async_stream::stream! {
            let mut events = response.bytes_stream().eventsource();
            while let Some(event) = events.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        yield Err(A2aClientError::InvalidResponse(e.to_string()));
                        return;
                    }
                };
                if event.data.trim().is_empty() {
                    continue;
                }
                let rpc: JsonRpcResponse = match serde_json::from_str(&event.data) {
                    Ok(rpc) => rpc,
                    Err(e) => {
                        yield Err(A2aClientError::Json(e));
                        continue;
                    }
                };
                yield decode_result::<TaskUpdateEvent>(rpc);
            }
        };
        Ok(Box::pin(stream))
    }

    async fn call<P, R>(&self, method: &str, params: &P) -> ClientResult<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let request = JsonRpcRequest::new(method, serde_json::to_value(params)?);
        tracing::debug!(method, url = %self.url, "sending A2A request");
        let response = self.post(&request).await?;
        let rpc: JsonRpcResponse = response.json().await?;
        decode_result(rpc)
    }

    async fn post(&self, request: &JsonRpcRequest) -> ClientResult<reqwest::Response> {
        let response = self.http_client.post(&self.url).json(request).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        // Envelope errors carry a JSON-RPC body even on non-2xx statuses.
        if let Ok(rpc) = serde_json::from_str::<JsonRpcResponse>(&body) {
            if let Some(error) = rpc.error {
                return Err(error.into());
            }
        }
        Err(A2aClientError::Http { status: status.as_u16(), message: body })
    }
}

fn rpc_failure(rpc: JsonRpcResponse) -> A2aClientError {
    match rpc.error {
        Some(error) => error.into(),
        None => A2aClientError::InvalidResponse("expected an event stream".to_string()),
    }
}

fn decode_result<R: DeserializeOwned>(rpc: JsonRpcResponse) -> ClientResult<R> {
    if let Some(error) = rpc.error {
        return Err(error.into());
    }
    let result = rpc.result.ok_or_else(|| {
        A2aClientError::InvalidResponse("response has neither result nor error".into())
    })?;
    Ok(serde_json::from_value(result)?)
}

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use w3a_a2a::{
    Artifact, InMemoryTaskStore, JsonRpcError, Message, Part, Task, TaskEventStream, TaskManager,
    TaskResult, TaskSendParams, TaskState, TaskStatus, are_modalities_compatible,
};
use w3a_agent::QueryAgent;
use w3a_agent::web3::AGENT_NAME;
use w3a_telemetry::Instrument;

use crate::config::DEFAULT_TASK_TIMEOUT;

/// Marker the agent puts in a reply when the user must supply more information.
pub const MISSING_INFO_MARKER: &str = "MISSING_INFO:";

/// Serves A2A tasks by handing the first text part to a [`QueryAgent`].
pub struct AgentTaskManager<A: QueryAgent> {
    agent: Arc<A>,
    store: InMemoryTaskStore,
    timeout: Duration,
}

impl<A: QueryAgent> AgentTaskManager<A> {
    pub fn new(agent: Arc<A>) -> Self {
        Self { agent, store: InMemoryTaskStore::new(), timeout: DEFAULT_TASK_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn validate(&self, params: &TaskSendParams) -> TaskResult<()> {
        let supported = self.agent.supported_content_types();
        if are_modalities_compatible(Some(supported), params.accepted_output_modes.as_deref()) {
            return Ok(());
        }
        tracing::warn!(
            received = ?params.accepted_output_modes,
            supported = ?supported,
            "unsupported output mode"
        );
        Err(JsonRpcError::incompatible_content_types())
    }

    async fn finish(&self, task_id: &str, state: TaskState, parts: Vec<Part>) -> TaskResult<Task> {
        let status = TaskStatus::new(state).with_message(Message::agent(parts.clone()));
        self.store.update_task(task_id, status, vec![Artifact::from_parts(parts)]).await
    }

    async fn invoke(&self, params: &TaskSendParams, query: &str) -> TaskResult<Task> {
        tracing::info!(task.id = %params.id, query = %query, "invoking agent");
        let span = w3a_telemetry::agent_run_span(AGENT_NAME, &params.id);
        let call = tokio::time::timeout(self.timeout, self.agent.invoke(query, &params.session_id));
        match call.instrument(span).await {
            Ok(Ok(result)) => {
                tracing::info!(response = %result, "agent response received");
                let state = if result.contains(MISSING_INFO_MARKER) {
                    TaskState::InputRequired
                } else {
                    TaskState::Completed
                };
                self.finish(&params.id, state, response_parts(&result)).await
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "error invoking agent");
                let message = format!("Error invoking agent: {e}");
                self.finish(&params.id, TaskState::Failed, vec![Part::text(message)]).await
            }
            Err(_) => {
                let message = format!(
                    "Timeout waiting for response from blockchain after {} seconds",
                    self.timeout.as_secs()
                );
                tracing::error!("{message}");
                self.finish(&params.id, TaskState::Failed, vec![Part::text(message)]).await
            }
        }
    }
}

/// First part's text; other part kinds are rejected.
pub fn user_query(params: &TaskSendParams) -> TaskResult<&str> {
    params
        .message
        .parts
        .first()
        .and_then(Part::as_text)
        .ok_or_else(|| JsonRpcError::invalid_params("Only text parts are supported"))
}

/// Replies that parse as a JSON object or array become a data part; anything else stays text.
pub fn response_parts(result: &str) -> Vec<Part> {
    if result.starts_with('{') || result.starts_with('[') {
        if let Ok(value) = serde_json::from_str::<Value>(result) {
            let data = match value {
                Value::Object(map) => map,
                other => {
                    let mut map = Map::new();
                    map.insert("result".to_string(), other);
                    map
                }
            };
            return vec![Part::data(data)];
        }
        tracing::debug!("reply looked like JSON but did not parse; sending as text");
    }
    vec![Part::text(result)]
}

#[async_trait]
impl<A: QueryAgent + 'static> TaskManager for AgentTaskManager<A> {
    fn store(&self) -> &InMemoryTaskStore {
        &self.store
    }

    async fn on_send_task(&self, params: TaskSendParams) -> TaskResult<Task> {
        self.validate(&params)?;
        let query = user_query(&params)?.to_string();
        self.store.upsert_task(&params).await;
        self.invoke(&params, &query).await
    }

    async fn on_send_task_subscribe(&self, params: TaskSendParams) -> TaskResult<TaskEventStream> {
        self.validate(&params)?;
        tracing::warn!(task.id = %params.id, "streaming requested but not supported");
        Err(JsonRpcError::unsupported_operation())
    }
}

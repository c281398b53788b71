use crate::jsonrpc::JsonRpcError;
use crate::types::{
    Artifact, PushNotificationConfig, Task, TaskIdParams, TaskPushNotificationConfig,
    TaskQueryParams, TaskSendParams, TaskState, TaskStatus, TaskUpdateEvent,
};
use async_trait::async_trait;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use tokio::sync::RwLock;

pub type TaskResult<T> = std::result::Result<T, JsonRpcError>;

pub type TaskEventStream = Pin<Box<dyn Stream<Item = TaskResult<TaskUpdateEvent>> + Send>>;

/// Handles the A2A task methods. Implementors supply sending; the rest defaults to
/// the in-memory [`store`](TaskManager::store).
#[async_trait]
pub trait TaskManager: Send + Sync {
    fn store(&self) -> &InMemoryTaskStore;

    async fn on_send_task(&self, params: TaskSendParams) -> TaskResult<Task>;

    async fn on_send_task_subscribe(&self, params: TaskSendParams) -> TaskResult<TaskEventStream>;

    async fn on_get_task(&self, params: TaskQueryParams) -> TaskResult<Task> {
        tracing::info!(task.id = %params.id, "getting task");
        self.store().get_task(&params).await
    }

    async fn on_cancel_task(&self, params: TaskIdParams) -> TaskResult<Task> {
        tracing::info!(task.id = %params.id, "cancelling task");
        self.store().cancel_task(&params).await
    }

    async fn on_set_task_push_notification(
        &self,
        params: TaskPushNotificationConfig,
    ) -> TaskResult<TaskPushNotificationConfig> {
        self.store()
            .set_push_notification(&params.id, params.push_notification_config.clone())
            .await?;
        Ok(params)
    }

    async fn on_get_task_push_notification(
        &self,
        params: TaskIdParams,
    ) -> TaskResult<TaskPushNotificationConfig> {
        let config = self.store().get_push_notification(&params.id).await?;
        Ok(TaskPushNotificationConfig { id: params.id, push_notification_config: config })
    }

    async fn on_resubscribe_to_task(&self, _params: TaskIdParams) -> TaskResult<TaskEventStream> {
        Err(JsonRpcError::unsupported_operation())
    }
}

/// Tasks and their push notification settings, keyed by task id.
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<String, Task>>,
    push_notifications: RwLock<HashMap<String, PushNotificationConfig>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a `submitted` task for a new id or appends the message to the existing one.
    pub async fn upsert_task(&self, params: &TaskSendParams) -> Task {
        tracing::info!(task.id = %params.id, "upserting task");
        let mut tasks = self.tasks.write().await;
        let task = tasks.entry(params.id.clone()).or_insert_with(|| Task {
            id: params.id.clone(),
            session_id: Some(params.session_id.clone()),
            status: TaskStatus::new(TaskState::Submitted),
            artifacts: None,
            history: Some(Vec::new()),
            metadata: params.metadata.clone(),
        });
        task.history.get_or_insert_with(Vec::new).push(params.message.clone());
        task.clone()
    }

    /// Returns the task with only the last `history_length` messages; none when unset or zero.
    pub async fn get_task(&self, params: &TaskQueryParams) -> TaskResult<Task> {
        let tasks = self.tasks.read().await;
        let mut task = tasks.get(&params.id).cloned().ok_or_else(JsonRpcError::task_not_found)?;
        let history = task.history.take().unwrap_or_default();
        task.history = Some(match params.history_length {
            Some(n) if n > 0 => {
                let skip = history.len().saturating_sub(n);
                history.into_iter().skip(skip).collect()
            }
            _ => Vec::new(),
        });
        Ok(task)
    }

    pub async fn cancel_task(&self, params: &TaskIdParams) -> TaskResult<Task> {
        if self.tasks.read().await.contains_key(&params.id) {
            Err(JsonRpcError::task_not_cancelable())
        } else {
            Err(JsonRpcError::task_not_found())
        }
    }

    /// Replaces the status, records its message in the history and appends the artifacts.
    pub async fn update_task(
        &self,
        id: &str,
        status: TaskStatus,
        artifacts: Vec<Artifact>,
    ) -> TaskResult<Task> {
        let mut tasks = self.tasks.write().await;
        let Some(task) = tasks.get_mut(id) else {
            tracing::error!(task.id = %id, "task not found for update");
            return Err(JsonRpcError::task_not_found());
        };
        if let Some(message) = &status.message {
            task.history.get_or_insert_with(Vec::new).push(message.clone());
        }
        task.status = status;
        if !artifacts.is_empty() {
            task.artifacts.get_or_insert_with(Vec::new).extend(artifacts);
        }
        Ok(task.clone())
    }

    pub async fn set_push_notification(
        &self,
        id: &str,
        config: PushNotificationConfig,
    ) -> TaskResult<()> {
        if !self.tasks.read().await.contains_key(id) {
            return Err(JsonRpcError::task_not_found());
        }
        self.push_notifications.write().await.insert(id.to_string(), config);
        Ok(())
    }

    pub async fn get_push_notification(&self, id: &str) -> TaskResult<PushNotificationConfig> {
        if !self.tasks.read().await.contains_key(id) {
            return Err(JsonRpcError::task_not_found());
        }
        self.push_notifications.read().await.get(id).cloned().ok_or_else(|| {
            JsonRpcError::internal_error("No push notification configured for this task")
        })
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonrpc::codes;
    use crate::types::{Message, Part};

    fn send(id: &str, text: &str) -> TaskSendParams {
        TaskSendParams::new(id, "session-1", Message::user_text(text))
    }

    #[tokio::test]
    async fn upsert_creates_then_appends() {
        let store = InMemoryTaskStore::new();
        let task = store.upsert_task(&send("t1", "first")).await;
        assert_eq!(task.status.state, TaskState::Submitted);
        assert_eq!(task.session_id.as_deref(), Some("session-1"));
        assert_eq!(task.history.as_ref().map(Vec::len), Some(1));

        let task = store.upsert_task(&send("t1", "second")).await;
        assert_eq!(task.history.as_ref().map(Vec::len), Some(2));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn get_trims_history() {
        let store = InMemoryTaskStore::new();
        for text in ["a", "b", "c"] {
            store.upsert_task(&send("t1", text)).await;
        }

        let query = TaskQueryParams::new("t1").with_history_length(2);
        let task = store.get_task(&query).await.unwrap();
        let history = task.history.unwrap();
        let texts: Vec<_> = history.iter().filter_map(|m| m.parts[0].as_text()).collect();
        assert_eq!(texts, vec!["b", "c"]);

        let task = store.get_task(&TaskQueryParams::new("t1")).await.unwrap();
        assert_eq!(task.history, Some(Vec::new()));

        let err = store.get_task(&TaskQueryParams::new("nope")).await.unwrap_err();
        assert_eq!(err.code, codes::TASK_NOT_FOUND);
    }

    #[tokio::test]
    async fn cancel_is_never_possible() {
        let store = InMemoryTaskStore::new();
        store.upsert_task(&send("t1", "hi")).await;
        let err = store.cancel_task(&TaskIdParams::new("t1")).await.unwrap_err();
        assert_eq!(err.code, codes::TASK_NOT_CANCELABLE);
        let err = store.cancel_task(&TaskIdParams::new("t2")).await.unwrap_err();
        assert_eq!(err.code, codes::TASK_NOT_FOUND);
    }

    #[tokio::test]
    async fn update_records_status_and_artifacts() {
        let store = InMemoryTaskStore::new();
        store.upsert_task(&send("t1", "hi")).await;

        let parts = vec![Part::text("42")];
        let status =
            TaskStatus::new(TaskState::Completed).with_message(Message::agent(parts.clone()));
        let task = store.update_task("t1", status, vec![Artifact::from_parts(parts)]).await.unwrap();
        assert_eq!(task.status.state, TaskState::Completed);
        assert_eq!(task.history.unwrap().len(), 2);
        assert_eq!(task.artifacts.unwrap().len(), 1);

        let err = store
            .update_task("missing", TaskStatus::new(TaskState::Failed), Vec::new())
            .await
            .unwrap_err();
        assert_eq!(err.code, codes::TASK_NOT_FOUND);
    }

    #[tokio::test]
    async fn push_notification_configs_are_stored() {
        let store = InMemoryTaskStore::new();
        let config = PushNotificationConfig {
            url: "http://localhost:5000/notify".into(),
            token: Some("secret".into()),
            authentication: None,
        };
        let err = store.set_push_notification("t1", config.clone()).await.unwrap_err();
        assert_eq!(err.code, codes::TASK_NOT_FOUND);

        store.upsert_task(&send("t1", "hi")).await;
        assert!(store.get_push_notification("t1").await.is_err());
        store.set_push_notification("t1", config.clone()).await.unwrap();
        assert_eq!(store.get_push_notification("t1").await.unwrap(), config);
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;
use w3a_core::{Content, Event, Result, W3aError};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
}

impl SessionKey {
    pub fn new(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self { app_name: app_name.into(), user_id: user_id.into(), session_id: session_id.into() }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub key: SessionKey,
    pub state: HashMap<String, Value>,
    pub events: Vec<Event>,
    pub last_update_time: DateTime<Utc>,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.key.session_id
    }

    /// Contents of all events, oldest first; the model's view of the conversation.
    pub fn history(&self) -> Vec<Content> {
        self.events.iter().filter_map(|e| e.content().cloned()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub app_name: String,
    pub user_id: String,
    /// Generated when `None`.
    pub session_id: Option<String>,
    pub state: HashMap<String, Value>,
}

#[derive(Debug, Clone)]
pub struct GetRequest {
    pub key: SessionKey,
    /// Keep only the most recent events.
    pub num_recent_events: Option<usize>,
}

#[async_trait]
pub trait SessionService: Send + Sync {
    async fn create(&self, req: CreateRequest) -> Result<Session>;
    async fn get(&self, req: GetRequest) -> Result<Option<Session>>;
    async fn list(&self, app_name: &str, user_id: &str) -> Result<Vec<Session>>;
    async fn delete(&self, key: &SessionKey) -> Result<()>;
    async fn append_event(&self, key: &SessionKey, event: Event) -> Result<()>;
}

#[derive(Default)]
pub struct InMemorySessionService {
    sessions: RwLock<HashMap<SessionKey, Session>>,
}

impl InMemorySessionService {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionService for InMemorySessionService {
    async fn create(&self, req: CreateRequest) -> Result<Session> {
        let session_id = req.session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let key = SessionKey::new(req.app_name, req.user_id, session_id);

        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&key) {
            return Err(W3aError::Session(format!(
                "session '{}' already exists",
                key.session_id
            )));
        }
        let session = Session {
            key: key.clone(),
            state: req.state,
            events: Vec::new(),
            last_update_time: Utc::now(),
        };
        sessions.insert(key, session.clone());
        Ok(session)
    }

    async fn get(&self, req: GetRequest) -> Result<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&req.key).map(|session| {
            let mut session = session.clone();
            if let Some(n) = req.num_recent_events {
                let skip = session.events.len().saturating_sub(n);
                session.events.drain(..skip);
            }
            session
        }))
    }

    async fn list(&self, app_name: &str, user_id: &str) -> Result<Vec<Session>> {
        let sessions = self.sessions.read().await;
        let mut found: Vec<Session> = sessions
            .values()
            .filter(|s| s.key.app_name == app_name && s.key.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by_key(|s| s.last_update_time);
        Ok(found)
    }

    async fn delete(&self, key: &SessionKey) -> Result<()> {
        self.sessions.write().await.remove(key);
        Ok(())
    }

    async fn append_event(&self, key: &SessionKey, event: Event) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(key)
            .ok_or_else(|| W3aError::Session(format!("session '{}' not found", key.session_id)))?;
        session.last_update_time = event.timestamp;
        session.events.push(event);
        Ok(())
    }
}

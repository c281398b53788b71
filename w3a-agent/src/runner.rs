use crate::context::RunContext;
use crate::session::{GetRequest, SessionKey, SessionService};
use async_stream::stream;
use futures::StreamExt;
use std::sync::Arc;
use w3a_core::{Agent, Content, Event, EventStream, Result, W3aError};

pub struct RunnerConfig {
    pub app_name: String,
    pub agent: Arc<dyn Agent>,
    pub session_service: Arc<dyn SessionService>,
}

/// Runs an agent inside a stored session, persisting every event it produces.
pub struct Runner {
    app_name: String,
    agent: Arc<dyn Agent>,
    session_service: Arc<dyn SessionService>,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            app_name: config.app_name,
            agent: config.agent,
            session_service: config.session_service,
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn session_service(&self) -> &Arc<dyn SessionService> {
        &self.session_service
    }

    pub async fn run(
        &self,
        user_id: String,
        session_id: String,
        user_content: Content,
    ) -> Result<EventStream> {
        let key = SessionKey::new(self.app_name.clone(), user_id, session_id);
        let session_service = self.session_service.clone();
        let agent = self.agent.clone();

        let s = stream! {
            let session = match session_service
                .get(GetRequest { key: key.clone(), num_recent_events: None })
                .await
            {
                Ok(Some(session)) => session,
                Ok(None) => {
                    yield Err(W3aError::Session(format!(
                        "session '{}' not found",
                        key.session_id
                    )));
                    return;
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let invocation_id = format!("inv-{}", uuid::Uuid::new_v4());
            let ctx = RunContext::new(
                invocation_id.clone(),
                key.app_name.clone(),
                key.user_id.clone(),
                key.session_id.clone(),
                user_content.clone(),
            )
            .with_history(session.history());

            let user_event = Event::new(&invocation_id)
                .with_author("user")
                .with_content(user_content.clone());
            if let Err(e) = session_service.append_event(&key, user_event).await {
                yield Err(e);
                return;
            }

            let mut events = match agent.run(Arc::new(ctx)).await {
                Ok(events) => events,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            while let Some(item) = events.next().await {
                match item {
                    Ok(event) => {
                        if !event.llm_response.partial {
                            if let Err(e) = session_service.append_event(&key, event.clone()).await {
                                yield Err(e);
                                return;
                            }
                        }
                        yield Ok(event);
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        };

        Ok(Box::pin(s))
    }
}

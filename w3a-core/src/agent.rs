use crate::{Result, event::Event, types::Content};
use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;
use std::sync::Arc;

pub type EventStream = Pin<Box<dyn Stream<Item = Result<Event>> + Send>>;

#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    async fn run(&self, ctx: Arc<dyn InvocationContext>) -> Result<EventStream>;
}

/// Everything an agent can see about the invocation it is serving.
pub trait InvocationContext: Send + Sync {
    fn invocation_id(&self) -> &str;
    fn app_name(&self) -> &str;
    fn user_id(&self) -> &str;
    fn session_id(&self) -> &str;
    fn user_content(&self) -> &Content;
    /// Prior conversation turns of the session, oldest first, excluding `user_content`.
    fn history(&self) -> &[Content];
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_stream::stream;
    use futures::StreamExt;

    struct EchoAgent;

    #[async_trait]
    impl Agent for EchoAgent {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "repeats the user"
        }

        async fn run(&self, ctx: Arc<dyn InvocationContext>) -> Result<EventStream> {
            let text = ctx.user_content().text().unwrap_or_default();
            let invocation_id = ctx.invocation_id().to_string();
            let s = stream! {
                yield Ok(Event::new(invocation_id)
                    .with_author("echo")
                    .with_content(Content::new("model").with_text(text)));
            };
            Ok(Box::pin(s))
        }
    }

    struct Ctx {
        content: Content,
    }

    impl InvocationContext for Ctx {
        fn invocation_id(&self) -> &str {
            "inv-1"
        }
        fn app_name(&self) -> &str {
            "app"
        }
        fn user_id(&self) -> &str {
            "user"
        }
        fn session_id(&self) -> &str {
            "session"
        }
        fn user_content(&self) -> &Content {
            &self.content
        }
        fn history(&self) -> &[Content] {
            &[]
        }
    }

    #[tokio::test]
    async fn test_agent_run_yields_events() {
        let ctx = Arc::new(Ctx { content: Content::user("ping") });
        let mut events = EchoAgent.run(ctx).await.unwrap();
        let event = events.next().await.unwrap().unwrap();
        assert_eq!(event.author, "echo");
        assert_eq!(event.text().as_deref(), Some("ping"));
        assert!(events.next().await.is_none());
    }
}

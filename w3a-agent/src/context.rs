use std::sync::Arc;
use w3a_core::{Content, InvocationContext, ToolContext};

/// Invocation context handed to an agent by the [`Runner`](crate::Runner).
pub struct RunContext {
    invocation_id: String,
    app_name: String,
    user_id: String,
    session_id: String,
    user_content: Content,
    history: Vec<Content>,
}

impl RunContext {
    pub fn new(
        invocation_id: impl Into<String>,
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        user_content: Content,
    ) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            app_name: app_name.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
            user_content,
            history: Vec::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<Content>) -> Self {
        self.history = history;
        self
    }
}

impl InvocationContext for RunContext {
    fn invocation_id(&self) -> &str {
        &self.invocation_id
    }

    fn app_name(&self) -> &str {
        &self.app_name
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn user_content(&self) -> &Content {
        &self.user_content
    }

    fn history(&self) -> &[Content] {
        &self.history
    }
}

// Keeps the parent invocation so tools see the same user and session.
pub(crate) struct CallContext {
    parent: Arc<dyn InvocationContext>,
    function_call_id: String,
}

impl CallContext {
    pub(crate) fn new(parent: Arc<dyn InvocationContext>, function_call_id: String) -> Self {
        Self { parent, function_call_id }
    }
}

impl ToolContext for CallContext {
    fn invocation_id(&self) -> &str {
        self.parent.invocation_id()
    }

    fn function_call_id(&self) -> &str {
        &self.function_call_id
    }

    fn user_id(&self) -> &str {
        self.parent.user_id()
    }

    fn session_id(&self) -> &str {
        self.parent.session_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_context_inherits_parent() {
        let parent: Arc<dyn InvocationContext> = Arc::new(
            RunContext::new("inv-1", "web3_agent", "remote_agent", "s1", Content::user("hi"))
                .with_history(vec![Content::user("earlier")]),
        );
        assert_eq!(parent.history().len(), 1);

        let call = CallContext::new(parent, "call-7".into());
        assert_eq!(call.invocation_id(), "inv-1");
        assert_eq!(call.function_call_id(), "call-7");
        assert_eq!(call.user_id(), "remote_agent");
        assert_eq!(call.session_id(), "s1");
    }
}

use crate::model::LlmResponse;
use crate::types::{Content, FunctionResponseData, Part};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single step of an agent run: a model turn or a batch of tool responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub invocation_id: String,
    pub author: String,
    #[serde(flatten)]
    pub llm_response: LlmResponse,
}

impl Event {
    pub fn new(invocation_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            invocation_id: invocation_id.into(),
            author: String::new(),
            llm_response: LlmResponse::default(),
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_content(mut self, content: Content) -> Self {
        self.llm_response.content = Some(content);
        self
    }

    pub fn content(&self) -> Option<&Content> {
        self.llm_response.content.as_ref()
    }

    pub fn set_content(&mut self, content: Content) {
        self.llm_response.content = Some(content);
    }

    pub fn text(&self) -> Option<String> {
        self.content().and_then(Content::text)
    }

    pub fn has_function_calls(&self) -> bool {
        self.content()
            .is_some_and(|c| c.parts.iter().any(|p| matches!(p, Part::FunctionCall { .. })))
    }

    pub fn function_responses(&self) -> Vec<&FunctionResponseData> {
        self.content().map(|c| c.function_responses().collect()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_creation() {
        let event = Event::new("inv-123").with_author("web3_agent");
        assert_eq!(event.invocation_id, "inv-123");
        assert_eq!(event.author, "web3_agent");
        assert!(!event.id.is_empty());
        assert!(event.content().is_none());
    }

    #[test]
    fn test_event_function_responses() {
        let content = Content::new("function").with_part(Part::function_response(
            "getBalance",
            json!({"output": "100 ETH"}),
            None,
        ));
        let event = Event::new("inv").with_content(content);
        assert!(!event.has_function_calls());
        assert_eq!(event.function_responses().len(), 1);
        assert!(event.text().is_none());
    }

    #[test]
    fn test_event_serialization_flattens_response() {
        let event = Event::new("inv").with_content(Content::new("model").with_text("hi"));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["content"]["parts"][0]["text"], "hi");
        assert_eq!(value["invocation_id"], "inv");
    }
}

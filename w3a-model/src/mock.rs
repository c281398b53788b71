use std::collections::VecDeque;
use std::sync::Mutex;
use async_trait::async_trait;
use w3a_core::{Llm, LlmRequest, LlmResponse, LlmResponseStream, Result, W3aError};

/// Replays one scripted response per `generate_content` call and records every request.
pub struct MockLlm {
    name: String,
    responses: Mutex<VecDeque<Result<LlmResponse>>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlm {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_response(self, response: LlmResponse) -> Self {
        self.push(Ok(response));
        self
    }

    pub fn with_error(self, error: W3aError) -> Self {
        self.push(Err(error));
        self
    }

    fn push(&self, item: Result<LlmResponse>) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(item);
        }
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Llm for MockLlm {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_content(&self, req: LlmRequest, _stream: bool) -> Result<LlmResponseStream> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(req);
        }
        let next = self
            .responses
            .lock()
            .map_err(|_| W3aError::Model("mock response queue poisoned".into()))?
            .pop_front()
            .unwrap_or_else(|| Err(W3aError::Model("no scripted response left".into())));
        let stream = async_stream::stream! {
            yield next;
        };
        Ok(Box::pin(stream))
    }
}

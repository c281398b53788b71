use crate::context::CallContext;
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::Instrument;
use w3a_core::{
    Agent, Content, Event, EventStream, GenerateContentConfig, InvocationContext, Llm, LlmRequest,
    Part, ROLE_FUNCTION, Result, Tool, W3aError, function_declaration,
};

pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// An agent that alternates model turns and tool calls until the model answers in text.
pub struct LlmAgent {
    name: String,
    description: String,
    model: Arc<dyn Llm>,
    instruction: Option<String>,
    tools: Vec<Arc<dyn Tool>>,
    generate_config: Option<GenerateContentConfig>,
    max_iterations: usize,
}

impl std::fmt::Debug for LlmAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmAgent")
            .field("name", &self.name)
            .field("model", &self.model.name())
            .field("tools", &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>())
            .field("max_iterations", &self.max_iterations)
            .finish()
    }
}

pub struct LlmAgentBuilder {
    name: String,
    description: Option<String>,
    model: Option<Arc<dyn Llm>>,
    instruction: Option<String>,
    tools: Vec<Arc<dyn Tool>>,
    generate_config: Option<GenerateContentConfig>,
    max_iterations: usize,
}

impl LlmAgentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            model: None,
            instruction: None,
            tools: Vec::new(),
            generate_config: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn model(mut self, model: Arc<dyn Llm>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tools(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn generate_content_config(mut self, config: GenerateContentConfig) -> Self {
        self.generate_config = Some(config);
        self
    }

    /// Upper bound on model turns per run.
    pub fn max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn build(self) -> Result<LlmAgent> {
        let model = self.model.ok_or_else(|| W3aError::Agent("Model is required".to_string()))?;

        Ok(LlmAgent {
            name: self.name,
            description: self.description.unwrap_or_default(),
            model,
            instruction: self.instruction,
            tools: self.tools,
            generate_config: self.generate_config,
            max_iterations: self.max_iterations,
        })
    }
}

impl LlmAgent {
    pub fn builder(name: impl Into<String>) -> LlmAgentBuilder {
        LlmAgentBuilder::new(name)
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }
}

async fn call_tool(
    tool: Option<Arc<dyn Tool>>,
    name: &str,
    args: Value,
    ctx: Arc<CallContext>,
) -> Value {
    let Some(tool) = tool else {
        tracing::warn!(tool.name = %name, "model called an unknown tool");
        return json!({ "error": format!("Tool {} not found", name) });
    };
    let span = w3a_telemetry::tool_execute_span(name);
    match tool.execute(ctx, args).instrument(span).await {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(tool.name = %name, error = %e, "tool call failed");
            json!({ "error": e.to_string() })
        }
    }
}

#[async_trait]
impl Agent for LlmAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn run(&self, ctx: Arc<dyn InvocationContext>) -> Result<EventStream> {
        let agent_name = self.name.clone();
        let invocation_id = ctx.invocation_id().to_string();
        let model = self.model.clone();
        let instruction = self.instruction.clone();
        let generate_config = self.generate_config.clone();
        let max_iterations = self.max_iterations;

        let tools: BTreeMap<String, Arc<dyn Tool>> =
            self.tools.iter().map(|t| (t.name().to_string(), t.clone())).collect();
        let declarations: BTreeMap<String, Value> = self
            .tools
            .iter()
            .map(|t| (t.name().to_string(), function_declaration(t.as_ref())))
            .collect();

        let span = w3a_telemetry::agent_run_span(&agent_name, &invocation_id);

        let s = stream! {
            span.in_scope(|| tracing::debug!(iterations.max = max_iterations, "agent run started"));
            let mut contents: Vec<Content> = ctx.history().to_vec();
            contents.push(ctx.user_content().clone());

            let mut iteration = 0;
            loop {
                if iteration >= max_iterations {
                    yield Err(W3aError::Agent(format!(
                        "Max iterations ({}) exceeded",
                        max_iterations
                    )));
                    return;
                }
                iteration += 1;

                let mut request = LlmRequest::new(model.name(), contents.clone());
                if let Some(instruction) = &instruction {
                    request = request.with_system_instruction(instruction.clone());
                }
                if let Some(config) = &generate_config {
                    request = request.with_config(config.clone());
                }
                request.tools = declarations.clone();

                let call_span = span.in_scope(|| w3a_telemetry::model_call_span(model.name()));
                let mut responses = match model
                    .generate_content(request, false)
                    .instrument(call_span)
                    .await
                {
                    Ok(responses) => responses,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                let mut calls: Vec<(String, Value, Option<String>)> = Vec::new();
                while let Some(item) = responses.next().await {
                    let response = match item {
                        Ok(response) => response,
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    };
                    if let Some(message) = &response.error_message {
                        yield Err(W3aError::Model(message.clone()));
                        return;
                    }
                    let Some(content) = response.content.clone() else {
                        continue;
                    };
                    if !response.partial {
                        calls.extend(content.function_calls().map(|(name, args, id)| {
                            (name.to_string(), args.clone(), id.map(str::to_string))
                        }));
                        contents.push(content);
                    }
                    let mut event = Event::new(&invocation_id).with_author(&agent_name);
                    event.llm_response = response;
                    yield Ok(event);
                }

                if calls.is_empty() {
                    return;
                }

                let mut reply = Content::new(ROLE_FUNCTION);
                for (name, args, id) in calls {
                    tracing::debug!(tool.name = %name, "executing tool call");
                    let call_id =
                        id.clone().unwrap_or_else(|| format!("call-{}", uuid::Uuid::new_v4()));
                    let call_ctx = Arc::new(CallContext::new(ctx.clone(), call_id));
                    let result = call_tool(tools.get(&name).cloned(), &name, args, call_ctx)
                        .instrument(span.clone())
                        .await;
                    reply = reply.with_part(Part::function_response(name, result, id));
                }
                contents.push(reply.clone());
                yield Ok(Event::new(&invocation_id).with_author(&agent_name).with_content(reply));
            }
        };

        Ok(Box::pin(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RunContext;
    use w3a_core::{LlmResponse, ROLE_MODEL, ToolContext};
    use w3a_model::MockLlm;

    struct BalanceTool;

    #[async_trait]
    impl Tool for BalanceTool {
        fn name(&self) -> &str {
            "getBalance"
        }

        fn description(&self) -> &str {
            "Returns the balance of an address"
        }

        async fn execute(&self, ctx: Arc<dyn ToolContext>, args: Value) -> Result<Value> {
            assert_eq!(ctx.user_id(), "remote_agent");
            if args["address"] == "bad" {
                return Err(W3aError::Tool("invalid address".into()));
            }
            Ok(json!({ "output": "100 ETH" }))
        }
    }

    fn call(name: &str, address: &str) -> LlmResponse {
        LlmResponse::new(Content::new(ROLE_MODEL).with_part(Part::FunctionCall {
            name: name.into(),
            args: json!({ "address": address }),
            id: Some("call-1".into()),
        }))
    }

    fn text(text: &str) -> LlmResponse {
        LlmResponse::new(Content::new(ROLE_MODEL).with_text(text))
    }

    fn ctx(text: &str) -> Arc<dyn InvocationContext> {
        Arc::new(RunContext::new("inv-1", "web3_agent", "remote_agent", "s1", Content::user(text)))
    }

    async fn collect(agent: &LlmAgent, text: &str) -> Vec<Result<Event>> {
        agent.run(ctx(text)).await.unwrap().collect().await
    }

    #[test]
    fn build_requires_model() {
        let err = LlmAgentBuilder::new("web3_agent").build().unwrap_err();
        assert_eq!(err.to_string(), "Agent error: Model is required");
    }

    #[tokio::test]
    async fn plain_text_answer_ends_run() {
        let model = Arc::new(MockLlm::new("mock").with_response(text("Hello!")));
        let agent = LlmAgent::builder("web3_agent")
            .model(model.clone())
            .instruction("Be helpful")
            .tool(Arc::new(BalanceTool))
            .build()
            .unwrap();

        let events = collect(&agent, "hi").await;
        assert_eq!(events.len(), 1);
        let event = events[0].as_ref().unwrap();
        assert_eq!(event.author, "web3_agent");
        assert_eq!(event.text().as_deref(), Some("Hello!"));

        let requests = model.requests();
        assert_eq!(requests[0].system_instruction.as_deref(), Some("Be helpful"));
        assert!(requests[0].tools.contains_key("getBalance"));
        assert_eq!(requests[0].contents.len(), 1);
    }

    #[tokio::test]
    async fn tool_call_round_trip() {
        let model = Arc::new(
            MockLlm::new("mock")
                .with_response(call("getBalance", "0xabc"))
                .with_response(text("You have 100 ETH")),
        );
        let agent = LlmAgent::builder("web3_agent")
            .model(model.clone())
            .tool(Arc::new(BalanceTool))
            .build()
            .unwrap();

        let events: Vec<Event> =
            collect(&agent, "balance?").await.into_iter().map(|e| e.unwrap()).collect();
        assert_eq!(events.len(), 3);
        assert!(events[0].has_function_calls());
        let responses = events[1].function_responses();
        assert_eq!(responses[0].name, "getBalance");
        assert_eq!(responses[0].response["output"], "100 ETH");
        assert_eq!(events[2].text().as_deref(), Some("You have 100 ETH"));

        // user, model call, function response
        assert_eq!(model.requests()[1].contents.len(), 3);
    }

    #[tokio::test]
    async fn tool_errors_become_error_payloads() {
        let model = Arc::new(
            MockLlm::new("mock")
                .with_response(call("getBalance", "bad"))
                .with_response(call("sendTransaction", "0xabc"))
                .with_response(text("done")),
        );
        let agent =
            LlmAgent::builder("a").model(model).tool(Arc::new(BalanceTool)).build().unwrap();

        let events: Vec<Event> =
            collect(&agent, "go").await.into_iter().map(|e| e.unwrap()).collect();
        assert_eq!(
            events[1].function_responses()[0].response["error"],
            "Tool error: invalid address"
        );
        assert_eq!(
            events[3].function_responses()[0].response["error"],
            "Tool sendTransaction not found"
        );
    }

    #[tokio::test]
    async fn max_iterations_is_enforced() {
        let model = Arc::new(
            MockLlm::new("mock")
                .with_response(call("getBalance", "0x1"))
                .with_response(call("getBalance", "0x2")),
        );
        let agent = LlmAgent::builder("a")
            .model(model)
            .tool(Arc::new(BalanceTool))
            .max_iterations(2)
            .build()
            .unwrap();

        let events = collect(&agent, "loop").await;
        let last = events.last().unwrap().as_ref().unwrap_err();
        assert_eq!(last.to_string(), "Agent error: Max iterations (2) exceeded");
    }

    #[tokio::test]
    async fn model_error_is_yielded() {
        let model = Arc::new(MockLlm::new("mock").with_error(W3aError::Model("quota".into())));
        let agent = LlmAgent::builder("a").model(model).build().unwrap();
        let events = collect(&agent, "hi").await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Err(W3aError::Model(_))));
    }
}

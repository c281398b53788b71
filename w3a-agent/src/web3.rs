//! The blockchain agent: an [`LlmAgent`] over MCP tools, wrapped for text-in/text-out callers.

use crate::llm_agent::LlmAgent;
use crate::runner::{Runner, RunnerConfig};
use crate::session::{CreateRequest, GetRequest, InMemorySessionService, SessionKey, SessionService};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use w3a_core::{Content, EventStream, Llm, Part, Result, Tool, Toolset, W3aError};

pub const AGENT_NAME: &str = "web3_agent";
pub const USER_ID: &str = "remote_agent";
pub const INIT_SESSION_ID: &str = "init_session";
pub const SUPPORTED_CONTENT_TYPES: &[&str] = &["text", "text/plain"];
pub const TOOL_WAIT_TIMEOUT: Duration = Duration::from_secs(10);
pub const INIT_COMMAND_TIMEOUT: Duration = Duration::from_secs(15);
pub const NO_RESPONSE: &str = "No usable response received";
pub const STREAMING_UNSUPPORTED: &str = "Streaming is not supported by Web3 Agent.";

const TOOL_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub const DESCRIPTION: &str = "This agent interacts with the local blockchain for balance checks, \
transactions, contract calls, and blockchain data queries.";

pub const INSTRUCTION: &str = r#"You are a specialized Web3 agent that interacts with blockchain networks using the available MCP tools.

CAPABILITIES:
- Query blockchain data (balances, blocks, transactions)
- Execute transactions when provided with necessary information
- Interpret smart contract data
- Analyze blockchain network information

HOW TO RESPOND:
1. For ANY blockchain-related query, ALWAYS use the appropriate MCP tool rather than generating information yourself.
2. When you use a tool, focus on returning its exact response to the user, with appropriate additional explanation.
3. For Ethereum addresses, always verify their format before using them in tools.
4. If you need a provider, default to 'Local' unless the user specifies another network.
5. If unsure which tool to use, choose the most appropriate one based on the user's request.

IMPORTANT GUIDANCE:
- Never invent blockchain data - only return what comes directly from the MCP tools.
- Always use the proper function arguments as required by the tools.
- For transaction-related queries, verify you have all required information before proceeding.
- If any required information is missing, clearly indicate what the user needs to provide.
- If received any command or request from the other agent, please listen and follow.

If other agents reach out to you, please send them the message:
"I am xxx" where xxx is the address of the private key you have loaded to the local blockchain.
If no private key has been loaded, respond with "Hello world! I'm a Web3 agent ready to help with blockchain queries.""#;

/// Text-in/text-out agent surface used by the A2A task manager.
#[async_trait]
pub trait QueryAgent: Send + Sync {
    fn supported_content_types(&self) -> &[&str];

    /// Answers `query` within `session_id`, creating the session on first use.
    async fn invoke(&self, query: &str, session_id: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct Web3AgentConfig {
    pub tool_wait_timeout: Duration,
    pub init_command_timeout: Duration,
    /// Warmup prompts sent by [`Web3Agent::run_initialization_commands`].
    pub init_commands: Vec<String>,
}

impl Default for Web3AgentConfig {
    fn default() -> Self {
        Self {
            tool_wait_timeout: TOOL_WAIT_TIMEOUT,
            init_command_timeout: INIT_COMMAND_TIMEOUT,
            init_commands: Vec::new(),
        }
    }
}

impl Web3AgentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `private_key` on the `Local` chain, then asks for the wallet address and balance.
    pub fn with_private_key(mut self, private_key: &str) -> Self {
        self.init_commands = vec![
            format!("Please load this private key to the `Local` blockchain: {private_key}"),
            "What is my wallet address?".to_string(),
            "What is the current balance of my wallet on the Local blockchain for the address \
             derived from the private key?"
                .to_string(),
        ];
        self
    }

    pub fn with_init_commands(mut self, commands: Vec<String>) -> Self {
        self.init_commands = commands;
        self
    }

    pub fn with_tool_wait_timeout(mut self, timeout: Duration) -> Self {
        self.tool_wait_timeout = timeout;
        self
    }

    pub fn with_init_command_timeout(mut self, timeout: Duration) -> Self {
        self.init_command_timeout = timeout;
        self
    }
}

pub struct Web3Agent {
    runner: Runner,
    tool_names: Vec<String>,
    config: Web3AgentConfig,
    init_completed: AtomicBool,
}

impl std::fmt::Debug for Web3Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Web3Agent")
            .field("tools", &self.tool_names)
            .field("init_completed", &self.init_completed.load(Ordering::SeqCst))
            .finish()
    }
}

async fn wait_for_tools(toolset: &dyn Toolset) -> Vec<Arc<dyn Tool>> {
    loop {
        match toolset.tools().await {
            Ok(tools) if !tools.is_empty() => return tools,
            Ok(_) => tracing::info!("Waiting for MCP tools to be available..."),
            Err(e) => tracing::warn!(error = %e, "Waiting for MCP tools to be available..."),
        }
        tokio::time::sleep(TOOL_POLL_INTERVAL).await;
    }
}

impl Web3Agent {
    /// Waits for `toolset` to expose tools, then builds the agent and its runner.
    pub async fn initialize(
        model: Arc<dyn Llm>,
        toolset: Arc<dyn Toolset>,
        config: Web3AgentConfig,
    ) -> Result<Self> {
        let tools = tokio::time::timeout(config.tool_wait_timeout, wait_for_tools(toolset.as_ref()))
            .await
            .map_err(|_| W3aError::Tool("MCP tools are not available after timeout".into()))?;
        let tool_names: Vec<String> = tools.iter().map(|t| t.name().to_string()).collect();
        tracing::info!(toolset = toolset.name(), tools = tool_names.len(), "Web3 agent tools ready");

        let agent = LlmAgent::builder(AGENT_NAME)
            .description(DESCRIPTION)
            .model(model)
            .instruction(INSTRUCTION)
            .tools(tools)
            .build()?;

        let runner = Runner::new(RunnerConfig {
            app_name: AGENT_NAME.to_string(),
            agent: Arc::new(agent),
            session_service: Arc::new(InMemorySessionService::new()),
        });

        Ok(Self { runner, tool_names, config, init_completed: AtomicBool::new(false) })
    }

    pub fn tool_names(&self) -> &[String] {
        &self.tool_names
    }

    pub fn is_warmed_up(&self) -> bool {
        self.init_completed.load(Ordering::SeqCst)
    }

    /// Sends the configured warmup prompts in [`INIT_SESSION_ID`]; only the first call does work.
    pub async fn run_initialization_commands(&self) -> Result<()> {
        if self.init_completed.swap(true, Ordering::SeqCst) {
            tracing::info!("Initialization already completed, skipping");
            return Ok(());
        }

        let total = self.config.init_commands.len();
        tracing::info!(commands = total, "running initialization commands");
        for (i, command) in self.config.init_commands.iter().enumerate() {
            tracing::info!(step = i + 1, total, command = %command, "running init command");
            match tokio::time::timeout(
                self.config.init_command_timeout,
                self.invoke(command, INIT_SESSION_ID),
            )
            .await
            {
                Ok(Ok(response)) => tracing::info!(response = %response, "init command answered"),
                Ok(Err(e)) => tracing::warn!(error = %e, "init command failed, continuing"),
                Err(_) => tracing::warn!(
                    timeout_secs = self.config.init_command_timeout.as_secs(),
                    "init command timed out, continuing"
                ),
            }
        }
        tracing::info!("initialization completed");
        Ok(())
    }

    pub fn stream(&self, _query: &str, _session_id: &str) -> Result<EventStream> {
        Err(W3aError::Agent(STREAMING_UNSUPPORTED.to_string()))
    }

    async fn ensure_session(&self, session_id: &str) -> Result<()> {
        let service = self.runner.session_service();
        let key = SessionKey::new(AGENT_NAME, USER_ID, session_id);
        if service.get(GetRequest { key, num_recent_events: None }).await?.is_some() {
            return Ok(());
        }
        let created = service
            .create(CreateRequest {
                app_name: AGENT_NAME.to_string(),
                user_id: USER_ID.to_string(),
                session_id: Some(session_id.to_string()),
                state: HashMap::new(),
            })
            .await;
        match created {
            Ok(_) => Ok(()),
            // A concurrent call may have created it first.
            Err(W3aError::Session(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn collect_answer(&self, mut events: EventStream) -> String {
        let mut last_text: Option<String> = None;
        while let Some(item) = events.next().await {
            let event = match item {
                Ok(event) => event,
                Err(e) => {
                    tracing::error!(error = %e, "error processing response");
                    return format!("Error: {e}");
                }
            };
            let Some(content) = event.content() else {
                continue;
            };
            for part in &content.parts {
                match part {
                    Part::FunctionResponse { function_response, .. } => {
                        tracing::debug!(tool = %function_response.name, "tool response received");
                        return render_tool_response(&function_response.response);
                    }
                    Part::FunctionCall { name, args, .. } => {
                        tracing::debug!(tool = %name, args = %args, "tool call");
                    }
                    Part::Text { text } if !text.is_empty() => last_text = Some(text.clone()),
                    Part::Text { .. } => {}
                }
            }
        }
        last_text.unwrap_or_else(|| NO_RESPONSE.to_string())
    }
}

/// Strings pass through untouched; any other JSON is serialized.
pub fn render_tool_response(response: &Value) -> String {
    match response {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl QueryAgent for Web3Agent {
    fn supported_content_types(&self) -> &[&str] {
        SUPPORTED_CONTENT_TYPES
    }

    async fn invoke(&self, query: &str, session_id: &str) -> Result<String> {
        self.ensure_session(session_id).await?;
        tracing::info!(query = %query, session.id = %session_id, "sending query to model");

        let events = self
            .runner
            .run(USER_ID.to_string(), session_id.to_string(), Content::user(query))
            .await?;
        Ok(self.collect_answer(events).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use w3a_core::{LlmResponse, ROLE_MODEL, ToolContext};
    use w3a_model::MockLlm;

    struct BlockNumberTool;

    #[async_trait]
    impl Tool for BlockNumberTool {
        fn name(&self) -> &str {
            "getBlockNumber"
        }

        fn description(&self) -> &str {
            "Latest block number"
        }

        async fn execute(&self, _ctx: Arc<dyn ToolContext>, _args: Value) -> Result<Value> {
            Ok(json!({ "output": "42" }))
        }
    }

    struct StaticToolset(Vec<Arc<dyn Tool>>);

    #[async_trait]
    impl Toolset for StaticToolset {
        fn name(&self) -> &str {
            "static"
        }

        async fn tools(&self) -> Result<Vec<Arc<dyn Tool>>> {
            Ok(self.0.clone())
        }
    }

    fn toolset() -> Arc<dyn Toolset> {
        Arc::new(StaticToolset(vec![Arc::new(BlockNumberTool)]))
    }

    fn text(text: &str) -> LlmResponse {
        LlmResponse::new(Content::new(ROLE_MODEL).with_text(text))
    }

    fn block_number_call() -> LlmResponse {
        LlmResponse::new(Content::new(ROLE_MODEL).with_part(Part::FunctionCall {
            name: "getBlockNumber".into(),
            args: json!({ "provider": "Local" }),
            id: None,
        }))
    }

    #[tokio::test(start_paused = true)]
    async fn initialize_times_out_without_tools() {
        let model = Arc::new(MockLlm::new("mock"));
        let err = Web3Agent::initialize(
            model,
            Arc::new(StaticToolset(Vec::new())),
            Web3AgentConfig::default(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Tool error: MCP tools are not available after timeout");
    }

    #[tokio::test]
    async fn invoke_returns_first_tool_response() {
        let model = Arc::new(MockLlm::new("mock").with_response(block_number_call()));
        let agent =
            Web3Agent::initialize(model.clone(), toolset(), Web3AgentConfig::default()).await.unwrap();
        assert_eq!(agent.tool_names(), ["getBlockNumber"]);

        let answer = agent.invoke("What is the latest block?", "s1").await.unwrap();
        assert_eq!(answer, r#"{"output":"42"}"#);

        let request = &model.requests()[0];
        assert_eq!(request.system_instruction.as_deref(), Some(INSTRUCTION));
        assert!(request.tools.contains_key("getBlockNumber"));
    }

    #[tokio::test]
    async fn invoke_falls_back_to_last_text() {
        let model = Arc::new(MockLlm::new("mock").with_response(text("Hello world!")));
        let agent =
            Web3Agent::initialize(model, toolset(), Web3AgentConfig::default()).await.unwrap();
        assert_eq!(agent.invoke("hi", "s1").await.unwrap(), "Hello world!");
    }

    #[tokio::test]
    async fn invoke_without_text_reports_no_response() {
        let empty = LlmResponse::new(Content::new(ROLE_MODEL));
        let model = Arc::new(MockLlm::new("mock").with_response(empty));
        let agent =
            Web3Agent::initialize(model, toolset(), Web3AgentConfig::default()).await.unwrap();
        assert_eq!(agent.invoke("hi", "s1").await.unwrap(), NO_RESPONSE);
    }

    #[tokio::test]
    async fn invoke_reports_model_errors_as_text() {
        let model = Arc::new(MockLlm::new("mock").with_error(W3aError::Model("quota".into())));
        let agent =
            Web3Agent::initialize(model, toolset(), Web3AgentConfig::default()).await.unwrap();
        assert_eq!(agent.invoke("hi", "s1").await.unwrap(), "Error: Model error: quota");
    }

    #[tokio::test]
    async fn sessions_are_reused_across_invocations() {
        let model =
            Arc::new(MockLlm::new("mock").with_response(text("one")).with_response(text("two")));
        let agent =
            Web3Agent::initialize(model.clone(), toolset(), Web3AgentConfig::default()).await.unwrap();
        agent.invoke("first", "s1").await.unwrap();
        agent.invoke("second", "s1").await.unwrap();
        assert_eq!(model.requests()[1].contents.len(), 3);
    }

    #[tokio::test]
    async fn initialization_commands_run_once_and_survive_failures() {
        let model = Arc::new(
            MockLlm::new("mock")
                .with_response(text("Private key loaded"))
                .with_error(W3aError::Model("boom".into()))
                .with_response(text("100 ETH")),
        );
        let config = Web3AgentConfig::default().with_private_key("0xkey");
        assert_eq!(config.init_commands.len(), 3);
        assert!(config.init_commands[0].ends_with("`Local` blockchain: 0xkey"));

        let agent = Web3Agent::initialize(model.clone(), toolset(), config).await.unwrap();
        agent.run_initialization_commands().await.unwrap();
        assert!(agent.is_warmed_up());
        assert_eq!(model.requests().len(), 3);

        agent.run_initialization_commands().await.unwrap();
        assert_eq!(model.requests().len(), 3);
    }

    #[tokio::test]
    async fn streaming_is_rejected() {
        let model = Arc::new(MockLlm::new("mock"));
        let agent =
            Web3Agent::initialize(model, toolset(), Web3AgentConfig::default()).await.unwrap();
        let err = agent.stream("hi", "s1").err().unwrap();
        assert_eq!(err.to_string(), format!("Agent error: {STREAMING_UNSUPPORTED}"));
        assert_eq!(agent.supported_content_types(), SUPPORTED_CONTENT_TYPES);
    }

    #[test]
    fn tool_responses_render_as_strings() {
        assert_eq!(render_tool_response(&json!("0xabc")), "0xabc");
        assert_eq!(render_tool_response(&json!([1, 2])), "[1,2]");
        assert_eq!(render_tool_response(&json!({"output": "1"})), r#"{"output":"1"}"#);
    }
}

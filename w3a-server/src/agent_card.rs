use w3a_a2a::{AgentCapabilities, AgentCard, AgentSkill};
use w3a_agent::SUPPORTED_CONTENT_TYPES;

pub const AGENT_CARD_NAME: &str = "Web3 Agent";
pub const AGENT_VERSION: &str = "1.0.0";

/// Card advertised at `/.well-known/agent.json` for an agent reachable at `url`.
pub fn build_agent_card(url: impl Into<String>) -> AgentCard {
    let modes: Vec<String> = SUPPORTED_CONTENT_TYPES.iter().map(|m| m.to_string()).collect();
    let skill = AgentSkill {
        id: "web3_agent".to_string(),
        name: AGENT_CARD_NAME.to_string(),
        description: Some("Interacts with the local blockchain through MCP tools".to_string()),
        tags: Some(vec!["web3".into(), "blockchain".into(), "ethereum".into()]),
        examples: Some(vec![
            "What is the balance of the account?".into(),
            "Can you load the local private key and send 0.1 ETH to the address \
             0x1234567890123456789012345678901234567890?"
                .into(),
            "What is the current block number?".into(),
        ]),
        input_modes: None,
        output_modes: None,
    };

    AgentCard {
        name: AGENT_CARD_NAME.to_string(),
        description: Some(
            "This agent interacts with the local blockchain for balance checks, transactions, \
             and blockchain queries"
                .to_string(),
        ),
        url: url.into(),
        provider: None,
        version: AGENT_VERSION.to_string(),
        documentation_url: None,
        capabilities: AgentCapabilities {
            streaming: false,
            push_notifications: false,
            state_transition_history: false,
        },
        authentication: None,
        default_input_modes: modes.clone(),
        default_output_modes: modes,
        skills: vec![skill],
    }
}

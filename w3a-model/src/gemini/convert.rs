//! Wire types for the Gemini v1beta API and their mapping to core types.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use w3a_core::{
    Content, FinishReason, GenerateContentConfig, LlmRequest, LlmResponse, Part, ROLE_MODEL,
    ROLE_USER, UsageMetadata,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest {
    pub contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<WireContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<WireTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<WireGenerationConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<WirePart>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<WireFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<WireFunctionResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireFunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireFunctionResponse {
    pub name: String,
    pub response: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireTool {
    pub function_declarations: Vec<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub usage_metadata: Option<WireUsage>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Candidate {
    #[serde(default)]
    pub content: Option<WireContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireUsage {
    pub prompt_token_count: Option<i32>,
    pub candidates_token_count: Option<i32>,
    pub total_token_count: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PromptFeedback {
    pub block_reason: Option<String>,
}

/// Gemini knows only `user` and `model`; tool results travel as `user` turns.
fn wire_role(role: &str) -> &'static str {
    if role == ROLE_MODEL { ROLE_MODEL } else { ROLE_USER }
}

fn wire_part(part: &Part) -> WirePart {
    match part {
        Part::Text { text } => WirePart { text: Some(text.clone()), ..Default::default() },
        Part::FunctionCall { name, args, id } => WirePart {
            function_call: Some(WireFunctionCall {
                name: name.clone(),
                args: args.clone(),
                id: id.clone(),
            }),
            ..Default::default()
        },
        Part::FunctionResponse { function_response, id } => {
            // The API requires a JSON object here.
            let response = match &function_response.response {
                Value::Object(_) => function_response.response.clone(),
                other => json!({ "output": other }),
            };
            WirePart {
                function_response: Some(WireFunctionResponse {
                    name: function_response.name.clone(),
                    response,
                    id: id.clone(),
                }),
                ..Default::default()
            }
        }
    }
}

pub(crate) fn to_wire_request(req: &LlmRequest) -> GenerateContentRequest {
    let contents = req
        .contents
        .iter()
        .filter(|content| !content.parts.is_empty())
        .map(|content| WireContent {
            role: Some(wire_role(&content.role).to_string()),
            parts: content.parts.iter().map(wire_part).collect(),
        })
        .collect();

    let system_instruction = req.system_instruction.as_ref().map(|text| WireContent {
        role: None,
        parts: vec![WirePart { text: Some(text.clone()), ..Default::default() }],
    });

    let tools = if req.tools.is_empty() {
        Vec::new()
    } else {
        vec![WireTool { function_declarations: req.tools.values().cloned().collect() }]
    };

    let generation_config = req.config.as_ref().map(|c: &GenerateContentConfig| {
        WireGenerationConfig {
            temperature: c.temperature,
            top_p: c.top_p,
            top_k: c.top_k,
            max_output_tokens: c.max_output_tokens,
        }
    });

    GenerateContentRequest { contents, system_instruction, tools, generation_config }
}

fn core_part(part: WirePart) -> Option<Part> {
    if let Some(call) = part.function_call {
        return Some(Part::FunctionCall { name: call.name, args: call.args, id: call.id });
    }
    if let Some(resp) = part.function_response {
        return Some(Part::function_response(resp.name, resp.response, resp.id));
    }
    part.text.map(|text| Part::Text { text })
}

fn parse_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::MaxTokens,
        "SAFETY" => FinishReason::Safety,
        "RECITATION" => FinishReason::Recitation,
        _ => FinishReason::Other,
    }
}

pub(crate) fn from_wire_response(resp: GenerateContentResponse) -> LlmResponse {
    let usage_metadata = resp.usage_metadata.map(|u| UsageMetadata {
        prompt_token_count: u.prompt_token_count.unwrap_or(0),
        candidates_token_count: u.candidates_token_count.unwrap_or(0),
        total_token_count: u.total_token_count.unwrap_or(0),
    });

    let Some(candidate) = resp.candidates.into_iter().next() else {
        let block_reason = resp.prompt_feedback.and_then(|f| f.block_reason);
        return LlmResponse {
            usage_metadata,
            turn_complete: true,
            error_code: block_reason.clone(),
            error_message: block_reason.map(|r| format!("Prompt blocked: {r}")),
            ..Default::default()
        };
    };

    let content = candidate.content.map(|c| Content {
        role: ROLE_MODEL.to_string(),
        parts: c.parts.into_iter().filter_map(core_part).collect(),
    });
    let finish_reason = candidate.finish_reason.as_deref().map(parse_finish_reason);

    LlmResponse {
        content,
        usage_metadata,
        finish_reason,
        partial: false,
        turn_complete: finish_reason.is_some(),
        error_code: None,
        error_message: None,
    }
}

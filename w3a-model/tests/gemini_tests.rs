use futures::StreamExt;
use serde_json::json;
use std::time::Duration;
use w3a_core::{Content, Llm, LlmRequest, Part, W3aError};
use w3a_model::{GeminiModel, RetryConfig};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL_PATH: &str = "/v1beta/models/gemini-2.0-flash-001";

fn model_for(server: &MockServer) -> GeminiModel {
    GeminiModel::new("test-key", "gemini-2.0-flash-001")
        .unwrap()
        .with_base_url(&format!("{}/v1beta", server.uri()))
        .unwrap()
        .with_retry_config(
            RetryConfig::default()
                .with_max_retries(2)
                .with_initial_delay(Duration::ZERO)
                .with_max_delay(Duration::ZERO),
        )
}

fn text_response(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    })
}

#[tokio::test]
async fn generate_content_sends_tools_and_parses_function_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{MODEL_PATH}:generateContent")))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "systemInstruction": {"parts": [{"text": "Use tools."}]},
            "tools": [{"functionDeclarations": [{"name": "getBlockNumber"}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"functionCall": {"name": "getBlockNumber", "args": {"provider": "Local"}}}
                ]},
                "finishReason": "STOP"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut req = LlmRequest::new("gemini-2.0-flash-001", vec![Content::user("block number?")])
        .with_system_instruction("Use tools.");
    req.tools.insert("getBlockNumber".into(), json!({"name": "getBlockNumber"}));

    let mut stream = model_for(&server).generate_content(req, false).await.unwrap();
    let resp = stream.next().await.unwrap().unwrap();
    let content = resp.content.unwrap();
    assert!(matches!(
        &content.parts[0],
        Part::FunctionCall { name, args, .. } if name == "getBlockNumber" && args["provider"] == "Local"
    ));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn generate_content_retries_service_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{MODEL_PATH}:generateContent")))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{MODEL_PATH}:generateContent")))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response("ok")))
        .mount(&server)
        .await;

    let req = LlmRequest::new("gemini-2.0-flash-001", vec![Content::user("hi")]);
    let mut stream = model_for(&server).generate_content(req, false).await.unwrap();
    let resp = stream.next().await.unwrap().unwrap();
    assert_eq!(resp.content.unwrap().text().as_deref(), Some("ok"));
}

#[tokio::test]
async fn generate_content_surfaces_client_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{MODEL_PATH}:generateContent")))
        .respond_with(ResponseTemplate::new(400).set_body_string("API key not valid"))
        .expect(1)
        .mount(&server)
        .await;

    let req = LlmRequest::new("gemini-2.0-flash-001", vec![Content::user("hi")]);
    let err = match model_for(&server).generate_content(req, false).await {
        Ok(_) => panic!("expected an error"),
        Err(err) => err,
    };
    match err {
        W3aError::Model(message) => {
            assert!(message.contains("400"));
            assert!(message.contains("API key not valid"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn stream_generate_content_parses_sse_chunks() {
    let server = MockServer::start().await;
    let body = format!(
        "data: {}\n\ndata: {}\n\n",
        json!({"candidates": [{"content": {"role": "model", "parts": [{"text": "Block "}]}}]}),
        text_response("42"),
    );
    Mock::given(method("POST"))
        .and(path(format!("{MODEL_PATH}:streamGenerateContent")))
        .and(query_param("alt", "sse"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .mount(&server)
        .await;

    let req = LlmRequest::new("gemini-2.0-flash-001", vec![Content::user("block?")]);
    let chunks: Vec<_> = model_for(&server).generate_content(req, true).await.unwrap().collect().await;

    assert_eq!(chunks.len(), 2);
    let first = chunks[0].as_ref().unwrap();
    assert!(first.partial);
    assert_eq!(first.content.as_ref().unwrap().text().as_deref(), Some("Block "));
    let last = chunks[1].as_ref().unwrap();
    assert!(last.turn_complete);
    assert!(!last.partial);
}

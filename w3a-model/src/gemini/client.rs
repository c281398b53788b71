use super::convert::{GenerateContentResponse, from_wire_response, to_wire_request};
use crate::retry::{
    RetryConfig, execute_with_retry, is_retryable_model_error, is_retryable_status_code,
};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::{
    Client, Response,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use tracing::Instrument;
use url::Url;
use w3a_core::{Llm, LlmRequest, LlmResponseStream, Result, W3aError};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-001";

pub struct GeminiModel {
    http_client: Client,
    base_url: Url,
    model_name: String,
    retry_config: RetryConfig,
}

impl GeminiModel {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        let header = HeaderValue::from_str(&api_key)
            .map_err(|e| W3aError::Config(format!("invalid Gemini API key: {e}")))?;
        let headers = HeaderMap::from_iter([(HeaderName::from_static("x-goog-api-key"), header)]);
        let http_client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| W3aError::Model(format!("failed to build HTTP client: {e}")))?;
        let base_url = Url::parse(DEFAULT_BASE_URL)
            .map_err(|e| W3aError::Config(format!("invalid base URL: {e}")))?;

        let model = model.into();
        let model_name = model.strip_prefix("models/").unwrap_or(&model).to_string();

        Ok(Self { http_client, base_url, model_name, retry_config: RetryConfig::default() })
    }

    /// Points the client at another API root, e.g. a proxy or a test server.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        let normalized =
            if base_url.ends_with('/') { base_url.to_string() } else { format!("{base_url}/") };
        self.base_url = Url::parse(&normalized)
            .map_err(|e| W3aError::Config(format!("invalid base URL '{base_url}': {e}")))?;
        Ok(self)
    }

    #[must_use]
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry_config
    }

    fn build_url(&self, method: &str) -> Result<Url> {
        self.base_url
            .join(&format!("models/{}:{method}", self.model_name))
            .map_err(|e| W3aError::Config(format!("invalid model URL: {e}")))
    }

    async fn post(&self, url: Url, body: &serde_json::Value) -> Result<Response> {
        execute_with_retry(&self.retry_config, is_retryable_model_error, || {
            let request = self.http_client.post(url.clone()).json(body);
            async move {
                let response = request
                    .send()
                    .await
                    .map_err(|e| W3aError::Model(format!("Gemini request failed: {e}")))?;
                check_response(response).await
            }
        })
        .await
    }
}

async fn check_response(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let label =
        if is_retryable_status_code(status.as_u16()) { "retryable" } else { "non-retryable" };
    Err(W3aError::Model(format!("Gemini API error ({status}) [{label}]: {body}")))
}

#[async_trait]
impl Llm for GeminiModel {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn generate_content(&self, req: LlmRequest, stream: bool) -> Result<LlmResponseStream> {
        let span = w3a_telemetry::model_call_span(&self.model_name);
        let body = serde_json::to_value(to_wire_request(&req))?;

        if stream {
            let mut url = self.build_url("streamGenerateContent")?;
            url.query_pairs_mut().append_pair("alt", "sse");
            let response = self.post(url, &body).instrument(span).await?;

            let mut events = response.bytes_stream().eventsource();
            let stream = async_stream::stream! {
                while let Some(event) = events.next().await {
                    let event = match event {
                        Ok(event) => event,
                        Err(e) => {
                            yield Err(W3aError::Model(format!("Gemini stream error: {e}")));
                            break;
                        }
                    };
                    if event.data.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<GenerateContentResponse>(&event.data) {
                        Ok(chunk) => {
                            let mut llm_response = from_wire_response(chunk);
                            llm_response.partial = !llm_response.turn_complete;
                            yield Ok(llm_response);
                        }
                        Err(e) => {
                            yield Err(W3aError::Serde(e));
                            break;
                        }
                    }
                }
            };
            Ok(Box::pin(stream))
        } else {
            let url = self.build_url("generateContent")?;
            let response = self.post(url, &body).instrument(span).await?;
            let parsed: GenerateContentResponse = response
                .json()
                .await
                .map_err(|e| W3aError::Model(format!("invalid Gemini response: {e}")))?;
            let mut llm_response = from_wire_response(parsed);
            llm_response.turn_complete = true;

            tracing::debug!(
                model = %self.model_name,
                finish_reason = ?llm_response.finish_reason,
                "Gemini response received"
            );

            let stream = async_stream::stream! {
                yield Ok(llm_response);
            };
            Ok(Box::pin(stream))
        }
    }
}

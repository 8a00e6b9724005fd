//! Vertex AI Gemini backend.
//!
//! One non-streaming `generateContent` call per invocation. Prompt text and
//! the optional attachment go into a single user turn; attachments are sent
//! inline as base64.

use async_trait::async_trait;
use base64::Engine;
use medimind_core::{BackendError, Error, Result};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::backend::{Attachment, Backend};
use crate::config::{Credential, GatewayConfig};

/// Vertex AI `generateContent` client.
pub struct VertexGemini {
    client: Client,
    endpoint: String,
    model: String,
    credential: Credential,
    temperature: f64,
    max_tokens: usize,
}

impl VertexGemini {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        let endpoint = format!(
            "https://{loc}-aiplatform.googleapis.com/v1/projects/{project}/locations/{loc}/publishers/google/models/{model}:generateContent",
            loc = config.location,
            project = config.project_id,
            model = config.model,
        );

        Ok(Self {
            client,
            endpoint,
            model: config.model.clone(),
            credential: config.credential.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// Point at a different endpoint (proxies, regional mirrors).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Backend for VertexGemini {
    async fn generate(
        &self,
        prompt: &str,
        attachment: Option<&Attachment>,
    ) -> std::result::Result<String, BackendError> {
        let body = build_request_body(prompt, attachment, self.temperature, self.max_tokens);

        debug!(
            "generateContent model={} attachment={:?}",
            self.model,
            attachment.map(|a| (&a.mime_type, a.len()))
        );

        let request = self.client.post(&self.endpoint).json(&body);
        let request = match &self.credential {
            Credential::BearerToken(token) => request.bearer_auth(token),
            Credential::ApiKey(key) => request.header("x-goog-api-key", key),
        };

        let response = request.send().await.map_err(|e| {
            BackendError::QuotaOrTransportFailure(format!("request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Backend returned {}: {}", status, body);
            return Err(classify_status(status, &body));
        }

        let parsed: Value = response.json().await.map_err(|e| {
            BackendError::QuotaOrTransportFailure(format!("invalid response body: {}", e))
        })?;

        extract_text(&parsed)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn build_request_body(
    prompt: &str,
    attachment: Option<&Attachment>,
    temperature: f64,
    max_tokens: usize,
) -> Value {
    let mut parts = vec![json!({ "text": prompt })];
    if let Some(att) = attachment {
        parts.push(json!({
            "inlineData": {
                "mimeType": att.mime_type,
                "data": base64::engine::general_purpose::STANDARD.encode(&att.data),
            }
        }));
    }

    json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": {
            "temperature": temperature,
            "maxOutputTokens": max_tokens,
        },
    })
}

fn classify_status(status: StatusCode, body: &str) -> BackendError {
    let detail = format!("API error {}: {}", status, body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            BackendError::AuthenticationFailure(detail)
        }
        StatusCode::BAD_REQUEST
        | StatusCode::UNSUPPORTED_MEDIA_TYPE
        | StatusCode::PAYLOAD_TOO_LARGE
        | StatusCode::UNPROCESSABLE_ENTITY => BackendError::UnsupportedInput(detail),
        _ => BackendError::QuotaOrTransportFailure(detail),
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: &Value) -> std::result::Result<String, BackendError> {
    if let Some(reason) = response["promptFeedback"]["blockReason"].as_str() {
        return Err(BackendError::UnsupportedInput(format!(
            "prompt blocked: {}",
            reason
        )));
    }

    let text: String = response["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p["text"].as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        let finish = response["candidates"][0]["finishReason"]
            .as_str()
            .unwrap_or("none");
        if finish == "SAFETY" {
            return Err(BackendError::UnsupportedInput(
                "response withheld by safety filter".into(),
            ));
        }
        return Err(BackendError::QuotaOrTransportFailure(format!(
            "backend returned no text (finishReason={})",
            finish
        )));
    }

    Ok(text)
}

//! Remote vision-language client, OpenAI-compatible chat completions.
//!
//! Carries the text-extraction and scene-description requests: the
//! image travels as a base64 data URL inside the user message.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use thiserror::Error;

const OCR_PROMPT: &str =
    "Extract only the text from the following image without adding any extra words or explanation:";
const DESCRIBE_PROMPT: &str = "What's in this image?";
const MAX_COMPLETION_TOKENS: u32 = 300;
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Error, Debug)]
pub enum VlmError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("vision service returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("vision service returned no choices")]
    EmptyResponse,
}

// --- OpenAI-compatible serde structs ---

#[derive(serde::Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(serde::Serialize)]
struct ChatMessage {
    role: String,
    content: serde_json::Value,
}

#[derive(serde::Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(serde::Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(serde::Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Client for an OpenAI-compatible vision endpoint.
pub struct VlmClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl VlmClient {
    pub fn new(endpoint: &str, api_key: Option<String>) -> Result<Self, VlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Extract the text visible in an image, nothing else.
    pub async fn extract_text(
        &self,
        model: &str,
        image_bytes: &[u8],
        mime: &str,
    ) -> Result<String, VlmError> {
        self.chat(model, OCR_PROMPT, image_bytes, mime).await
    }

    /// Free-form description of the image contents.
    pub async fn describe(
        &self,
        model: &str,
        image_bytes: &[u8],
        mime: &str,
    ) -> Result<String, VlmError> {
        self.chat(model, DESCRIBE_PROMPT, image_bytes, mime).await
    }

    async fn chat(
        &self,
        model: &str,
        prompt: &str,
        image_bytes: &[u8],
        mime: &str,
    ) -> Result<String, VlmError> {
        let data_url = format!("data:{mime};base64,{}", STANDARD.encode(image_bytes));

        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: serde_json::json!([
                    {"type": "text", "text": prompt},
                    {"type": "image_url", "image_url": {"url": data_url}}
                ]),
            }],
            max_tokens: MAX_COMPLETION_TOKENS,
        };

        let mut req = self
            .client
            .post(format!("{}/v1/chat/completions", self.endpoint))
            .json(&request);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(VlmError::Api { status, message });
        }

        let chat: ChatResponse = response.json().await?;
        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .ok_or(VlmError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_trailing_slash() {
        let client = VlmClient::new("https://api.openai.com/", None).unwrap();
        assert_eq!(client.endpoint, "https://api.openai.com");
    }

    #[test]
    fn test_chat_request_shape() {
        let request = ChatRequest {
            model: "gpt-4o".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: serde_json::json!([
                    {"type": "text", "text": OCR_PROMPT},
                    {"type": "image_url", "image_url": {"url": "data:image/png;base64,abc"}}
                ]),
            }],
            max_tokens: MAX_COMPLETION_TOKENS,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["max_tokens"], 300);
        assert_eq!(json["messages"][0]["content"][1]["type"], "image_url");
    }

    #[test]
    fn test_chat_response_parsing() {
        let json = serde_json::json!({
            "choices": [{
                "message": { "content": "  INVOICE #42  " }
            }]
        });
        let response: ChatResponse = serde_json::from_value(json).unwrap();
        assert_eq!(response.choices[0].message.content, "  INVOICE #42  ");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_http_error() {
        let client = VlmClient::new("http://127.0.0.1:1", None).unwrap();
        let result = client.extract_text("gpt-4o", b"img", "image/png").await;
        assert!(matches!(result, Err(VlmError::Http(_))));
    }
}

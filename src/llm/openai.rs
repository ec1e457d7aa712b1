//! OpenAI-compatible completion provider

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::{HelpdeskError, Result};
use crate::llm::{ChatMessage, CompletionProvider, TokenStream};

/// Client for any `/chat/completions`-compatible endpoint
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            // Zero temperature for consistent support answers
            temperature: 0.0,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.openai_api_key.clone())
            .with_model(settings.openai_model.clone())
            .with_base_url(settings.openai_base_url.clone())
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom base URL (for API-compatible services)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamResponse {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(HelpdeskError::Generation(format!(
                "completion request failed with {status}: {detail}"
            )));
        }

        let data: ChatResponse = response.json().await?;
        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| HelpdeskError::Generation("empty completion response".to_string()))?;

        Ok(choice.message.content.unwrap_or_default())
    }

    fn stream_complete(&self, messages: Vec<ChatMessage>) -> TokenStream {
        let client = self.client.clone();
        let api_key = self.api_key.clone();
        let base_url = self.base_url.clone();
        let model = self.model.clone();
        let temperature = self.temperature;

        Box::pin(async_stream::stream! {
            let body = serde_json::json!({
                "model": model,
                "messages": messages,
                "temperature": temperature,
                "stream": true,
            });

            let response = match client
                .post(format!("{base_url}/chat/completions"))
                .header("Authorization", format!("Bearer {api_key}"))
                .json(&body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    yield Err(HelpdeskError::Generation(format!("stream request failed: {e}")));
                    return;
                }
            };

            if !response.status().is_success() {
                let status = response.status();
                let detail = response.text().await.unwrap_or_default();
                yield Err(HelpdeskError::Generation(format!(
                    "stream request failed with {status}: {detail}"
                )));
                return;
            }

            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let chunk = match chunk_result {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        yield Err(HelpdeskError::Generation(format!("stream error: {e}")));
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&chunk));

                // Process complete SSE events from the buffer
                while let Some(pos) = buffer.find("\n\n") {
                    let event = buffer[..pos].to_string();
                    buffer = buffer[pos + 2..].to_string();

                    for line in event.lines() {
                        let Some(data) = line.strip_prefix("data: ") else {
                            continue;
                        };
                        if data.trim() == "[DONE]" {
                            continue;
                        }
                        let parsed: StreamResponse = match serde_json::from_str(data) {
                            Ok(parsed) => parsed,
                            Err(_) => continue,
                        };
                        for choice in parsed.choices {
                            if let Some(content) = choice.delta.content {
                                if !content.is_empty() {
                                    yield Ok(content);
                                }
                            }
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("hi")];
        let body = ChatRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            temperature: 0.0,
            stream: false,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        // stream=false is omitted entirely
        assert!(json.get("stream").is_none());
    }

    #[test]
    fn test_stream_delta_parsing() {
        let data = r#"{"choices":[{"delta":{"content":"Hel"}}]}"#;
        let parsed: StreamResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.choices[0].delta.content.as_deref(), Some("Hel"));

        let done_delta = r#"{"choices":[{"delta":{}}]}"#;
        let parsed: StreamResponse = serde_json::from_str(done_delta).unwrap();
        assert!(parsed.choices[0].delta.content.is_none());
    }

    #[test]
    fn test_builder() {
        let provider = OpenAiProvider::new("key")
            .with_model("gpt-4o")
            .with_base_url("http://localhost:8080/v1")
            .with_temperature(0.2);
        assert_eq!(provider.model, "gpt-4o");
        assert_eq!(provider.base_url, "http://localhost:8080/v1");
    }
}

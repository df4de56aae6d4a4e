//! Generative model access
//!
//! A thin client for an OpenAI-compatible chat completions endpoint. The
//! request contract is an ordered list of role/content turns; the response
//! contract is a single text completion. Every failure class (missing key,
//! transport error, non-2xx status, malformed body, timeout) collapses to
//! `Error::Generation` so callers have exactly one fallback decision to make.

mod fallback;
mod prompt;

pub use fallback::*;
pub use prompt::*;

use crate::config::ChatConfig;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// One conversation turn in the completions request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Chat completions client
#[derive(Clone)]
pub struct ChatClient {
    config: ChatConfig,
    client: reqwest::Client,
}

impl ChatClient {
    pub fn new(config: ChatConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }

    /// True when an API key is present
    pub fn configured(&self) -> bool {
        !self.config.api_key.trim().is_empty()
    }

    /// Request a single completion over the ordered turns
    pub async fn complete(&self, messages: &[ChatTurn]) -> Result<String> {
        if !self.configured() {
            return Err(Error::Generation(
                "Chat API key not configured".to_string(),
            ));
        }

        let body = json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        });

        debug!("Requesting completion over {} turns", messages.len());

        let resp = self
            .client
            .post(&self.config.api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Generation(format!("Chat API connection failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::Generation(format!(
                "Chat API error {}: {}",
                status, text
            )));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| Error::Generation(format!("Malformed chat API response: {}", e)))?;

        let content = json["choices"]
            .get(0)
            .and_then(|choice| choice["message"]["content"].as_str())
            .ok_or_else(|| Error::Generation("No choices in response".to_string()))?;

        Ok(content.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(api_url: String, api_key: &str) -> ChatConfig {
        ChatConfig {
            api_url,
            api_key: api_key.to_string(),
            ..ChatConfig::default()
        }
    }

    #[tokio::test]
    async fn test_complete_parses_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "مرحباً"}}]
            })))
            .mount(&server)
            .await;

        let client = ChatClient::new(test_config(
            format!("{}/v1/chat/completions", server.uri()),
            "test-key",
        ))
        .unwrap();

        let answer = client.complete(&[ChatTurn::user("سؤال")]).await.unwrap();
        assert_eq!(answer, "مرحباً");
    }

    #[tokio::test]
    async fn test_complete_non_2xx_is_generation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let client = ChatClient::new(test_config(server.uri(), "test-key")).unwrap();
        let err = client.complete(&[ChatTurn::user("سؤال")]).await.unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
    }

    #[tokio::test]
    async fn test_complete_malformed_body_is_generation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"unexpected": true})),
            )
            .mount(&server)
            .await;

        let client = ChatClient::new(test_config(server.uri(), "test-key")).unwrap();
        let err = client.complete(&[ChatTurn::user("سؤال")]).await.unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
    }

    #[tokio::test]
    async fn test_complete_without_key_fails_before_any_request() {
        let client = ChatClient::new(test_config(
            "http://127.0.0.1:1/v1/chat/completions".to_string(),
            "",
        ))
        .unwrap();
        let err = client.complete(&[ChatTurn::user("سؤال")]).await.unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
        assert!(!client.configured());
    }
}

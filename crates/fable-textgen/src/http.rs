//! HTTP moral generator.

use std::time::Duration;

use async_trait::async_trait;
use fable_core::error::DomainError;
use fable_core::moral::MoralGenerator;
use tracing::debug;

const SYSTEM_PROMPT: &str = "You write the moral of a short fable. Answer with a single \
    sentence of at most twenty words, in the style of Aesop, with no preamble.";

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoralServiceConfig {
    /// Base URL; requests go to `{api_url}/chat/completions`.
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

/// Generates morals through a chat completions API.
#[derive(Debug, Clone)]
pub struct HttpMoralGenerator {
    client: reqwest::Client,
    config: MoralServiceConfig,
}

impl HttpMoralGenerator {
    /// Creates a generator. `request_timeout` bounds each HTTP call on top of
    /// whatever deadline the caller applies.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the HTTP client cannot be
    /// built.
    pub fn new(config: MoralServiceConfig, request_timeout: Duration) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| DomainError::Infrastructure(format!("http client: {e}")))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.api_url.trim_end_matches('/'))
    }

    fn request_body(&self, narrative: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": narrative}
            ],
            "temperature": 0.9,
            "max_tokens": 60
        })
    }
}

#[async_trait]
impl MoralGenerator for HttpMoralGenerator {
    async fn generate_moral(&self, narrative: &str) -> Result<String, DomainError> {
        let mut request = self.client.post(self.endpoint()).json(&self.request_body(narrative));
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DomainError::ExternalService(format!("moral request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(DomainError::ExternalService(format!(
                "moral service returned {status}: {body}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| DomainError::ExternalService(format!("moral response parse failed: {e}")))?;

        let moral = extract_content(&json)?;
        debug!(model = %self.config.model, "moral received");
        Ok(moral)
    }
}

/// Pulls `choices[0].message.content` out of a chat completions response.
fn extract_content(json: &serde_json::Value) -> Result<String, DomainError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            DomainError::ExternalService("response missing choices[0].message.content".to_owned())
        })
}

/// Used when no endpoint is configured. Every request fails, so the game
/// always uses its fallback morals.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledMoralGenerator;

#[async_trait]
impl MoralGenerator for DisabledMoralGenerator {
    async fn generate_moral(&self, _narrative: &str) -> Result<String, DomainError> {
        Err(DomainError::ExternalService(
            "no moral service configured".to_owned(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(api_url: &str) -> HttpMoralGenerator {
        HttpMoralGenerator::new(
            MoralServiceConfig {
                api_url: api_url.to_owned(),
                api_key: None,
                model: "fable-small".to_owned(),
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_extract_content() {
        let json = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Kindness is never wasted."}}]
        });

        assert_eq!(extract_content(&json).unwrap(), "Kindness is never wasted.");
    }

    #[test]
    fn test_extract_content_missing_choices() {
        let err = extract_content(&serde_json::json!({"error": "overloaded"})).unwrap_err();

        assert!(matches!(err, DomainError::ExternalService(_)));
    }

    #[test]
    fn test_endpoint_and_body() {
        let generator = generator("http://localhost:11434/v1/");

        let body = generator.request_body("Once upon a time.");

        assert_eq!(generator.endpoint(), "http://localhost:11434/v1/chat/completions");
        assert_eq!(body["model"], "fable-small");
        assert_eq!(body["messages"][1]["content"], "Once upon a time.");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_an_external_error() {
        let generator = generator("http://127.0.0.1:9");

        let err = generator.generate_moral("Once upon a time.").await.unwrap_err();

        assert!(matches!(err, DomainError::ExternalService(_)));
    }

    #[tokio::test]
    async fn test_disabled_generator_always_fails() {
        let err = DisabledMoralGenerator
            .generate_moral("Once upon a time.")
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::ExternalService(_)));
    }
}

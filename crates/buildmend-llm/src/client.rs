//! Chat-completions client
//!
//! One prompt in, one completion out. Failed calls are retried with a
//! linearly growing delay; exhaustion surfaces as [`LlmError::Exhausted`]
//! so callers can fall back to something deterministic.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::LlmError;
use crate::provider::{LlmConfig, LlmOptions};
use crate::Result;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    content: Option<String>,
}

/// How the raw completion is post-processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// Trimmed completion text.
    #[default]
    Raw,
    /// Body of the first fenced code block, or the trimmed text if none.
    ExtractCode,
}

/// Delay before retry number `attempt` (1-based).
pub fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    Duration::from_millis(base_ms.saturating_mul(u64::from(attempt)))
}

/// Return the body of the first fenced code block in `text`.
pub fn extract_code_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim_end_matches(['\n', '\r']))
}

/// Client for an OpenAI-compatible endpoint
pub struct LlmClient {
    config: Option<LlmConfig>,
    options: LlmOptions,
    http_client: reqwest::Client,
}

impl LlmClient {
    /// Create a client. `None` yields a disabled client.
    pub fn new(config: Option<LlmConfig>, options: LlmOptions) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("buildmend/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(options.request_timeout_secs))
            .build()?;

        if let Some(config) = &config {
            info!(
                provider = config.provider.name(),
                model = %config.model,
                "text generation enabled"
            );
        }

        Ok(LlmClient {
            config,
            options,
            http_client,
        })
    }

    /// Create client from environment variables
    pub fn from_env(options: LlmOptions) -> Result<Self> {
        Self::new(LlmConfig::from_env(), options)
    }

    /// Whether a provider is configured
    pub fn is_enabled(&self) -> bool {
        self.config.is_some()
    }

    pub fn config(&self) -> Option<&LlmConfig> {
        self.config.as_ref()
    }

    pub fn options(&self) -> &LlmOptions {
        &self.options
    }

    /// Send `prompt` and return the processed completion.
    pub async fn complete(&self, prompt: &str, mode: ResponseMode) -> Result<String> {
        let config = self.config.as_ref().ok_or(LlmError::NotConfigured)?;
        let attempts = self.options.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            debug!(provider = config.provider.name(), attempt, attempts, "calling provider");

            match self.send(config, prompt).await {
                Ok(text) => {
                    let text = text.trim();
                    let processed = match mode {
                        ResponseMode::Raw => text,
                        ResponseMode::ExtractCode => extract_code_block(text).unwrap_or(text),
                    };
                    return Ok(processed.to_string());
                }
                Err(err) => {
                    warn!(attempt, attempts, error = %err, "provider call failed");
                    last_error = Some(err);
                    if attempt < attempts {
                        tokio::time::sleep(backoff_delay(self.options.retry_base_delay_ms, attempt))
                            .await;
                    }
                }
            }
        }

        Err(LlmError::Exhausted {
            attempts,
            last: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    async fn send(&self, config: &LlmConfig, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &config.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
        };

        let response = self
            .http_client
            .post(config.completions_url())
            .bearer_auth(&config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: ChatResponse = serde_json::from_str(&response.text().await?)?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Provider;

    #[test]
    fn test_backoff_grows_linearly() {
        assert_eq!(backoff_delay(1000, 1), Duration::from_millis(1000));
        assert_eq!(backoff_delay(1000, 2), Duration::from_millis(2000));
        assert_eq!(backoff_delay(250, 3), Duration::from_millis(750));
    }

    #[test]
    fn test_extract_code_block() {
        let text = "Here you go:\n```tsx\nconst a = 1;\nconst b = 2;\n```\nDone.";
        assert_eq!(extract_code_block(text), Some("const a = 1;\nconst b = 2;"));
    }

    #[test]
    fn test_extract_code_block_missing() {
        assert_eq!(extract_code_block("no fences here"), None);
        assert_eq!(extract_code_block("```tsx\nunterminated"), None);
    }

    #[test]
    fn test_disabled_client() {
        let client = LlmClient::new(None, LlmOptions::default()).unwrap();
        assert!(!client.is_enabled());
        assert!(client.config().is_none());
    }

    #[tokio::test]
    async fn test_disabled_client_refuses_prompt() {
        let client = LlmClient::new(None, LlmOptions::default()).unwrap();
        let err = client.complete("fix it", ResponseMode::Raw).await.unwrap_err();
        assert!(matches!(err, LlmError::NotConfigured));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_exhausts_attempts() {
        let config =
            LlmConfig::new(Provider::OpenAi, "sk-test").with_base_url("http://127.0.0.1:9");
        let options = LlmOptions {
            max_attempts: 2,
            retry_base_delay_ms: 1,
            request_timeout_secs: 2,
            ..Default::default()
        };
        let client = LlmClient::new(Some(config), options).unwrap();

        let err = client.complete("fix it", ResponseMode::Raw).await.unwrap_err();
        match err {
            LlmError::Exhausted { attempts, .. } => assert_eq!(attempts, 2),
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }
}

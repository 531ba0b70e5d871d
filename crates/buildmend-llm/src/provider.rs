//! Provider detection and request options
//!
//! Providers are picked from environment credentials in a fixed priority
//! order. The first provider whose key is present wins.

use serde::{Deserialize, Serialize};

/// Override for the detected model name.
pub const MODEL_OVERRIDE_VAR: &str = "BUILDMEND_LLM_MODEL";
/// Override for the detected API base URL.
pub const BASE_URL_OVERRIDE_VAR: &str = "BUILDMEND_LLM_BASE_URL";

/// Known OpenAI-compatible providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    DeepSeek,
    Glm,
    OpenAi,
}

impl Provider {
    /// Detection order.
    pub const ALL: [Provider; 3] = [Provider::DeepSeek, Provider::Glm, Provider::OpenAi];

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            Provider::DeepSeek => "DeepSeek",
            Provider::Glm => "GLM",
            Provider::OpenAi => "OpenAI",
        }
    }

    /// Environment variables holding the API key, checked in order
    pub fn key_vars(&self) -> &'static [&'static str] {
        match self {
            Provider::DeepSeek => &["DEEPSEEK_TOKEN"],
            Provider::Glm => &["GLM_API_KEY", "GLM_TOKEN"],
            Provider::OpenAi => &["OPENAI_API_KEY"],
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::DeepSeek => "https://api.deepseek.com/v1",
            Provider::Glm => "https://open.bigmodel.cn/api/paas/v4",
            Provider::OpenAi => "https://api.openai.com/v1",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::DeepSeek => "deepseek-chat",
            Provider::Glm => "glm-4-air",
            Provider::OpenAi => "gpt-4",
        }
    }
}

/// Resolved endpoint configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: Provider,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl LlmConfig {
    /// Create config for a specific provider with its default endpoint
    pub fn new(provider: Provider, api_key: &str) -> Self {
        LlmConfig {
            provider,
            api_key: api_key.to_string(),
            base_url: provider.default_base_url().to_string(),
            model: provider.default_model().to_string(),
        }
    }

    /// Point the config at a different base URL
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Detect a provider from the process environment
    pub fn from_env() -> Option<Self> {
        Self::detect(|key| std::env::var(key).ok())
    }

    /// Detect a provider through an arbitrary variable lookup.
    ///
    /// Empty values count as unset.
    pub fn detect<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = Provider::ALL.iter().find_map(|provider| {
            provider
                .key_vars()
                .iter()
                .find_map(|var| present(var))
                .map(|key| LlmConfig::new(*provider, &key))
        })?;

        if let Some(model) = present(MODEL_OVERRIDE_VAR) {
            config = config.with_model(&model);
        }
        if let Some(base_url) = present(BASE_URL_OVERRIDE_VAR) {
            config = config.with_base_url(&base_url);
        }
        Some(config)
    }

    /// Full chat-completions endpoint
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

/// Sampling and retry knobs for one client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmOptions {
    pub max_tokens: u32,
    pub temperature: f32,
    /// Total attempts per prompt, including the first.
    pub max_attempts: u32,
    /// Delay before retry `n` is `retry_base_delay_ms * n`.
    pub retry_base_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for LlmOptions {
    fn default() -> Self {
        Self {
            max_tokens: 4000,
            temperature: 0.1,
            max_attempts: 3,
            retry_base_delay_ms: 1000,
            request_timeout_secs: 120,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_detect_none_without_keys() {
        let vars = env(&[("HOME", "/root")]);
        assert!(LlmConfig::detect(|k| vars.get(k).cloned()).is_none());
    }

    #[test]
    fn test_detect_priority_order() {
        let vars = env(&[("OPENAI_API_KEY", "sk-open"), ("GLM_TOKEN", "glm-key")]);
        let config = LlmConfig::detect(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.provider, Provider::Glm);
        assert_eq!(config.api_key, "glm-key");
        assert_eq!(config.model, "glm-4-air");
    }

    #[test]
    fn test_detect_skips_blank_values() {
        let vars = env(&[("DEEPSEEK_TOKEN", "  "), ("OPENAI_API_KEY", "sk-open")]);
        let config = LlmConfig::detect(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.provider, Provider::OpenAi);
        assert_eq!(config.completions_url(), "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn test_detect_applies_overrides() {
        let vars = env(&[
            ("DEEPSEEK_TOKEN", "ds"),
            (MODEL_OVERRIDE_VAR, "deepseek-coder"),
            (BASE_URL_OVERRIDE_VAR, "http://localhost:8080/v1/"),
        ]);
        let config = LlmConfig::detect(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.model, "deepseek-coder");
        assert_eq!(
            config.completions_url(),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn test_options_default() {
        let options = LlmOptions::default();
        assert_eq!(options.max_attempts, 3);
        assert_eq!(options.max_tokens, 4000);
        assert_eq!(options.retry_base_delay_ms, 1000);
    }
}

//! Text generation capability and its providers.
//!
//! | Config Value | Generator |
//! |-------------|-----------|
//! | `"disabled"` | [`DisabledGenerator`] |
//! | `"openai"` | [`OpenAIGenerator`] (`/v1/chat/completions`) |
//! | `"ollama"` | [`OllamaGenerator`] (`/api/chat`) |
//!
//! Both HTTP providers share the retry policy in [`crate::http`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::GenerationConfig;
use crate::error::{RagError, Result};
use crate::http;

const OPENAI_BASE_URL: &str = "https://api.openai.com";
const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// (system prompt, user prompt) → text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn model_name(&self) -> &str;
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

pub struct DisabledGenerator;

#[async_trait]
impl TextGenerator for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }
    async fn generate(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
        Err(RagError::Configuration(
            "generation provider is disabled".to_string(),
        ))
    }
}

fn messages(system_prompt: &str, user_prompt: &str) -> serde_json::Value {
    serde_json::json!([
        {"role": "system", "content": system_prompt},
        {"role": "user", "content": user_prompt},
    ])
}

fn required_model(config: &GenerationConfig, label: &str) -> Result<String> {
    config.model.clone().ok_or_else(|| {
        RagError::Configuration(format!("generation.model required for {} provider", label))
    })
}

/// Chat completions against OpenAI or a compatible server.
pub struct OpenAIGenerator {
    model: String,
    api_key: String,
    base_url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAIGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let model = required_model(config, "OpenAI")?;
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            RagError::Configuration("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self {
            model,
            api_key,
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAIGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages(system_prompt, user_prompt),
        });
        let json = http::post_json(
            &self.client,
            &format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/')),
            Some(&self.api_key),
            &body,
            self.max_retries,
            "OpenAI",
        )
        .await?;
        json.pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                RagError::Capability("invalid OpenAI response: missing message content".into())
            })
    }
}

/// Chat against a local Ollama instance, non-streaming.
pub struct OllamaGenerator {
    model: String,
    url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            model: required_model(config, "Ollama")?,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OLLAMA_BASE_URL.to_string()),
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages(system_prompt, user_prompt),
            "stream": false,
        });
        let json = http::post_json(
            &self.client,
            &format!("{}/api/chat", self.url.trim_end_matches('/')),
            None,
            &body,
            self.max_retries,
            "Ollama",
        )
        .await?;
        json.pointer("/message/content")
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                RagError::Capability("invalid Ollama response: missing message content".into())
            })
    }
}

pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn TextGenerator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledGenerator)),
        "openai" => Ok(Arc::new(OpenAIGenerator::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config)?)),
        other => Err(RagError::Configuration(format!(
            "unknown generation provider: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_generator() {
        let err = DisabledGenerator.generate("s", "u").await.unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_unknown_provider() {
        let config = GenerationConfig {
            provider: "bard".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            create_generator(&config),
            Err(RagError::Configuration(_))
        ));
    }

    #[test]
    fn test_ollama_requires_model() {
        let config = GenerationConfig {
            provider: "ollama".to_string(),
            ..Default::default()
        };
        assert!(OllamaGenerator::new(&config).is_err());
    }
}

//! Topic generation backends: prompt in, raw model text out.
//!
//! The synthesizer owns parsing and validation; a backend only has to
//! return whatever the model produced, or an error.

use std::time::Duration;

use serde::Deserialize;

use super::llm_subprocess::CommandGenerator;
use crate::config::{GeneratorBackend, GeneratorConfig};
use crate::{TopicsError, TopicsResult};

pub trait TopicGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> TopicsResult<String>;
}

/// Build the generator selected in config.
pub fn from_config(cfg: &GeneratorConfig) -> Box<dyn TopicGenerator> {
    match cfg.backend {
        GeneratorBackend::Http => Box::new(HttpGenerator::from_config(cfg)),
        GeneratorBackend::Command => Box::new(CommandGenerator::from_config(cfg)),
        GeneratorBackend::Disabled => Box::new(DisabledGenerator),
    }
}

/// OpenAI-compatible chat completions client.
pub struct HttpGenerator {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
    max_new_tokens: u32,
    temperature: f64,
    top_p: f64,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl HttpGenerator {
    pub fn from_config(cfg: &GeneratorConfig) -> Self {
        Self {
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            api_key: super::api_key(cfg.api_key_env.as_deref()),
            timeout: Duration::from_secs(cfg.timeout_secs),
            max_new_tokens: cfg.max_new_tokens,
            temperature: cfg.temperature,
            top_p: cfg.top_p,
        }
    }
}

impl TopicGenerator for HttpGenerator {
    fn generate(&self, prompt: &str) -> TopicsResult<String> {
        tracing::info!(
            model = %self.model,
            prompt_len = prompt.len(),
            "Generation request starting"
        );

        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": self.max_new_tokens,
            "temperature": self.temperature,
            "top_p": self.top_p,
        });

        let mut request = ureq::post(&self.endpoint).header("content-type", "application/json");
        if let Some(ref key) = self.api_key {
            request = request.header("Authorization", &format!("Bearer {}", key));
        }

        let mut response = request
            .config()
            .timeout_global(Some(self.timeout))
            .build()
            .send_json(&body)
            .map_err(|e| TopicsError::Provider(format!("Generation request failed: {}", e)))?;

        let completion: ChatCompletion = response
            .body_mut()
            .read_json()
            .map_err(|e| TopicsError::Provider(format!("Invalid completion response: {}", e)))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(TopicsError::Provider("Model returned empty response".into()));
        }
        Ok(content)
    }
}

/// Never reaches a model; every call fails so the keyword fallback is used.
pub struct DisabledGenerator;

impl TopicGenerator for DisabledGenerator {
    fn generate(&self, _prompt: &str) -> TopicsResult<String> {
        Err(TopicsError::Provider("Generation disabled".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_always_fails() {
        let err = DisabledGenerator.generate("anything").unwrap_err();
        assert!(matches!(err, TopicsError::Provider(_)));
    }

    #[test]
    fn test_http_unreachable_is_provider_error() {
        let cfg = GeneratorConfig {
            endpoint: "http://127.0.0.1:9/v1/chat/completions".to_string(),
            timeout_secs: 1,
            ..GeneratorConfig::default()
        };
        let err = HttpGenerator::from_config(&cfg).generate("prompt").unwrap_err();
        assert!(matches!(err, TopicsError::Provider(_)));
    }

    #[test]
    fn test_completion_parsing() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"[]"}}]}"#;
        let parsed: ChatCompletion = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("[]"));
    }
}

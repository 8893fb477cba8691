// Language-model client
//
// The pipeline only needs "prompt in, text out". The HTTP implementation
// talks to any OpenAI-compatible chat completion endpoint.

use crate::config::AiConfig;
use crate::error::IngestError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// A source of roadmap text. Any failure to produce text is a transport error.
pub trait LanguageModel {
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String, IngestError>> + Send;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

const SYSTEM_PROMPT: &str = "You are a business planning assistant. Produce practical, \
dated roadmaps with milestones, tasks, budget, weekly calendar, risks and tips.";

pub struct HttpLanguageModel {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl HttpLanguageModel {
    /// Build a client from config. The API key is read from the environment
    /// variable the config names; a missing key is allowed for local servers.
    pub fn from_config(config: &AiConfig) -> Result<Self, IngestError> {
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("venture-roadmap")
            .build()
            .map_err(|e| IngestError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let api_key = std::env::var(&config.api_key_env).ok().filter(|k| !k.is_empty());
        if api_key.is_none() {
            log::warn!(
                "Environment variable {} is not set; calling {} without credentials",
                config.api_key_env,
                config.base_url
            );
        }

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout,
        })
    }

    async fn request(&self, prompt: &str) -> Result<String, IngestError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| IngestError::Transport(format!("Request to {} failed: {}", self.endpoint, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(IngestError::Transport(format!(
                "Model API error ({}): {}",
                status,
                crate::error::truncate_fragment(&text)
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| IngestError::Transport(format!("Failed to parse model response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| IngestError::Transport("Model response had no content".to_string()))
    }
}

impl LanguageModel for HttpLanguageModel {
    async fn complete(&self, prompt: &str) -> Result<String, IngestError> {
        log::debug!("Requesting completion from {} ({})", self.endpoint, self.model);
        match tokio::time::timeout(self.timeout, self.request(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(IngestError::Transport(format!(
                "Model call timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}

/// Prompt for a full business roadmap
pub fn roadmap_prompt(idea: &str) -> String {
    format!(
        "Create a business roadmap for the following idea.\n\n{}\n\n\
         Structure it with a '# Title', then one '## Milestone N: name (duration)' \
         section per milestone listing its tasks as a numbered list. \
         Follow with '## Budget', '## Weekly Calendar', '## Risks' and '## Tips' sections.",
        idea.trim()
    )
}

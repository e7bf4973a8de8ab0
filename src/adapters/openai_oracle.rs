//! OpenAI-compatible chat completions oracle.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::agent_config::{OracleConfig, API_KEY_VAR};
use crate::domain::error::AgentError;
use crate::ports::decision_port::DecisionPort;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f64,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiOracle {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
    endpoint: String,
    temperature: f64,
}

impl OpenAiOracle {
    pub fn new(config: &OracleConfig, api_key: impl Into<String>) -> Result<Self, AgentError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Oracle {
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            temperature: config.temperature,
        })
    }

    /// Reads the API key from the environment; a missing or blank key is fatal.
    pub fn from_env(config: &OracleConfig) -> Result<Self, AgentError> {
        let key = std::env::var(API_KEY_VAR)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        Self::new(config, api_key_or_missing(key)?)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body<'a>(&'a self, context: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: vec![ChatMessage {
                role: "user",
                content: context,
            }],
        }
    }
}

fn api_key_or_missing(key: Option<String>) -> Result<String, AgentError> {
    key.ok_or_else(|| AgentError::MissingCredential {
        name: API_KEY_VAR.to_string(),
    })
}

fn first_choice(resp: ChatResponse) -> Result<String, AgentError> {
    resp.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .ok_or_else(|| AgentError::Oracle {
            reason: "response contained no choices".into(),
        })
}

impl DecisionPort for OpenAiOracle {
    fn decide(&self, context: &str) -> Result<String, AgentError> {
        debug!(model = %self.model, endpoint = %self.endpoint, "calling chat completions");
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(context))
            .send()
            .map_err(|e| AgentError::Oracle {
                reason: format!("request failed: {}", e),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(AgentError::Oracle {
                reason: format!("HTTP {}: {}", status, body.trim()),
            });
        }

        let parsed: ChatResponse = resp.json().map_err(|e| AgentError::Oracle {
            reason: format!("failed to parse response: {}", e),
        })?;
        first_choice(parsed)
    }
}

//! HTTP providers for the Anthropic Messages and OpenAI Chat Completions APIs.

use super::AiProvider;
use crate::{Error, Result};
use serde_json::{Value, json};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const USER_AGENT: &str = concat!("ontology-toolkit/", env!("CARGO_PKG_VERSION"));

/// Anthropic Claude over the Messages API.
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    temperature: f64,
    url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String, model: String, temperature: f64) -> Self {
        Self {
            api_key,
            model,
            temperature,
            url: ANTHROPIC_API_URL.to_string(),
        }
    }

    /// Point the provider at a different endpoint.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

impl AiProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let body = json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "temperature": self.temperature,
            "messages": [{"role": "user", "content": prompt}],
        });
        let response = ureq::post(&self.url)
            .set("x-api-key", &self.api_key)
            .set("anthropic-version", ANTHROPIC_VERSION)
            .set("content-type", "application/json")
            .set("User-Agent", USER_AGENT)
            .send_json(body);
        anthropic_text(&read_json(self.name(), response)?)
    }
}

/// OpenAI models over the Chat Completions API.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    temperature: f64,
    url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: String, temperature: f64) -> Self {
        Self {
            api_key,
            model,
            temperature,
            url: OPENAI_API_URL.to_string(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

impl AiProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let body = json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "temperature": self.temperature,
            "messages": [{"role": "user", "content": prompt}],
        });
        let response = ureq::post(&self.url)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("content-type", "application/json")
            .set("User-Agent", USER_AGENT)
            .send_json(body);
        openai_text(&read_json(self.name(), response)?)
    }
}

fn read_json(
    provider: &str,
    response: std::result::Result<ureq::Response, ureq::Error>,
) -> Result<Value> {
    match response {
        Ok(resp) => resp
            .into_json()
            .map_err(|e| Error::Ai(format!("{}: invalid JSON response: {}", provider, e))),
        Err(ureq::Error::Status(401, _)) => {
            Err(Error::Ai(format!("{}: unauthorized, check the API key", provider)))
        }
        Err(ureq::Error::Status(code, resp)) => {
            let body = resp.into_string().unwrap_or_default();
            Err(Error::Ai(format!("{}: HTTP {}: {}", provider, code, body)))
        }
        Err(e) => Err(Error::Ai(format!("{}: {}", provider, e))),
    }
}

/// Concatenate the text blocks of a Messages API response.
fn anthropic_text(body: &Value) -> Result<String> {
    let blocks = body["content"]
        .as_array()
        .ok_or_else(|| Error::Ai("anthropic: response has no content".to_string()))?;
    let text: String = blocks
        .iter()
        .filter(|b| b["type"] == "text")
        .filter_map(|b| b["text"].as_str())
        .collect();
    if text.is_empty() {
        return Err(Error::Ai("anthropic: response has no text".to_string()));
    }
    Ok(text)
}

/// Text of the first choice of a Chat Completions response.
fn openai_text(body: &Value) -> Result<String> {
    body["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::Ai("openai: response has no message content".to_string()))
}

//! AI-assisted filling and extraction of concepts.
//!
//! The core never talks to a model directly. A provider turns a prompt into
//! text; [`filler`] and [`extractor`] build prompts from the ontology and
//! parse the Markdown tables that come back into field updates.

pub mod extractor;
pub mod filler;
pub mod parse;
pub mod prompts;
pub mod providers;

pub use extractor::ConceptExtractor;
pub use filler::{ConceptFiller, FillOutcome};
pub use providers::{AnthropicProvider, OpenAiProvider};

use crate::config::ResolvedConfig;
use crate::{Error, Result};
use serde::Serialize;

/// A text-generation backend.
pub trait AiProvider {
    /// Provider identifier, e.g. `anthropic`.
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    /// Send a single user prompt and return the model's text reply.
    fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String>;
}

/// Known providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
    Gemini,
    Grok,
}

impl ProviderKind {
    pub fn all() -> &'static [ProviderKind] {
        &[
            ProviderKind::Anthropic,
            ProviderKind::OpenAi,
            ProviderKind::Gemini,
            ProviderKind::Grok,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Grok => "grok",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "claude-sonnet-4-20250514",
            ProviderKind::OpenAi => "gpt-4-turbo",
            ProviderKind::Gemini => "gemini-pro",
            ProviderKind::Grok => "grok-2-latest",
        }
    }

    /// Environment variable holding the API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::Grok => "GROK_API_KEY",
        }
    }

    /// Whether this build can talk to the provider.
    pub fn is_supported(&self) -> bool {
        matches!(self, ProviderKind::Anthropic | ProviderKind::OpenAi)
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        ProviderKind::all()
            .iter()
            .copied()
            .find(|p| p.as_str() == lower)
            .ok_or_else(|| {
                let names: Vec<&str> = ProviderKind::all().iter().map(|p| p.as_str()).collect();
                format!("Unknown AI provider: {}. Available: {}", s, names.join(", "))
            })
    }
}

/// Availability of one provider, as reported by `config-ai`.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    pub provider: ProviderKind,
    pub default_model: &'static str,
    pub api_key_env: &'static str,
    pub supported: bool,
    pub api_key_set: bool,
    pub available: bool,
    pub message: String,
}

/// Check whether `kind` can be used right now.
pub fn check_provider(kind: ProviderKind) -> ProviderStatus {
    let api_key_set = api_key(kind).is_some();
    let supported = kind.is_supported();
    let message = if !supported {
        format!("{} is not supported in this build", kind)
    } else if !api_key_set {
        format!("API key not found: set {}", kind.api_key_env())
    } else {
        format!("{} is ready", kind)
    };
    ProviderStatus {
        provider: kind,
        default_model: kind.default_model(),
        api_key_env: kind.api_key_env(),
        supported,
        api_key_set,
        available: supported && api_key_set,
        message,
    }
}

fn api_key(kind: ProviderKind) -> Option<String> {
    std::env::var(kind.api_key_env())
        .ok()
        .filter(|k| !k.trim().is_empty())
}

/// Build the provider selected by the resolved configuration.
pub fn create_provider(config: &ResolvedConfig) -> Result<Box<dyn AiProvider>> {
    let kind: ProviderKind = config.ai_provider().parse().map_err(Error::Ai)?;
    let model = config
        .ai_model()
        .unwrap_or(kind.default_model())
        .to_string();
    let temperature = config.ai_temperature();

    if !kind.is_supported() {
        return Err(Error::Ai(format!("{} is not supported in this build", kind)));
    }
    let key = api_key(kind).ok_or_else(|| {
        Error::Ai(format!(
            "API key not found. Set the {} environment variable",
            kind.api_key_env()
        ))
    })?;

    tracing::info!(provider = %kind, model = %model, "using AI provider");
    Ok(match kind {
        ProviderKind::Anthropic => Box::new(AnthropicProvider::new(key, model, temperature)),
        ProviderKind::OpenAi => Box::new(OpenAiProvider::new(key, model, temperature)),
        ProviderKind::Gemini | ProviderKind::Grok => {
            return Err(Error::Ai(format!("{} is not supported in this build", kind)));
        }
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigOverrides, OntologyConfig, resolve_layers};
    use serial_test::serial;

    #[test]
    fn test_provider_kind_from_str() {
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("anthropic".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
        let err = "cursor".parse::<ProviderKind>().unwrap_err();
        assert!(err.contains("anthropic, openai, gemini, grok"));
    }

    #[test]
    #[serial]
    fn test_create_provider_requires_key() {
        // SAFETY: serial test
        unsafe {
            std::env::remove_var("ANTHROPIC_API_KEY");
            std::env::remove_var(crate::config::AI_PROVIDER_ENV);
            std::env::remove_var(crate::config::AI_MODEL_ENV);
        }
        let config = resolve_layers(
            &OntologyConfig::new(),
            &OntologyConfig::new(),
            &ConfigOverrides::new(),
        );
        let err = create_provider(&config).err().unwrap();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    #[serial]
    fn test_create_provider_uses_default_model() {
        // SAFETY: serial test
        unsafe {
            std::env::set_var("OPENAI_API_KEY", "sk-test");
            std::env::remove_var(crate::config::AI_MODEL_ENV);
        }
        let config = resolve_layers(
            &OntologyConfig::new(),
            &OntologyConfig::new(),
            &ConfigOverrides::new().with_ai_provider("openai"),
        );
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.model(), "gpt-4-turbo");
        unsafe { std::env::remove_var("OPENAI_API_KEY") };
    }

    #[test]
    #[serial]
    fn test_unsupported_provider() {
        // SAFETY: serial test
        unsafe { std::env::set_var("GEMINI_API_KEY", "key") };
        let config = resolve_layers(
            &OntologyConfig::new(),
            &OntologyConfig::new(),
            &ConfigOverrides::new().with_ai_provider("gemini"),
        );
        assert!(matches!(create_provider(&config), Err(Error::Ai(_))));

        let status = check_provider(ProviderKind::Gemini);
        assert!(status.api_key_set);
        assert!(!status.available);
        unsafe { std::env::remove_var("GEMINI_API_KEY") };
    }
}

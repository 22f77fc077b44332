//! Precedence resolution for configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Environment variables (AI settings only)
//! 3. Session config.kdl (`<ontology root>/config.kdl`)
//! 4. System config.kdl (`~/.config/ontology-toolkit/config.kdl`)
//! 5. Built-in defaults

use crate::Result;
use crate::config::{OntologyConfig, OutputFormat};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Overrides the system config directory (used by tests).
pub const CONFIG_DIR_ENV: &str = "ONTOLOGY_CONFIG_DIR";
pub const AI_PROVIDER_ENV: &str = "ONTOLOGY_AI_PROVIDER";
pub const AI_MODEL_ENV: &str = "ONTOLOGY_AI_MODEL";
pub const AI_TEMPERATURE_ENV: &str = "ONTOLOGY_AI_TEMPERATURE";

pub const DEFAULT_PROJECT_NAME: &str = "Ontology Project";
pub const DEFAULT_LANGUAGE: &str = "ru";
pub const DEFAULT_AI_PROVIDER: &str = "anthropic";
pub const DEFAULT_AI_TEMPERATURE: f64 = 0.3;

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from the ontology's own config.kdl
    Session,
    /// Value from the user-level config.kdl
    System,
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::Session => write!(f, "session"),
            ValueSource::System => write!(f, "system"),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

impl Serialize for ValueSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, Serialize)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub project_name: Resolved<String>,
    pub language: Resolved<String>,
    pub output_format: Resolved<OutputFormat>,
    pub ai_provider: Resolved<String>,
    /// No default here; each provider has its own
    pub ai_model: Option<Resolved<String>>,
    pub ai_temperature: Resolved<f64>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            project_name: Resolved::new(DEFAULT_PROJECT_NAME.to_string(), ValueSource::Default),
            language: Resolved::new(DEFAULT_LANGUAGE.to_string(), ValueSource::Default),
            output_format: Resolved::new(OutputFormat::Json, ValueSource::Default),
            ai_provider: Resolved::new(DEFAULT_AI_PROVIDER.to_string(), ValueSource::Default),
            ai_model: None,
            ai_temperature: Resolved::new(DEFAULT_AI_TEMPERATURE, ValueSource::Default),
        }
    }
}

impl ResolvedConfig {
    pub fn ai_provider(&self) -> &str {
        &self.ai_provider.value
    }

    pub fn ai_model(&self) -> Option<&str> {
        self.ai_model.as_ref().map(|r| r.value.as_str())
    }

    pub fn ai_temperature(&self) -> f64 {
        self.ai_temperature.value
    }

    pub fn language(&self) -> &str {
        &self.language.value
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output_format: Option<OutputFormat>,
    pub ai_provider: Option<String>,
    pub ai_model: Option<String>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn with_ai_provider(mut self, provider: impl Into<String>) -> Self {
        self.ai_provider = Some(provider.into());
        self
    }

    pub fn with_ai_model(mut self, model: impl Into<String>) -> Self {
        self.ai_model = Some(model.into());
        self
    }
}

/// Path of the user-level config file, if a config directory is known.
pub fn system_config_path() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir).join("config.kdl")),
        _ => dirs::config_dir().map(|d| d.join("ontology-toolkit").join("config.kdl")),
    }
}

/// Path of the session config file for an ontology root.
pub fn session_config_path(root: &Path) -> PathBuf {
    root.join("config.kdl")
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Pick the first layer that has a value.
fn pick<T: Clone>(
    cli: Option<&T>,
    env: Option<(T, &str)>,
    session: Option<&T>,
    system: Option<&T>,
) -> Option<Resolved<T>> {
    if let Some(v) = cli {
        return Some(Resolved::new(v.clone(), ValueSource::CliFlag));
    }
    if let Some((v, name)) = env {
        return Some(Resolved::new(v, ValueSource::EnvVar(name.to_string())));
    }
    if let Some(v) = session {
        return Some(Resolved::new(v.clone(), ValueSource::Session));
    }
    system.map(|v| Resolved::new(v.clone(), ValueSource::System))
}

/// Resolve configuration for the ontology at `root`.
pub fn resolve_config(root: &Path, overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let system = match system_config_path() {
        Some(path) => OntologyConfig::read_file(&path)?,
        None => OntologyConfig::new(),
    };
    let session = OntologyConfig::read_file(&session_config_path(root))?;
    Ok(resolve_layers(&session, &system, overrides))
}

/// Resolve already loaded layers. Environment variables are read here.
pub fn resolve_layers(
    session: &OntologyConfig,
    system: &OntologyConfig,
    overrides: &ConfigOverrides,
) -> ResolvedConfig {
    let mut result = ResolvedConfig::default();

    if let Some(v) = pick(
        None,
        None,
        session.project_name.as_ref(),
        system.project_name.as_ref(),
    ) {
        result.project_name = v;
    }
    if let Some(v) = pick(None, None, session.language.as_ref(), system.language.as_ref()) {
        result.language = v;
    }
    if let Some(v) = pick(
        overrides.output_format.as_ref(),
        None,
        session.output_format.as_ref(),
        system.output_format.as_ref(),
    ) {
        result.output_format = v;
    }
    if let Some(v) = pick(
        overrides.ai_provider.as_ref(),
        env_value(AI_PROVIDER_ENV).map(|v| (v.to_lowercase(), AI_PROVIDER_ENV)),
        session.ai_provider.as_ref(),
        system.ai_provider.as_ref(),
    ) {
        result.ai_provider = v;
    }
    result.ai_model = pick(
        overrides.ai_model.as_ref(),
        env_value(AI_MODEL_ENV).map(|v| (v, AI_MODEL_ENV)),
        session.ai_model.as_ref(),
        system.ai_model.as_ref(),
    );

    let env_temperature = env_value(AI_TEMPERATURE_ENV).and_then(|raw| match raw.trim().parse::<f64>() {
        Ok(t) if (0.0..=2.0).contains(&t) => Some((t, AI_TEMPERATURE_ENV)),
        _ => {
            tracing::warn!(value = %raw, "ignoring invalid {}", AI_TEMPERATURE_ENV);
            None
        }
    });
    if let Some(v) = pick(
        None,
        env_temperature,
        session.ai_temperature.as_ref(),
        system.ai_temperature.as_ref(),
    ) {
        result.ai_temperature = v;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn clear_env() {
        // SAFETY: tests touching the environment run serially
        unsafe {
            std::env::remove_var(AI_PROVIDER_ENV);
            std::env::remove_var(AI_MODEL_ENV);
            std::env::remove_var(AI_TEMPERATURE_ENV);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = resolve_layers(
            &OntologyConfig::new(),
            &OntologyConfig::new(),
            &ConfigOverrides::new(),
        );
        assert_eq!(config.ai_provider(), "anthropic");
        assert_eq!(config.ai_provider.source, ValueSource::Default);
        assert_eq!(config.ai_model(), None);
        assert_eq!(config.ai_temperature(), 0.3);
        assert_eq!(config.language(), "ru");
        assert_eq!(config.output_format.value, OutputFormat::Json);
    }

    #[test]
    #[serial]
    fn test_session_overrides_system() {
        clear_env();
        let system = OntologyConfig {
            ai_provider: Some("openai".into()),
            ai_model: Some("gpt-4-turbo".into()),
            language: Some("en".into()),
            ..Default::default()
        };
        let session = OntologyConfig {
            ai_model: Some("gpt-4o".into()),
            ..Default::default()
        };
        let config = resolve_layers(&session, &system, &ConfigOverrides::new());

        assert_eq!(config.ai_provider(), "openai");
        assert_eq!(config.ai_provider.source, ValueSource::System);
        assert_eq!(config.ai_model(), Some("gpt-4o"));
        assert_eq!(config.ai_model.as_ref().unwrap().source, ValueSource::Session);
        assert_eq!(config.language(), "en");
    }

    #[test]
    #[serial]
    fn test_env_beats_files_and_cli_beats_env() {
        clear_env();
        // SAFETY: serial test
        unsafe {
            std::env::set_var(AI_PROVIDER_ENV, "OpenAI");
            std::env::set_var(AI_MODEL_ENV, "env-model");
            std::env::set_var(AI_TEMPERATURE_ENV, "0.9");
        }
        let session = OntologyConfig {
            ai_provider: Some("anthropic".into()),
            ai_temperature: Some(0.1),
            ..Default::default()
        };

        let config = resolve_layers(&session, &OntologyConfig::new(), &ConfigOverrides::new());
        assert_eq!(config.ai_provider(), "openai");
        assert_eq!(
            config.ai_provider.source,
            ValueSource::EnvVar(AI_PROVIDER_ENV.to_string())
        );
        assert_eq!(config.ai_temperature(), 0.9);

        let overrides = ConfigOverrides::new()
            .with_ai_provider("anthropic")
            .with_ai_model("cli-model");
        let config = resolve_layers(&session, &OntologyConfig::new(), &overrides);
        assert_eq!(config.ai_provider(), "anthropic");
        assert_eq!(config.ai_provider.source, ValueSource::CliFlag);
        assert_eq!(config.ai_model(), Some("cli-model"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_env_temperature_is_ignored() {
        clear_env();
        // SAFETY: serial test
        unsafe { std::env::set_var(AI_TEMPERATURE_ENV, "very hot") };
        let session = OntologyConfig {
            ai_temperature: Some(0.5),
            ..Default::default()
        };
        let config = resolve_layers(&session, &OntologyConfig::new(), &ConfigOverrides::new());
        assert_eq!(config.ai_temperature(), 0.5);
        assert_eq!(config.ai_temperature.source, ValueSource::Session);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_resolve_config_reads_files() {
        clear_env();
        let system_dir = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        // SAFETY: serial test
        unsafe { std::env::set_var(CONFIG_DIR_ENV, system_dir.path()) };

        OntologyConfig {
            project_name: Some("System".into()),
            ai_provider: Some("openai".into()),
            ..Default::default()
        }
        .write_file(&system_dir.path().join("config.kdl"))
        .unwrap();
        OntologyConfig::for_project("Session")
            .write_file(&session_config_path(root.path()))
            .unwrap();

        let config = resolve_config(root.path(), &ConfigOverrides::new()).unwrap();
        assert_eq!(config.project_name.value, "Session");
        assert_eq!(config.project_name.source, ValueSource::Session);
        assert_eq!(config.ai_provider(), "openai");
        assert_eq!(config.ai_provider.source, ValueSource::System);

        unsafe { std::env::remove_var(CONFIG_DIR_ENV) };
    }

    #[test]
    fn test_value_source_display() {
        assert_eq!(ValueSource::EnvVar("X".into()).to_string(), "env:X");
        assert_eq!(ValueSource::CliFlag.to_string(), "cli");
    }
}

//! AI commands: config-ai, fill, extract.

use super::{Output, json, require, truncate};
use crate::ai::{
    self, AiProvider, ConceptExtractor, ConceptFiller, FillOutcome, ProviderKind, ProviderStatus,
};
use crate::config::{ConfigOverrides, Resolved, ValueSource, resolve_config};
use crate::models::Entity;
use crate::ontology::Ontology;
use crate::storage::Storage;
use crate::{Error, Result};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

// === config-ai ===

#[derive(Serialize)]
pub struct ConfigAiResult {
    pub provider: Resolved<String>,
    pub model: Resolved<String>,
    pub temperature: Resolved<f64>,
    pub language: Resolved<String>,
    pub status: ProviderStatus,
}

impl Output for ConfigAiResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mark = if self.status.available { "ok" } else { "unavailable" };
        let mut out = format!(
            "AI configuration\n  Provider:    {} ({})\n  Model:       {} ({})\n  Temperature: {} ({})\n  Language:    {} ({})\n  Status:      {}: {}",
            self.provider.value,
            self.provider.source,
            self.model.value,
            self.model.source,
            self.temperature.value,
            self.temperature.source,
            self.language.value,
            self.language.source,
            mark,
            self.status.message
        );
        if self.status.supported && !self.status.api_key_set {
            let _ = write!(out, "\n\nSet the key with: export {}=your-key", self.status.api_key_env);
        }
        out
    }
}

/// Show the effective AI settings. With `check`, an unusable provider is an
/// error.
pub fn config_ai(root: &Path, check: bool, overrides: &ConfigOverrides) -> Result<ConfigAiResult> {
    let config = resolve_config(root, overrides)?;
    let kind: ProviderKind = config.ai_provider().parse().map_err(Error::Ai)?;
    let status = ai::check_provider(kind);
    if check && !status.available {
        return Err(Error::Ai(format!("{}: {}", kind, status.message)));
    }
    let model = config
        .ai_model
        .clone()
        .unwrap_or_else(|| Resolved::new(kind.default_model().to_string(), ValueSource::Default));
    Ok(ConfigAiResult {
        provider: config.ai_provider,
        model,
        temperature: config.ai_temperature,
        language: config.language,
        status,
    })
}

#[derive(Serialize)]
pub struct ProviderListResult {
    pub providers: Vec<ProviderStatus>,
}

impl Output for ProviderListResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!("{:<10} {:<26} {:<18} Status", "Provider", "Default model", "Env var");
        for p in &self.providers {
            let _ = write!(
                out,
                "\n{:<10} {:<26} {:<18} {}",
                p.provider.as_str(),
                p.default_model,
                p.api_key_env,
                p.message
            );
        }
        out
    }
}

pub fn config_ai_providers() -> ProviderListResult {
    ProviderListResult {
        providers: ProviderKind::all().iter().map(|k| ai::check_provider(*k)).collect(),
    }
}

// === fill ===

#[derive(Serialize)]
pub struct FillResult {
    #[serde(flatten)]
    pub outcome: FillOutcome,
    pub entity: Entity,
    pub path: PathBuf,
}

impl Output for FillResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let e = &self.entity;
        let mut out = format!(
            "Filled {} via {} ({})",
            e.id, self.outcome.provider, self.outcome.model
        );
        let _ = write!(out, "\n  Name: {}", e.name);
        let _ = write!(out, "\n  Definition: {}", truncate(&e.definition, 100));
        let _ = write!(out, "\n  Purpose: {}", truncate(&e.purpose, 100));
        let _ = write!(
            out,
            "\n  Type: {}",
            e.meta_meta().map(|m| m.as_str()).unwrap_or("-")
        );
        let _ = write!(out, "\n  Examples: {}", e.examples.len());
        if !self.outcome.added_relations.is_empty() {
            let ids: Vec<String> = self
                .outcome
                .added_relations
                .iter()
                .map(|i| i.to_string())
                .collect();
            let _ = write!(out, "\n  New relations: {}", ids.join(", "));
        }
        if let Some(status) = e.status() {
            let _ = write!(out, "\n  Status: {}", status);
        }
        out
    }
}

/// Fill a concept through the configured provider and save it.
pub fn fill(
    root: &Path,
    id: &str,
    fields: Option<Vec<String>>,
    context: Option<&str>,
    overrides: &ConfigOverrides,
) -> Result<FillResult> {
    Storage::open(root)?;
    let config = resolve_config(root, overrides)?;
    let provider = ai::create_provider(&config)?;
    fill_with(root, provider.as_ref(), config.language(), id, fields, context)
}

pub(crate) fn fill_with(
    root: &Path,
    provider: &dyn AiProvider,
    language: &str,
    id: &str,
    fields: Option<Vec<String>>,
    context: Option<&str>,
) -> Result<FillResult> {
    let mut ontology = Ontology::open(root)?;
    let id = require(&ontology, id)?.id;
    let outcome = ConceptFiller::new(provider, language).fill(
        &mut ontology,
        &id,
        fields.as_deref(),
        context.unwrap_or(""),
    )?;
    let path = ontology.save(&id)?;
    Ok(FillResult {
        outcome,
        entity: ontology.get(&id)?.clone(),
        path,
    })
}

// === extract ===

#[derive(Serialize)]
pub struct ExtractResult {
    /// File the text came from, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<PathBuf>,
    pub count: usize,
    pub concepts: Vec<Entity>,
    pub added: bool,
    pub paths: Vec<PathBuf>,
}

impl Output for ExtractResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.concepts.is_empty() {
            return "No concepts found.".to_string();
        }
        let mut out = format!("Extracted {} concepts:", self.count);
        for c in &self.concepts {
            let _ = write!(
                out,
                "\n  {:<6} {:<30} {:<50} {}",
                c.id.to_string(),
                c.name,
                truncate(&c.definition, 50),
                c.meta_meta().map(|m| m.as_str()).unwrap_or("-")
            );
        }
        if self.added {
            let _ = write!(out, "\nAdded {} concepts to the ontology.", self.count);
        } else {
            out.push_str("\nPreview only; nothing was added.");
        }
        out
    }
}

/// Extract concepts from a file, or from `source` itself when it is not a
/// file. Unless `preview`, the concepts are added and saved.
pub fn extract(
    root: &Path,
    source: &str,
    preview: bool,
    overrides: &ConfigOverrides,
) -> Result<ExtractResult> {
    Storage::open(root)?;
    let config = resolve_config(root, overrides)?;
    let provider = ai::create_provider(&config)?;
    extract_with(root, provider.as_ref(), config.language(), source, preview)
}

pub(crate) fn extract_with(
    root: &Path,
    provider: &dyn AiProvider,
    language: &str,
    source: &str,
    preview: bool,
) -> Result<ExtractResult> {
    let mut ontology = Ontology::open(root)?;
    let source_path = Path::new(source);
    let (source_file, text) = if source_path.is_file() {
        (Some(source_path.to_path_buf()), fs::read_to_string(source_path)?)
    } else {
        (None, source.to_string())
    };

    let concepts = ConceptExtractor::new(provider, language).extract(&ontology, &text)?;
    let mut paths = Vec::new();
    if !preview {
        for concept in &concepts {
            ontology.add_entity(concept.clone())?;
            paths.push(ontology.save_new(&concept.id)?);
        }
    }
    Ok(ExtractResult {
        source_file,
        count: concepts.len(),
        added: !preview && !concepts.is_empty(),
        concepts,
        paths,
    })
}

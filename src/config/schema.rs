//! KDL schema for `config.kdl`.
//!
//! ```kdl
//! project-name "My Ontology"
//! project-description ""
//! version "0.1.0"
//! language "ru"
//! output-format "json"  // or "human"
//! ai-provider "anthropic"
//! ai-model "claude-sonnet-4-20250514"
//! ai-temperature 0.3
//! ```

use crate::{Error, Result};
use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Settings stored in `config.kdl`. Every field is optional so that session
/// and system files can be layered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OntologyConfig {
    pub project_name: Option<String>,
    pub project_description: Option<String>,
    pub version: Option<String>,
    /// Language of entity content, passed to AI prompts
    pub language: Option<String>,
    pub output_format: Option<OutputFormat>,
    pub ai_provider: Option<String>,
    pub ai_model: Option<String>,
    pub ai_temperature: Option<f64>,
}

impl OntologyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Config written by `ontology init`.
    pub fn for_project(name: &str) -> Self {
        Self {
            project_name: Some(name.to_string()),
            project_description: Some(String::new()),
            version: Some("0.1.0".to_string()),
            language: Some("ru".to_string()),
            output_format: Some(OutputFormat::Json),
            ai_provider: None,
            ai_model: None,
            ai_temperature: None,
        }
    }

    /// Validate the config values.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(t) = self.ai_temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(format!("ai-temperature must be between 0 and 2, got {}", t));
            }
        }
        Ok(())
    }

    /// Parse config from a KDL document. Unknown nodes and values of the
    /// wrong type are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        Self {
            project_name: string_arg(doc, "project-name"),
            project_description: string_arg(doc, "project-description"),
            version: string_arg(doc, "version"),
            language: string_arg(doc, "language"),
            output_format: string_arg(doc, "output-format").and_then(|s| OutputFormat::parse(&s)),
            ai_provider: string_arg(doc, "ai-provider"),
            ai_model: string_arg(doc, "ai-model"),
            ai_temperature: doc.get_arg("ai-temperature").and_then(|v| match v {
                KdlValue::Float(f) => Some(*f),
                KdlValue::Integer(i) => Some(*i as f64),
                _ => None,
            }),
        }
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();
        let strings = [
            ("project-name", self.project_name.clone()),
            ("project-description", self.project_description.clone()),
            ("version", self.version.clone()),
            ("language", self.language.clone()),
            ("output-format", self.output_format.map(|f| f.as_str().to_string())),
            ("ai-provider", self.ai_provider.clone()),
            ("ai-model", self.ai_model.clone()),
        ];
        for (name, value) in strings {
            if let Some(value) = value {
                let mut node = KdlNode::new(name);
                node.push(KdlEntry::new(KdlValue::String(value)));
                doc.nodes_mut().push(node);
            }
        }
        if let Some(t) = self.ai_temperature {
            let mut node = KdlNode::new("ai-temperature");
            node.push(KdlEntry::new(KdlValue::Float(t)));
            doc.nodes_mut().push(node);
        }
        doc.autoformat();
        doc
    }

    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &OntologyConfig) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field.clone();
                })*
            };
        }
        take!(
            project_name,
            project_description,
            version,
            language,
            output_format,
            ai_provider,
            ai_model,
            ai_temperature
        );
    }

    /// Read a config file; a missing file is an empty config.
    pub fn read_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = fs::read_to_string(path)?;
        let doc: KdlDocument = content.parse().map_err(|e| {
            Error::Config(format!("Failed to parse KDL in {}: {}", path.display(), e))
        })?;
        let config = Self::from_kdl(&doc);
        config
            .validate()
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Write the config to `path`, creating parent directories.
    pub fn write_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_kdl().to_string())?;
        Ok(())
    }
}

fn string_arg(doc: &KdlDocument, name: &str) -> Option<String> {
    doc.get_arg(name)
        .and_then(|v| v.as_string())
        .map(str::to_string)
}

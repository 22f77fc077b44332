//! Ontology Toolkit - a small knowledge-graph manager backed by Markdown files.
//!
//! This library provides the core functionality for the `ontology` CLI tool,
//! including the entity model, the Markdown codec, the in-memory index and
//! relation graph, exporters, and the AI fill/extract boundary.

pub mod ai;
pub mod cli;
pub mod commands;
pub mod config;
pub mod export;
pub mod index;
pub mod models;
pub mod ontology;
pub mod storage;

use std::path::PathBuf;


/// Library-level error type for ontology operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Ontology not found at {0}: run `ontology init` first")]
    NotInitialized(PathBuf),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("File already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Duplicate ID in index: {0}")]
    DuplicateId(String),

    #[error("Cannot decode entity document: {0}")]
    Decode(String),

    #[error("AI provider error: {0}")]
    Ai(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for ontology operations.
pub type Result<T> = std::result::Result<T, Error>;

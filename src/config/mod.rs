//! Configuration for the ontology toolkit.
//!
//! Settings live in KDL files:
//!
//! - Session: `<ontology root>/config.kdl`, written by `ontology init`
//! - System: `~/.config/ontology-toolkit/config.kdl`
//!
//! See [`schema`] for the keys and [`resolver`] for precedence.

pub mod resolver;
pub mod schema;

pub use resolver::{
    AI_MODEL_ENV, AI_PROVIDER_ENV, AI_TEMPERATURE_ENV, CONFIG_DIR_ENV, ConfigOverrides, Resolved,
    ResolvedConfig, ValueSource, resolve_config, resolve_layers, session_config_path,
    system_config_path,
};
pub use schema::{OntologyConfig, OutputFormat};

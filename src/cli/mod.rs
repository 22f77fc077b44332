//! CLI argument definitions for the ontology toolkit.

use crate::export::ExportFormat;
use crate::models::{ConceptStatus, EntityKind, RelationType};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Ontology Toolkit - manage a project ontology stored as Markdown files.
///
/// Start with `ontology init`, add entities with `ontology add`, and check
/// the graph with `ontology audit`.
#[derive(Parser, Debug)]
#[command(name = "ontology")]
#[command(author, version, about = "Manage a project ontology of concepts, methods, systems, problems and artifacts", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Ontology root directory
    #[arg(long = "path", global = true, env = "ONTOLOGY_PATH", default_value = crate::storage::DEFAULT_ROOT)]
    pub path: PathBuf,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the ontology directory layout and config.kdl
    Init {
        /// Project name written to README.md and config.kdl
        #[arg(short = 'p', long)]
        project: Option<String>,
    },

    /// Add a new draft entity
    Add {
        /// Entity name
        name: String,

        /// Entity type (concept, method, system, problem, artifact)
        #[arg(short = 't', long = "type", default_value = "concept")]
        kind: EntityKind,
    },

    /// Show one entity by ID
    Show {
        /// Entity ID (e.g., C_1)
        id: String,
    },

    /// List entities
    List {
        /// Filter by concept status (draft, draft+filled, approved)
        #[arg(short = 's', long)]
        status: Option<ConceptStatus>,

        /// Filter by ID prefix (C, M, S, P, A) or type name
        #[arg(short = 'p', long)]
        prefix: Option<EntityKind>,
    },

    /// Add a typed relation between two entities
    Relate {
        /// Source entity ID
        source: String,

        /// Target entity ID
        target: String,

        /// Relation type (requires, enables, relates_to, part_of,
        /// instance_of, opposite_of, similar_to)
        #[arg(short = 't', long = "type")]
        relation_type: RelationType,

        /// Optional description of the relation
        #[arg(short = 'd', long)]
        description: Option<String>,
    },

    /// Remove relations between two entities
    Unrelate {
        /// Source entity ID
        source: String,

        /// Target entity ID
        target: String,

        /// Only remove relations of this type
        #[arg(short = 't', long = "type")]
        relation_type: Option<RelationType>,
    },

    /// Approve a concept
    Approve {
        /// Concept ID
        id: String,
    },

    /// Delete an entity and its file
    Remove {
        /// Entity ID
        id: String,
    },

    /// Statistics, broken links and isolated nodes (exit code 2 on broken links)
    Audit,

    /// Remove relations whose target does not exist
    FixRelations {
        /// Remove the broken relations (default is a dry run)
        #[arg(long)]
        apply: bool,
    },

    /// Entities near an entity in the relation graph
    Related {
        /// Entity ID
        id: String,

        /// Number of hops to follow
        #[arg(short = 'd', long, default_value_t = 1)]
        depth: usize,
    },

    /// Export to CSV or XLSX
    Export {
        /// Export format (csv, xlsx)
        #[arg(short = 'f', long, default_value = "csv")]
        format: ExportFormat,

        /// Output file (default: ontology_export.<format>)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Filter by ID prefix (CSV only)
        #[arg(short = 'p', long)]
        prefix: Option<EntityKind>,

        /// Filter by concept status (CSV only)
        #[arg(short = 's', long)]
        status: Option<ConceptStatus>,
    },

    /// Write the relation graph as a Mermaid file
    Graph {
        /// Output file
        #[arg(short = 'o', long, default_value = crate::commands::export::DEFAULT_GRAPH_OUTPUT)]
        output: PathBuf,
    },

    /// Show AI configuration and provider availability
    ConfigAi {
        /// Fail unless the configured provider is usable
        #[arg(long)]
        check: bool,

        /// List supported providers
        #[arg(long)]
        list_providers: bool,

        /// Provider to inspect instead of the configured one
        #[arg(long)]
        provider: Option<String>,

        /// Model to report instead of the configured one
        #[arg(long)]
        model: Option<String>,
    },

    /// Fill a concept's fields through an AI provider
    Fill {
        /// Concept ID (e.g., C_1)
        id: String,

        /// Fields to fill, comma separated (definition, purpose, meta_meta,
        /// examples, relations)
        #[arg(long, value_delimiter = ',')]
        fields: Option<Vec<String>>,

        /// AI provider (anthropic, openai)
        #[arg(long)]
        provider: Option<String>,

        /// AI model
        #[arg(long)]
        model: Option<String>,

        /// Additional context for the model
        #[arg(long)]
        context: Option<String>,
    },

    /// Extract new concepts from a file or a text through an AI provider
    Extract {
        /// Path to a text file, or the text itself
        source: String,

        /// AI provider (anthropic, openai)
        #[arg(long)]
        provider: Option<String>,

        /// AI model
        #[arg(long)]
        model: Option<String>,

        /// Only show the extracted concepts, do not add them
        #[arg(long)]
        preview: bool,
    },
}

impl Commands {
    /// Command name as typed on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Init { .. } => "init",
            Commands::Add { .. } => "add",
            Commands::Show { .. } => "show",
            Commands::List { .. } => "list",
            Commands::Relate { .. } => "relate",
            Commands::Unrelate { .. } => "unrelate",
            Commands::Approve { .. } => "approve",
            Commands::Remove { .. } => "remove",
            Commands::Audit => "audit",
            Commands::FixRelations { .. } => "fix-relations",
            Commands::Related { .. } => "related",
            Commands::Export { .. } => "export",
            Commands::Graph { .. } => "graph",
            Commands::ConfigAi { .. } => "config-ai",
            Commands::Fill { .. } => "fill",
            Commands::Extract { .. } => "extract",
        }
    }
}

//! Ontology Toolkit CLI - manage a project ontology stored as Markdown files.

use clap::Parser;
use ontology_toolkit::cli::{Cli, Commands};
use ontology_toolkit::commands::{self, Output};
use ontology_toolkit::config::{self, ConfigOverrides, OutputFormat};
use ontology_toolkit::export::ExportFilter;
use std::path::Path;
use std::process;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable overriding the log filter.
const LOG_ENV: &str = "ONTOLOGY_LOG";

/// Exit code when `audit` finds broken links.
const EXIT_CRITICAL: i32 = 2;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let human = cli.human_readable || prefers_human(&cli.path);
    let name = cli.command.name();
    tracing::debug!(command = name, root = %cli.path.display(), "running command");

    match run_command(cli.command, &cli.path, human) {
        Ok(code) => {
            if code != 0 {
                process::exit(code);
            }
        }
        Err(e) => {
            tracing::debug!(command = name, error = %e, "command failed");
            if human {
                eprintln!("Error: {}", e);
            } else {
                eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
            }
            process::exit(1);
        }
    }
}

/// Logs go to stderr so that JSON on stdout stays parseable.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        EnvFilter::new(format!("ontology_toolkit={},ontology={}", default_level, default_level))
    });
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

/// Whether the config asks for human output by default.
fn prefers_human(root: &Path) -> bool {
    match config::resolve_config(root, &ConfigOverrides::new()) {
        Ok(resolved) => resolved.output_format.value == OutputFormat::Human,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable config");
            false
        }
    }
}

/// Run one command and return the process exit code.
fn run_command(command: Commands, root: &Path, human: bool) -> Result<i32, ontology_toolkit::Error> {
    match command {
        Commands::Init { project } => {
            let result = commands::init(root, project.as_deref())?;
            output(&result, human);
        }

        Commands::Add { name, kind } => {
            let result = commands::add(root, &name, kind)?;
            output(&result, human);
        }

        Commands::Show { id } => {
            let result = commands::show(root, &id)?;
            output(&result, human);
        }

        Commands::List { status, prefix } => {
            let result = commands::list(root, status, prefix)?;
            output(&result, human);
        }

        Commands::Relate {
            source,
            target,
            relation_type,
            description,
        } => {
            let result = commands::relate(root, &source, &target, relation_type, description)?;
            output(&result, human);
        }

        Commands::Unrelate {
            source,
            target,
            relation_type,
        } => {
            let result = commands::unrelate(root, &source, &target, relation_type)?;
            output(&result, human);
        }

        Commands::Approve { id } => {
            let result = commands::approve(root, &id)?;
            output(&result, human);
        }

        Commands::Remove { id } => {
            let result = commands::remove(root, &id)?;
            output(&result, human);
        }

        Commands::Audit => {
            let result = commands::audit(root)?;
            output(&result, human);
            if result.has_broken_links() {
                return Ok(EXIT_CRITICAL);
            }
        }

        Commands::FixRelations { apply } => {
            let result = commands::fix_relations(root, apply)?;
            output(&result, human);
        }

        Commands::Related { id, depth } => {
            let result = commands::related(root, &id, depth)?;
            output(&result, human);
        }

        Commands::Export {
            format,
            output: path,
            prefix,
            status,
        } => {
            let filter = ExportFilter {
                kind: prefix,
                status,
            };
            let result = commands::export(root, format, path, filter)?;
            output(&result, human);
        }

        Commands::Graph { output: path } => {
            let result = commands::graph(root, Some(path))?;
            output(&result, human);
        }

        Commands::ConfigAi {
            check,
            list_providers,
            provider,
            model,
        } => {
            if list_providers {
                output(&commands::config_ai_providers(), human);
            } else {
                let overrides = ai_overrides(provider, model);
                let result = commands::config_ai(root, check, &overrides)?;
                output(&result, human);
            }
        }

        Commands::Fill {
            id,
            fields,
            provider,
            model,
            context,
        } => {
            let fields = fields.map(|f| {
                f.into_iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            });
            let overrides = ai_overrides(provider, model);
            let result = commands::fill(root, &id, fields, context.as_deref(), &overrides)?;
            output(&result, human);
        }

        Commands::Extract {
            source,
            provider,
            model,
            preview,
        } => {
            let overrides = ai_overrides(provider, model);
            let result = commands::extract(root, &source, preview, &overrides)?;
            output(&result, human);
        }
    }
    Ok(0)
}

fn ai_overrides(provider: Option<String>, model: Option<String>) -> ConfigOverrides {
    let mut overrides = ConfigOverrides::new();
    if let Some(provider) = provider {
        overrides = overrides.with_ai_provider(provider.to_lowercase());
    }
    if let Some(model) = model {
        overrides = overrides.with_ai_model(model);
    }
    overrides
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

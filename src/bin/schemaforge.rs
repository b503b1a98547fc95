//! Schemaforge CLI
//!
//! Composes schema fragments and exports the result to the supported
//! target formats. Every subcommand shares the same composition flags;
//! the naming config is validated before any schema file is read.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use schemaforge::compose::{compose, parse_selection_document, ComposeOptions, NamingConfig};
use schemaforge::export::jsonschema::JsonSchemaExporter;
use schemaforge::export::proto::ProtoExporter;
use schemaforge::export::sdl::{print_schema, SdlExporter};
use schemaforge::export::shacl::{RdfFormat, ShaclExporter};
use schemaforge::export::skos::SkosExporter;
use schemaforge::export::vspec::VspecExporter;
use schemaforge::export::Exporter;
use schemaforge::parser::load_fragments;
use schemaforge::registry::{
    build_concept_uris, generate_ids, init_history, load_history, save_history,
    update_history, HistoryArchiver,
};
use schemaforge::search::{search_schema, SearchOptions};
use schemaforge::Composed;

#[derive(Parser)]
#[command(name = "schemaforge")]
#[command(about = "Compose schema fragments and export them to target formats")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Composition flags shared by every subcommand
#[derive(Args)]
struct ComposeArgs {
    /// Schema fragment files or directories
    #[arg(required = true)]
    schemas: Vec<PathBuf>,

    /// Selection query document to filter the schema
    #[arg(short, long)]
    query: Option<PathBuf>,

    /// Naming convention config (YAML)
    #[arg(short, long)]
    naming: Option<PathBuf>,

    /// Keep only the types reachable from this root type
    #[arg(short, long)]
    root: Option<String>,

    /// Expand instance-tagged list fields into nested trees
    #[arg(short, long)]
    expand: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose fragments and print the merged schema as SDL
    Compose {
        #[command(flatten)]
        compose: ComposeArgs,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export the composed schema to a target format
    Export {
        #[command(subcommand)]
        target: ExportTarget,
    },

    /// Parse and compose without writing anything
    Check {
        #[command(flatten)]
        compose: ComposeArgs,
    },

    /// Search types and fields in the composed schema
    Search {
        #[command(flatten)]
        compose: ComposeArgs,

        /// Type name pattern
        #[arg(short, long)]
        type_name: Option<String>,

        /// Field name pattern
        #[arg(short, long)]
        field: Option<String>,

        /// Case-insensitive matching
        #[arg(short, long)]
        ignore_case: bool,

        /// Whole-name match instead of substring match
        #[arg(long)]
        exact: bool,

        /// Fuzzy matching
        #[arg(long)]
        fuzzy: bool,
    },

    /// Build the concept URI document (JSON-LD)
    Concepts {
        #[command(flatten)]
        compose: ComposeArgs,

        /// Concept namespace IRI
        #[arg(long, default_value = "http://example.org/concepts#")]
        namespace: String,

        /// Namespace prefix
        #[arg(long, default_value = "ns")]
        prefix: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate deterministic field identifiers
    Ids {
        #[command(flatten)]
        compose: ComposeArgs,

        /// Case-sensitive hashing
        #[arg(long)]
        strict: bool,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Maintain the versioned concept history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand)]
enum ExportTarget {
    /// Protocol Buffers (proto3) schema
    Proto {
        #[command(flatten)]
        compose: ComposeArgs,

        /// proto package declaration
        #[arg(short, long)]
        package: Option<String>,

        /// Inline these root types into one flattened message
        #[arg(long)]
        flatten: Vec<String>,

        /// Name of the flattened message
        #[arg(long)]
        message_name: Option<String>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// JSON Schema (draft 2020-12)
    Jsonschema {
        #[command(flatten)]
        compose: ComposeArgs,

        /// Restrict $defs to the closure of this root type
        #[arg(long)]
        schema_root: Option<String>,

        /// Explicit null unions for nullable fields
        #[arg(long)]
        strict: bool,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// SHACL shapes
    Shacl {
        #[command(flatten)]
        compose: ComposeArgs,

        /// Serialize as N-Triples instead of Turtle
        #[arg(long)]
        ntriples: bool,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// SKOS concept vocabulary
    Skos {
        #[command(flatten)]
        compose: ComposeArgs,

        /// Concept namespace IRI
        #[arg(long, default_value = "http://example.org/concepts#")]
        namespace: String,

        /// Namespace prefix
        #[arg(long, default_value = "ns")]
        prefix: String,

        /// Language tag for preferred labels
        #[arg(long, default_value = "en")]
        language: String,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Flat signal schema (YAML)
    Vspec {
        #[command(flatten)]
        compose: ComposeArgs,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// Create a history document from the current schema
    Init {
        #[command(flatten)]
        compose: ComposeArgs,

        /// Concept namespace IRI
        #[arg(long, default_value = "http://example.org/concepts#")]
        namespace: String,

        /// Namespace prefix
        #[arg(long, default_value = "ns")]
        prefix: String,

        /// History document to write
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Update an existing history document and archive changed types
    Update {
        #[command(flatten)]
        compose: ComposeArgs,

        /// Concept namespace IRI
        #[arg(long, default_value = "http://example.org/concepts#")]
        namespace: String,

        /// Namespace prefix
        #[arg(long, default_value = "ns")]
        prefix: String,

        /// History document to update in place
        #[arg(long)]
        history: PathBuf,

        /// Directory for archived type definitions
        #[arg(long, default_value = "spec_history")]
        archive_dir: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Compose { compose, output } => {
            let composed = compose_from(&compose)?;
            let rendered = SdlExporter.export(&composed)?;
            write_output(output.as_deref(), &rendered)
        }
        Commands::Export { target } => export(target),
        Commands::Check { compose } => {
            let composed = compose_from(&compose)?;
            println!("OK: {} types composed", composed.model.len());
            Ok(())
        }
        Commands::Search {
            compose,
            type_name,
            field,
            ignore_case,
            exact,
            fuzzy,
        } => {
            let composed = compose_from(&compose)?;
            let options = SearchOptions {
                case_insensitive: ignore_case,
                exact,
                fuzzy,
            };
            let results = search_schema(
                &composed.model,
                type_name.as_deref(),
                field.as_deref(),
                options,
            );
            if results.is_empty() {
                println!("No matches");
            }
            for (type_name, fields) in results {
                println!("{}", type_name);
                for field in fields {
                    println!("  .{}", field);
                }
            }
            Ok(())
        }
        Commands::Concepts {
            compose,
            namespace,
            prefix,
            output,
        } => {
            let composed = compose_from(&compose)?;
            let document = build_concept_uris(&composed.model, &namespace, &prefix);
            let mut rendered = serde_json::to_string_pretty(&document)?;
            rendered.push('\n');
            write_output(output.as_deref(), &rendered)
        }
        Commands::Ids {
            compose,
            strict,
            output,
        } => {
            let composed = compose_from(&compose)?;
            let ids = generate_ids(&composed.model, strict)?;
            let mut rendered = serde_json::to_string_pretty(&ids)?;
            rendered.push('\n');
            write_output(output.as_deref(), &rendered)
        }
        Commands::History { action } => history(action),
    }
}

fn export(target: ExportTarget) -> anyhow::Result<()> {
    let (composed, exporter, output): (Composed, Box<dyn Exporter>, Option<PathBuf>) =
        match target {
            ExportTarget::Proto {
                compose,
                package,
                flatten,
                message_name,
                output,
            } => (
                compose_from(&compose)?,
                Box::new(ProtoExporter {
                    package,
                    flatten_roots: flatten,
                    message_name,
                }),
                output,
            ),
            ExportTarget::Jsonschema {
                compose,
                schema_root,
                strict,
                output,
            } => (
                compose_from(&compose)?,
                Box::new(JsonSchemaExporter {
                    root_type: schema_root,
                    strict,
                }),
                output,
            ),
            ExportTarget::Shacl {
                compose,
                ntriples,
                output,
            } => (
                compose_from(&compose)?,
                Box::new(ShaclExporter {
                    format: if ntriples {
                        RdfFormat::NTriples
                    } else {
                        RdfFormat::Turtle
                    },
                    ..Default::default()
                }),
                output,
            ),
            ExportTarget::Skos {
                compose,
                namespace,
                prefix,
                language,
                output,
            } => (
                compose_from(&compose)?,
                Box::new(SkosExporter {
                    namespace,
                    prefix,
                    language,
                    validate: true,
                }),
                output,
            ),
            ExportTarget::Vspec { compose, output } => {
                (compose_from(&compose)?, Box::new(VspecExporter), output)
            }
        };

    let rendered = exporter.export(&composed)?;
    write_output(output.as_deref(), &rendered)
}

fn history(action: HistoryAction) -> anyhow::Result<()> {
    match action {
        HistoryAction::Init {
            compose,
            namespace,
            prefix,
            output,
        } => {
            let composed = compose_from(&compose)?;
            let concepts = build_concept_uris(&composed.model, &namespace, &prefix);
            let ids = generate_ids(&composed.model, false)?;
            let document = init_history(&concepts, &ids);
            save_history(&document, &output)?;
            println!("Wrote history for {} concepts to {}", document.graph.len(), output.display());
            Ok(())
        }
        HistoryAction::Update {
            compose,
            namespace,
            prefix,
            history,
            archive_dir,
        } => {
            let composed = compose_from(&compose)?;
            let concepts = build_concept_uris(&composed.model, &namespace, &prefix);
            let ids = generate_ids(&composed.model, false)?;

            let mut document = load_history(&history)
                .with_context(|| format!("loading history {}", history.display()))?;
            let (new_concepts, updated) = update_history(&mut document, &concepts, &ids);

            let mut changed = updated;
            changed.extend(new_concepts);
            if !changed.is_empty() {
                let sdl = print_schema(&composed.model);
                let archiver = HistoryArchiver::new(&archive_dir);
                let written = archiver.archive(&changed, &ids, &sdl)?;
                println!("Archived {} changed definitions", written.len());
            }

            save_history(&document, &history)?;
            println!("Updated {}", history.display());
            Ok(())
        }
    }
}

/// Run the composition pipeline for the shared flags. The naming config
/// is read and validated first, before any schema file is touched.
fn compose_from(args: &ComposeArgs) -> anyhow::Result<Composed> {
    let naming = match &args.naming {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("reading naming config {}", path.display()))?;
            Some(NamingConfig::from_yaml(&source)?)
        }
        None => None,
    };

    let selection = match &args.query {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("reading selection document {}", path.display()))?;
            Some(parse_selection_document(&path.display().to_string(), &source)?)
        }
        None => None,
    };

    let fragments = load_fragments(&args.schemas)?;
    let options = ComposeOptions {
        naming,
        selection,
        root_type: args.root.clone(),
        expand_instances: args.expand,
    };
    Ok(compose(&fragments, &options)?)
}

fn write_output(path: Option<&std::path::Path>, content: &str) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}

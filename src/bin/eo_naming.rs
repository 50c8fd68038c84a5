//! EO Naming CLI
//!
//! Parses, assembles and inspects Earth-observation product filenames.
//! Results are printed as JSON.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use eo_naming::{Fields, NamingConfig, NamingEngine, SchemaRef};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "eo-naming")]
#[command(about = "Parse and assemble Earth-observation product filenames")]
struct Cli {
    /// Schema directory (defaults to the bundled schemas)
    #[arg(short, long, global = true)]
    schemas: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a filename into fields
    Parse {
        filename: String,

        /// Parse with this family only
        #[arg(short, long)]
        family: Option<String>,

        /// Family version (requires --family)
        #[arg(short, long, requires = "family")]
        version: Option<String>,

        /// Parse with the schema document at this path
        #[arg(long, conflicts_with = "family")]
        schema: Option<PathBuf>,
    },

    /// Assemble a filename from key=value fields
    Assemble {
        /// Fields as key=value
        #[arg(required = true)]
        fields: Vec<String>,

        /// Assemble with this family instead of auto-selecting
        #[arg(short, long)]
        family: Option<String>,

        /// Family version (requires --family)
        #[arg(short, long, requires = "family")]
        version: Option<String>,

        /// Assemble with the schema document at this path
        #[arg(long, conflicts_with = "family")]
        schema: Option<PathBuf>,
    },

    /// List known families
    List,

    /// List the versions of a family
    Versions { family: String },

    /// Describe a family's schema
    Describe {
        family: String,

        #[arg(short, long)]
        version: Option<String>,
    },

    /// Fuzzy-search family names
    Search {
        query: String,

        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Round-trip every schema example
    Validate,
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
    let mut config = NamingConfig::load_from(cli.config.as_deref().and_then(|p| p.to_str()))
        .context("loading configuration")?;
    if let Some(root) = cli.schemas {
        config.registry.schema_root = Some(root);
    }
    let engine = NamingEngine::from_config(&config);

    match cli.command {
        Commands::Parse {
            filename,
            family,
            version,
            schema,
        } => {
            let result = match schema_ref(family, version, schema) {
                Some(schema) => engine.parse(&filename, &schema)?,
                None => engine.parse_auto(&filename)?,
            };
            print_json(&result)
        }

        Commands::Assemble {
            fields,
            family,
            version,
            schema,
        } => {
            let fields = parse_fields(&fields)?;
            let filename = match schema_ref(family, version, schema) {
                Some(schema) => engine.assemble(&fields, &schema)?,
                None => engine.assemble_auto(&fields)?,
            };
            println!("{}", filename);
            Ok(())
        }

        Commands::List => print_json(&engine.list_families()?),

        Commands::Versions { family } => print_json(&engine.list_versions(&family)?),

        Commands::Describe { family, version } => print_json(&engine.describe(&family, version.as_deref())?),

        Commands::Search { query, limit } => print_json(&engine.search_families(&query, limit)?),

        Commands::Validate => {
            let report = engine.validate_examples()?;
            print_json(&report)?;
            if !report.is_clean() {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

fn schema_ref(family: Option<String>, version: Option<String>, schema: Option<PathBuf>) -> Option<SchemaRef> {
    match (family, schema) {
        (_, Some(path)) => Some(SchemaRef::Path(path)),
        (Some(family), None) => Some(SchemaRef::Family { family, version }),
        (None, None) => None,
    }
}

fn parse_fields(pairs: &[String]) -> anyhow::Result<Fields> {
    let mut fields = Fields::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("expected key=value, got '{}'", pair);
        };
        if key.is_empty() {
            bail!("empty field name in '{}'", pair);
        }
        fields.insert(key.to_string(), value.to_string());
    }
    Ok(fields)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

//! CLI binary for doctriage.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig`, drives the pipeline, and prints results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use doctriage::{DocumentPipeline, PipelineConfig, SchemaRegistry, ValidationEngine};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI definition ───────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "doctriage",
    version,
    about = "Classify PDF documents against named JSON Schemas via an LLM backend"
)]
struct Cli {
    /// Directory holding one JSON-Schema file per registered schema.
    #[arg(long, global = true, default_value = "data/schemas")]
    schema_dir: PathBuf,

    /// Path of the durable document collection.
    #[arg(long, global = true, default_value = "data/documents.json")]
    documents: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process one or more PDF files through the classification pipeline.
    Process {
        /// PDF files to process.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Base URL of the text-generation backend.
        #[arg(long, env = "LLM_API_URL")]
        endpoint: Option<String>,

        /// Per-classification-call timeout in seconds.
        #[arg(long, default_value_t = 60)]
        timeout_secs: u64,

        /// Number of documents processed concurrently.
        #[arg(long, default_value_t = 4)]
        concurrency: usize,

        /// Skip classification entirely (records carry classification: null).
        #[arg(long)]
        no_classify: bool,

        /// Print the resulting records as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// Manage the schema registry.
    Schemas {
        #[command(subcommand)]
        action: SchemasAction,
    },

    /// List processed document records.
    Documents {
        /// Only records classified under this schema id.
        #[arg(long)]
        schema: Option<String>,

        /// Print records as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// Validate a JSON data file against a registered schema.
    Validate {
        /// Schema id to validate against.
        schema_id: String,

        /// Path of a JSON file holding the data to validate.
        data_file: PathBuf,
    },
}

#[derive(Subcommand)]
enum SchemasAction {
    /// Seed the predefined schemas (invoice, receipt, contract).
    Init,
    /// List registered schemas.
    List,
    /// Print one schema's JSON body.
    Get { id: String },
    /// Register a new schema from a JSON-Schema file.
    Add { id: String, file: PathBuf },
    /// Replace an existing schema from a JSON-Schema file.
    Update { id: String, file: PathBuf },
    /// Delete a schema (predefined ids are protected).
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Process {
            files,
            endpoint,
            timeout_secs,
            concurrency,
            no_classify,
            json,
        } => {
            let mut builder = PipelineConfig::builder()
                .schema_dir(&cli.schema_dir)
                .documents_path(&cli.documents)
                .api_timeout_secs(timeout_secs)
                .concurrency(concurrency);
            if let Some(endpoint) = endpoint {
                builder = builder.llm_endpoint(endpoint);
            }
            let config = builder.build().context("invalid configuration")?;
            run_process(config, files, no_classify, json).await
        }
        Command::Schemas { action } => run_schemas(&cli.schema_dir, action),
        Command::Documents { schema, json } => run_documents(&cli.documents, schema, json),
        Command::Validate {
            schema_id,
            data_file,
        } => run_validate(&cli.schema_dir, &schema_id, &data_file),
    }
}

// ── process ──────────────────────────────────────────────────────────────────

async fn run_process(
    config: PipelineConfig,
    files: Vec<PathBuf>,
    no_classify: bool,
    json: bool,
) -> Result<()> {
    let pipeline = if no_classify {
        let registry = Arc::new(SchemaRegistry::open(&config.schema_dir)?);
        let store = Arc::new(doctriage::DocumentStore::open(&config.documents_path)?);
        DocumentPipeline::with_components(registry, store, None, config)
    } else {
        DocumentPipeline::new(config)?
    };

    let items: Vec<(String, PathBuf)> = files
        .iter()
        .map(|p| {
            let name = p
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| p.to_string_lossy().into_owned());
            (name, p.clone())
        })
        .collect();

    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(format!("Processing {} file(s)…", items.len()));
    bar.enable_steady_tick(Duration::from_millis(80));

    let results = pipeline.process_batch(items).await;
    bar.finish_and_clear();

    let mut failures = 0usize;
    let mut records = Vec::new();
    for result in results {
        match result {
            Ok(record) => {
                if !json {
                    let validity = match &record.validation {
                        Some(v) if v.is_valid => green("valid"),
                        Some(_) => red("invalid"),
                        None => dim("unvalidated"),
                    };
                    let marker = if record.parsed_content.error().is_some() {
                        yellow("▲")
                    } else {
                        green("✓")
                    };
                    println!(
                        "{} {}  {} {}  ({:.0}%)  [{}]",
                        marker,
                        bold(&record.filename),
                        dim("→"),
                        record.schema_id,
                        record.confidence * 100.0,
                        validity
                    );
                }
                records.push(record);
            }
            Err(e) => {
                failures += 1;
                eprintln!("{} {e}", red("✗"));
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        println!(
            "{} {} processed, {} failed",
            dim("—"),
            records.len(),
            failures
        );
    }

    if failures > 0 {
        anyhow::bail!("{failures} file(s) failed to process");
    }
    Ok(())
}

// ── schemas ──────────────────────────────────────────────────────────────────

fn run_schemas(schema_dir: &PathBuf, action: SchemasAction) -> Result<()> {
    let registry = SchemaRegistry::open(schema_dir)?;
    match action {
        SchemasAction::Init => {
            registry.seed_defaults()?;
            println!("{} predefined schemas seeded", green("✓"));
        }
        SchemasAction::List => {
            let schemas = registry.list()?;
            if schemas.is_empty() {
                println!("{}", dim("no schemas registered"));
            }
            for s in schemas {
                println!(
                    "{}  {}  {}",
                    bold(&s.id),
                    s.title,
                    dim(&format!("v{}", s.version))
                );
            }
        }
        SchemasAction::Get { id } => {
            let schema = registry.get(&id)?;
            println!("{}", serde_json::to_string_pretty(&schema.body)?);
        }
        SchemasAction::Add { id, file } => {
            let body = read_json(&file)?;
            registry.add(&id, body)?;
            println!("{} schema '{id}' added", green("✓"));
        }
        SchemasAction::Update { id, file } => {
            let body = read_json(&file)?;
            registry.update(&id, body)?;
            println!("{} schema '{id}' updated", green("✓"));
        }
        SchemasAction::Delete { id } => {
            registry.delete(&id)?;
            println!("{} schema '{id}' deleted", green("✓"));
        }
    }
    Ok(())
}

// ── documents ────────────────────────────────────────────────────────────────

fn run_documents(documents: &PathBuf, schema: Option<String>, json: bool) -> Result<()> {
    let store = doctriage::DocumentStore::open(documents)?;
    let records = store.list(schema.as_deref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("{}", dim("no documents recorded"));
        return Ok(());
    }
    for r in &records {
        println!(
            "{}  {}  {} {}  ({:.0}%)  {}",
            dim(&r.classification_id),
            bold(&r.filename),
            dim("→"),
            r.schema_id,
            r.confidence * 100.0,
            dim(&r.processed_at.to_rfc3339())
        );
    }
    println!("{} {} record(s)", dim("—"), records.len());
    Ok(())
}

// ── validate ─────────────────────────────────────────────────────────────────

fn run_validate(schema_dir: &PathBuf, schema_id: &str, data_file: &PathBuf) -> Result<()> {
    let registry = Arc::new(SchemaRegistry::open(schema_dir)?);
    let engine = ValidationEngine::new(registry);
    let data = read_json(data_file)?;

    let result = engine.validate(schema_id, &data);
    if result.is_valid {
        println!("{} data conforms to '{schema_id}'", green("✓"));
        Ok(())
    } else {
        println!(
            "{} {}",
            red("✗"),
            result.error_message.unwrap_or_else(|| "invalid".into())
        );
        anyhow::bail!("validation failed");
    }
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn read_json(path: &PathBuf) -> Result<serde_json::Value> {
    let bytes =
        std::fs::read(path).with_context(|| format!("cannot read '{}'", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("'{}' is not valid JSON", path.display()))
}

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use mnemos::config::MnemosConfig;

#[derive(Parser)]
#[command(name = "mnemos", version, about = "Durable semantic memory for retrieval-augmented assistants")]
struct Cli {
    /// Config file (default: ~/.mnemos/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Append a record to the log
    Remember {
        /// Category tag, e.g. EVENT or KNOWLEDGE
        category: String,
        content: String,
        #[arg(long, default_value_t = 0.0)]
        score: f64,
        #[arg(long)]
        entity: Option<String>,
        /// key=value annotation, repeatable
        #[arg(long = "meta")]
        metadata: Vec<String>,
    },
    /// Show one record by id
    Get { id: String },
    /// Show the most recent records, oldest first
    Recent {
        #[arg(short, default_value_t = 10)]
        n: usize,
    },
    /// List records in a category
    Category { category: String },
    /// List records owned by an entity
    Entity { entity: String },
    /// Case-insensitive substring search over records
    Search { query: String },
    /// List records whose relevance score lies in [min, max]
    #[command(allow_negative_numbers = true)]
    ScoreRange { min: f64, max: f64 },
    /// Record log and vector store statistics
    Stats,
    /// Verify every record and report on both stores
    Doctor,
    /// Rebuild the record index from the log
    Repair,
    /// Delete every record
    Purge {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Chunk, embed and store a file or directory
    Ingest { path: PathBuf },
    /// Print the retrieval context for a query
    Context {
        query: String,
        #[arg(short)]
        k: Option<usize>,
        #[arg(long)]
        max_chars: Option<usize>,
    },
    /// Print the top matching chunks for a query
    Query {
        query: String,
        #[arg(short)]
        k: Option<usize>,
    },
    /// Delete every stored chunk
    ClearVectors {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => MnemosConfig::load_from(path)?,
        None => MnemosConfig::load()?,
    };

    // Log to stderr so stdout stays clean for piped output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Store I/O and the blocking embedding client stay off the async workers.
    let json = cli.json;
    tokio::task::spawn_blocking(move || run(cli.command, &config, json)).await?
}

fn run(command: Command, config: &MnemosConfig, json: bool) -> Result<()> {
    match command {
        Command::Remember {
            category,
            content,
            score,
            entity,
            metadata,
        } => cli::records::remember(
            config,
            &category,
            &content,
            score,
            entity.as_deref(),
            &metadata,
            json,
        ),
        Command::Get { id } => cli::records::get(config, &id, json),
        Command::Recent { n } => cli::records::recent(config, n, json),
        Command::Category { category } => cli::records::category(config, &category, json),
        Command::Entity { entity } => cli::records::entity(config, &entity, json),
        Command::Search { query } => cli::records::search(config, &query, json),
        Command::ScoreRange { min, max } => cli::records::score_range(config, min, max, json),
        Command::Stats => cli::stats::stats(config, json),
        Command::Doctor => cli::doctor::doctor(config),
        Command::Repair => cli::maintenance::repair(config, json),
        Command::Purge { yes } => cli::maintenance::purge(config, yes),
        Command::Ingest { path } => cli::vectors::ingest(config, &path, json),
        Command::Context {
            query,
            k,
            max_chars,
        } => cli::vectors::context(config, &query, k, max_chars),
        Command::Query { query, k } => cli::vectors::query(config, &query, k, json),
        Command::ClearVectors { yes } => cli::maintenance::clear_vectors(config, yes),
    }
}

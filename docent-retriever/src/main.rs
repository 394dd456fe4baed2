use clap::{Parser, Subcommand};
use docent_retriever::{
    config::DocentConfig,
    knowledge_base::KnowledgeBase,
    storage::sqlite_store::SqliteStore,
};
use serde::Serialize;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// A CLI tool to build and query a docent knowledge base.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database file, overriding the configuration
    #[arg(short, long)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize the knowledge base database
    Init,
    /// Ingest extracted document text
    Ingest {
        /// Text file to ingest, or `-` for stdin
        file: PathBuf,
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search the knowledge base with a natural-language query
    Search {
        /// The query text
        query: String,
        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,
        /// Minimum cosine similarity (-1.0 to 1.0)
        #[arg(short, long)]
        min_score: Option<f32>,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Show database statistics
    Stats {
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum OutputFormat {
    Summary,
    Full,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(OutputFormat::Summary),
            "full" => Ok(OutputFormat::Full),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {s}")),
        }
    }
}

#[derive(Serialize)]
struct SearchOutput {
    query: String,
    min_score: f32,
    results: Vec<docent_retriever::storage::ScoredContent>,
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so stdout stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = DocentConfig::load_or_default(args.config.as_deref())?;
    if let Some(database) = args.database {
        config.database_path = database;
    }

    match args.command {
        Commands::Init => {
            let _store = SqliteStore::open(&config.database_path, config.store_options()).await?;
            println!("Initialized knowledge base");
            println!("Database location: {}", config.database_path.display());
            Ok(())
        }
        Commands::Ingest { file, json } => {
            let text = if file.as_os_str() == "-" {
                let mut buffer = String::new();
                io::stdin().read_to_string(&mut buffer)?;
                buffer
            } else {
                std::fs::read_to_string(&file)?
            };

            let kb = KnowledgeBase::open(config).await?;
            let outcome = kb.ingestion().ingest_document(&text).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else if let Some(message) = &outcome.message {
                println!("Success: {message}");
            } else if let Some(error) = &outcome.error {
                println!("Failed: {error}");
            }

            if !outcome.success {
                process::exit(2);
            }
            Ok(())
        }
        Commands::Search {
            query,
            limit,
            min_score,
            format,
        } => {
            let limit = limit.unwrap_or(config.retrieval.top_k);
            let min_score = min_score.unwrap_or(config.retrieval.min_score);
            if !min_score.is_finite() {
                return Err(anyhow::anyhow!("--min-score must be a finite number"));
            }

            let kb = KnowledgeBase::open(config).await?;
            let results = kb
                .retriever()
                .retrieve_scored(&query, limit, min_score)
                .await?;

            match format {
                OutputFormat::Json => {
                    let output = SearchOutput {
                        query,
                        min_score,
                        results,
                    };
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Summary => {
                    println!("Found {} relevant chunks:", results.len());
                    for hit in results {
                        println!(
                            "  Score: {:.3} | ID: {} | {}",
                            hit.score,
                            hit.id,
                            hit.content.chars().take(80).collect::<String>()
                        );
                    }
                }
                OutputFormat::Full => {
                    for hit in results {
                        println!("Score: {:.3}", hit.score);
                        println!("Record ID: {}", hit.id);
                        println!("Content:\n{}", hit.content);
                        println!("---");
                    }
                }
            }
            Ok(())
        }
        Commands::Stats { format } => {
            let store = SqliteStore::open(&config.database_path, config.store_options()).await?;
            let stats = store.stats().await?;

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                }
                OutputFormat::Summary | OutputFormat::Full => {
                    println!("Database Statistics:");
                    println!("  Database: {}", config.database_path.display());
                    println!("  Total records: {}", stats.record_count);
                    match stats.dimension {
                        Some(dimension) => println!("  Embedding dimension: {dimension}"),
                        None => println!("  Embedding dimension: not set"),
                    }
                    if let Some(last) = stats.last_insert_at {
                        println!("  Last insert: {last}");
                    }
                    if format == OutputFormat::Full {
                        println!("  Content dedup: {}", config.dedup_by_content);
                        println!(
                            "  Embedding: {} ({})",
                            config.embedding.model_name, config.embedding.provider
                        );
                        println!(
                            "  Retrieval policy: top {} above {:.2}",
                            config.retrieval.top_k, config.retrieval.min_score
                        );
                    }
                }
            }
            Ok(())
        }
    }
}

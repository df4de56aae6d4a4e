//! rihla CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use rihla::{
    chat::ChatService,
    config::Config,
    embed::SharedEmbedder,
    error::Result,
    history::HistoryManager,
    index::Indexer,
    llm::ChatClient,
    retrieve::Retriever,
    server::{self, AppState},
    store::{connect_pool, SourceTable, Store},
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "rihla")]
#[command(version, about = "Retrieval-augmented chat service for a trip booking catalog", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve,

    /// Rebuild the embedding store from the source catalog
    Reindex,

    /// Run a retrieval query against the embedding store
    Query {
        /// The search query
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Show system status
    Status,

    /// Manage the consumed database schema
    Db {
        #[command(subcommand)]
        action: DbAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Database management actions
#[derive(Subcommand)]
enum DbAction {
    /// Create the conversations/messages/documents_embeddings tables
    Init,

    /// Show embedding store counts
    Status,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Handle completions command (doesn't need config/db)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "rihla", &mut std::io::stdout());
        return Ok(());
    }

    // Load configuration
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(Config::default_config_path);
    let config = Config::load(&config_path)?;

    // Initialize components
    let pool = connect_pool(&config.database).await?;
    let store = Store::new(pool.clone());
    let embedder = Arc::new(SharedEmbedder::new(config.embedding.clone()));

    match cli.command {
        Commands::Serve => {
            // Warm the embedding model off the startup path so the first
            // query does not block on a model download
            let warm = embedder.clone();
            tokio::spawn(async move {
                warm.get().await;
            });

            let history = HistoryManager::new(pool.clone());
            let retriever = Retriever::new(store.clone(), embedder.clone());
            let llm = ChatClient::new(config.chat.clone())?;
            let chat = ChatService::new(history, retriever, llm, config.chat.clone());
            let indexer = Indexer::new(store.clone(), embedder.clone());

            let state = AppState {
                chat,
                indexer,
                store,
                embedder,
                chat_configured: config.chat_configured(),
            };

            server::serve(state, &config.server.bind_addr).await?;
        }

        Commands::Reindex => {
            let indexer = Indexer::new(store.clone(), embedder.clone());
            let report = indexer.reindex_all().await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("✓ Reindex complete");
                println!("  Documents indexed: {}", report.documents_indexed);
            }
        }

        Commands::Query { query, limit } => {
            let retriever = Retriever::new(store.clone(), embedder.clone());
            let hits = retriever.retrieve_detailed(&query, limit).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else if hits.is_empty() {
                println!("No results. Has the catalog been reindexed?");
            } else {
                for (rank, hit) in hits.iter().enumerate() {
                    println!(
                        "{}. [{} #{}] distance {:.4}",
                        rank + 1,
                        hit.source_table,
                        hit.source_id,
                        hit.distance
                    );
                    println!("{}\n", hit.text_chunk);
                }
            }
        }

        Commands::Status => {
            let status = build_status(&config, &store).await;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("rihla status");
                println!("  Database: {}", status.database);
                for category in &status.categories {
                    println!("  {}: {} documents", category.source_table, category.count);
                }
                println!("  Chat API: {}", status.chat_api);
                println!("  Embedding model: {}", status.embedding_model);
            }
        }

        Commands::Db { action } => match action {
            DbAction::Init => {
                store.init_schema().await?;
                info!("Schema initialized");
                println!("✓ Schema initialized");
            }
            DbAction::Status => {
                let total = store.count_documents(None).await?;
                println!("Embedding store: {} documents", total);
                for table in SourceTable::ALL {
                    let count = store.count_documents(Some(table)).await?;
                    println!("  {}: {}", table, count);
                }
            }
        },

        Commands::Completions { .. } => unreachable!(),
    }

    Ok(())
}

#[derive(Serialize)]
struct StatusReport {
    database: String,
    categories: Vec<CategoryCount>,
    chat_api: String,
    embedding_model: String,
}

#[derive(Serialize)]
struct CategoryCount {
    source_table: String,
    count: i64,
}

async fn build_status(config: &Config, store: &Store) -> StatusReport {
    let database = match store.ping().await {
        Ok(()) => "connected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    let mut categories = Vec::new();
    for table in SourceTable::ALL {
        let count = store.count_documents(Some(table)).await.unwrap_or(0);
        categories.push(CategoryCount {
            source_table: table.to_string(),
            count,
        });
    }

    StatusReport {
        database,
        categories,
        chat_api: if config.chat_configured() {
            "configured".to_string()
        } else {
            "not_configured".to_string()
        },
        embedding_model: config.embedding.model.clone(),
    }
}

//! shopsearch CLI - load a product catalog and run hybrid searches.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use shopsearch_core::{
    Embedder, Product, ProductStore, Result as SearchResultT, SearchRequest, ShopSearchConfig,
};
use shopsearch_embed::{CachedEmbedder, MockEmbedder, RemoteEmbedder};
use shopsearch_query::SearchEngine;
use shopsearch_store::SqliteProductStore;

/// shopsearch - Hybrid product search (ANN + lexical, RRF-fused)
#[derive(Parser)]
#[command(name = "shopsearch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Catalog database path (default from config)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Config file path (default: config dir, then ./shopsearch.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the catalog database
    Init,

    /// Load products from a JSON file (array of product records)
    Load {
        /// Path to the JSON catalog file
        path: PathBuf,
    },

    /// Run a hybrid search
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,

        /// Minimum fused score
        #[arg(long)]
        min_score: Option<f64>,
    },

    /// Show catalog statistics
    Stats,
}

/// Embedder selected at startup: remote endpoint when configured,
/// deterministic mock otherwise (keeps local development offline).
enum AnyEmbedder {
    Cached(CachedEmbedder<RemoteEmbedder>),
    Remote(RemoteEmbedder),
    Mock(MockEmbedder),
}

#[async_trait]
impl Embedder for AnyEmbedder {
    async fn embed_query(&self, text: &str) -> SearchResultT<Vec<f32>> {
        match self {
            Self::Cached(e) => e.embed_query(text).await,
            Self::Remote(e) => e.embed_query(text).await,
            Self::Mock(e) => e.embed_query(text).await,
        }
    }

    fn dimension(&self) -> usize {
        match self {
            Self::Cached(e) => e.dimension(),
            Self::Remote(e) => e.dimension(),
            Self::Mock(e) => e.dimension(),
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn load_config(path: Option<&PathBuf>) -> Result<ShopSearchConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(ShopSearchConfig::load(path)?),
        None => Ok(ShopSearchConfig::load_default()?),
    }
}

fn open_store(
    config: &ShopSearchConfig,
    database: Option<PathBuf>,
) -> Result<SqliteProductStore, Box<dyn std::error::Error>> {
    let path = database.unwrap_or_else(|| config.database.path.clone());
    Ok(SqliteProductStore::open(path, config.embedding.dimension)?)
}

fn build_embedder(config: &ShopSearchConfig) -> Result<AnyEmbedder, Box<dyn std::error::Error>> {
    if config.embedding.endpoint.is_empty() {
        info!("No embedding endpoint configured, using mock embedder");
        return Ok(AnyEmbedder::Mock(MockEmbedder::with_dimension(
            config.embedding.dimension,
        )));
    }

    let remote = RemoteEmbedder::from_config(&config.embedding)?;
    if config.embedding.cache_enabled {
        Ok(AnyEmbedder::Cached(CachedEmbedder::new(
            remote,
            config.embedding.cache_max_entries,
            Duration::from_secs(config.embedding.cache_ttl_secs),
        )))
    } else {
        Ok(AnyEmbedder::Remote(remote))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Init => {
            let store = open_store(&config, cli.database)?;
            println!(
                "Initialized catalog (ANN lane {})",
                if store.vec_enabled() { "enabled" } else { "disabled" }
            );
        }
        Commands::Load { path } => {
            let store = open_store(&config, cli.database)?;
            load_catalog(&store, &path).await?;
        }
        Commands::Search {
            query,
            limit,
            min_score,
        } => {
            let store = open_store(&config, cli.database)?;
            let embedder = build_embedder(&config)?;
            let engine = SearchEngine::new(
                Arc::new(store),
                Arc::new(embedder),
                config.search.clone(),
            );

            let request = SearchRequest {
                query,
                limit,
                min_score,
                alpha: None,
            };

            match engine.search(&request).await {
                Ok(response) => {
                    println!("{}", serde_json::to_string_pretty(&response)?);
                }
                Err(e) => {
                    eprintln!("Error ({}): {}", e.error_code(), e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Stats => {
            let store = open_store(&config, cli.database)?;
            let count = store.count_products().await?;
            println!("products: {}", count);
            println!(
                "ann lane: {}",
                if store.vec_enabled() { "enabled" } else { "disabled" }
            );
        }
    }

    Ok(())
}

async fn load_catalog(
    store: &SqliteProductStore,
    path: &PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    let products: Vec<Product> = serde_json::from_str(&content)?;

    if products.is_empty() {
        println!("No products found in {}", path.display());
        return Ok(());
    }

    let total = products.len();
    let with_embeddings = products.iter().filter(|p| p.embedding.is_some()).count();

    store.upsert_products(&products).await?;

    println!(
        "Loaded {} product(s) ({} with embeddings) from {}",
        total,
        with_embeddings,
        path.display()
    );

    Ok(())
}

//! Command-line front end for semantic search over Atlas and Voyage AI.

use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser as _;
use semsearch_retrieval::{Document, RetrievalConfig, SearchPipeline, SearchResult};
use tokio::io::AsyncBufReadExt as _;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod quickstart;

const RULE_WIDTH: usize = 80;
const ATLAS_PLOT_CHARS: usize = 400;
const RETRIEVER_PLOT_CHARS: usize = 200;

const DEFAULT_RETRIEVER_QUERIES: [&str; 4] = [
    "space adventure with alien encounters",
    "romantic comedy in New York",
    "action movie with car chases",
    "psychological thriller with plot twists",
];

#[derive(clap::Parser)]
#[command(name = "semsearch")]
#[command(about = "Semantic search with Voyage AI embeddings and MongoDB Atlas")]
struct Args {
    /// Configuration file (defaults to $SEMSEARCH_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run a single $vectorSearch query against Atlas
    AtlasSearch {
        /// The search query (read from stdin when omitted)
        #[arg(short, long)]
        query: Option<String>,

        /// Rerank the Atlas results
        #[arg(long)]
        rerank: bool,
    },

    /// Tokenize, embed and search a small built-in corpus, then rerank
    Quickstart {
        /// The search query
        #[arg(short, long, default_value = quickstart::DEFAULT_QUERY)]
        query: String,

        /// Number of documents to return
        #[arg(short, long, default_value = "3")]
        k: usize,
    },

    /// Retrieve the top documents for each query
    Retriever {
        /// Queries to run (defaults to a set of sample movie queries)
        queries: Vec<String>,

        /// Documents per query (defaults to the configured value)
        #[arg(short, long)]
        k: Option<usize>,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::AtlasSearch { .. } => "atlas-search",
            Self::Quickstart { .. } => "quickstart",
            Self::Retriever { .. } => "retriever",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; variables may come from the shell.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = RetrievalConfig::load(args.config.as_deref())
        .context("failed to load configuration")?;
    info!(
        "Running {} (embedding model {}, namespace {})",
        args.command.name(),
        config.embedding.model,
        config.vector_search.namespace
    );

    match args.command {
        Command::AtlasSearch { query, rerank } => atlas_search(config, query, rerank).await,
        Command::Quickstart { query, k } => quickstart::run(config, &query, k).await,
        Command::Retriever { queries, k } => retriever(config, queries, k).await,
    }
}

async fn atlas_search(
    mut config: RetrievalConfig,
    query: Option<String>,
    rerank: bool,
) -> anyhow::Result<()> {
    config.rerank.enabled |= rerank;

    let pipeline = SearchPipeline::builder(config)
        .with_atlas(true)
        .build()
        .await
        .context("failed to set up search pipeline")?;

    let query = match query {
        Some(query) => query,
        None => read_query().await?,
    };

    println!("\n🔍 Searching for: '{query}'");
    println!("⏳ Generating Query embedding...");
    let query_vector = pipeline.embed_query(&query).await?;
    println!(
        "✅ Query Embedding generated ({} dimensions)",
        query_vector.len()
    );

    println!("🔎 Searching Atlas Cluster ...\n");
    let results = pipeline.search_remote_with(&query, &query_vector).await?;

    println!("{}", "=".repeat(RULE_WIDTH));
    println!("RESULTS FOR: '{query}'");
    println!("{}", "=".repeat(RULE_WIDTH));

    for result in &results {
        println!("\n{}. {}", result.rank, title_of(&result.document));
        println!("   Score: {:.4}", result.score);
        println!(
            "   Plot: {}...",
            preview(&result.document.text, ATLAS_PLOT_CHARS)
        );
        println!("{}", "-".repeat(RULE_WIDTH));
    }

    println!("\n✨ Search complete!");
    Ok(())
}

async fn retriever(
    config: RetrievalConfig,
    queries: Vec<String>,
    k: Option<usize>,
) -> anyhow::Result<()> {
    let pipeline = SearchPipeline::builder(config)
        .with_atlas(true)
        .build()
        .await
        .context("failed to set up search pipeline")?;

    let queries = if queries.is_empty() {
        DEFAULT_RETRIEVER_QUERIES
            .iter()
            .map(ToString::to_string)
            .collect()
    } else {
        queries
    };

    let mut retriever = pipeline.as_retriever();
    if let Some(k) = k {
        retriever = retriever.with_k(k);
    }

    for query in &queries {
        println!("Input Query: {query}\n\n");
        let results = retriever.invoke(query).await?;
        print_matches(&results);
        println!(
            "{}\nFound {} results.\n{}",
            "=".repeat(60),
            results.len(),
            "=".repeat(60)
        );
    }

    Ok(())
}

fn print_matches(results: &[SearchResult]) {
    for result in results {
        println!("Match no. {}:\n", result.rank);
        println!("Title: {}", title_of(&result.document));
        println!(
            "Plot: {}...",
            preview(&result.document.text, RETRIEVER_PLOT_CHARS)
        );
        println!("{}", "-".repeat(30));
    }
}

async fn read_query() -> anyhow::Result<String> {
    print!("Enter your search query: ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    tokio::io::BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("failed to read query from stdin")?;

    let query = line.trim();
    anyhow::ensure!(!query.is_empty(), "no search query given");
    Ok(query.to_string())
}

fn title_of(document: &Document) -> &str {
    document.title.as_deref().unwrap_or("N/A")
}

/// First `max_chars` characters of `text`.
fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser as _;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_preview_respects_char_boundaries() {
        assert_eq!(preview("héllo wörld", 4), "héll");
        assert_eq!(preview("short", 400), "short");
        assert_eq!(preview("", 10), "");
    }

    #[test]
    fn test_title_fallback() {
        assert_eq!(title_of(&Document::new("plot")), "N/A");
        assert_eq!(
            title_of(&Document::new("plot").with_title("Alien")),
            "Alien"
        );
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from(["semsearch", "retriever", "-k", "3", "space"]).unwrap();
        match args.command {
            Command::Retriever { queries, k } => {
                assert_eq!(queries, vec!["space".to_string()]);
                assert_eq!(k, Some(3));
            }
            _ => panic!("expected retriever"),
        }
    }

    #[test]
    fn test_command_names_match_subcommands() {
        let args = Args::try_parse_from(["semsearch", "atlas-search", "-q", "aliens"]).unwrap();
        assert_eq!(args.command.name(), "atlas-search");

        let args = Args::try_parse_from(["semsearch", "quickstart"]).unwrap();
        assert_eq!(args.command.name(), "quickstart");
    }
}

use anyhow::Result;
use clap::{Parser, Subcommand};
use sift_core::docstore::DocumentStore;
use sift_core::search::search_query;
use sift_core::store::IndexStore;
use sift_indexer::{build_index, import_json_dir};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query the TF-IDF inverted index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the index database from the crawled document store
    Build {
        /// Document store directory written by the crawler
        #[arg(long, default_value = "./data/documents")]
        docs: PathBuf,
        /// Index database file
        #[arg(long, default_value = "./data/inverted_index.db")]
        db: PathBuf,
    },
    /// Load a directory of {url, content} JSON files into the document store
    Import {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "./data/documents")]
        docs: PathBuf,
    },
    /// Run one query against a built index and print the ranked URLs
    Search {
        #[arg(long, default_value = "./data/inverted_index.db")]
        db: PathBuf,
        #[arg(long)]
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { docs, db } => {
            let docs = DocumentStore::open(&docs)?;
            let mut index = IndexStore::open(&db)?;
            let summary = build_index(&docs, &mut index)?;
            println!(
                "indexed {} documents ({} terms, {} postings) into {}",
                summary.documents,
                summary.terms,
                summary.postings,
                db.display()
            );
        }
        Commands::Import { input, docs } => {
            let store = DocumentStore::open(&docs)?;
            let n = import_json_dir(&input, &store)?;
            println!("imported {n} documents into {}", docs.display());
        }
        Commands::Search { db, query, limit } => {
            let index = IndexStore::open_read_only(&db)?;
            let hits = search_query(&index, &query)?;
            println!("{} results", hits.len());
            for hit in hits.into_iter().take(limit) {
                println!("{:.6}\t{}", hit.score, hit.url);
            }
        }
    }
    Ok(())
}

use anyhow::{anyhow, Result};
use clap::Parser;
use sift_core::docstore::DocumentStore;
use sift_crawler::{CrawlConfig, Crawler, HttpFetcher};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "crawler")]
#[command(about = "Breadth-first crawl from seed URLs into the document store")]
struct Cli {
    /// Path to a file with seed URLs (one per line)
    #[arg(long)]
    seeds: PathBuf,
    /// Document store directory
    #[arg(long, default_value = "./data/documents")]
    store: PathBuf,
    /// Maximum link distance from a seed
    #[arg(long, default_value_t = 2)]
    max_depth: usize,
    /// Maximum fetches in flight
    #[arg(long, default_value_t = 100)]
    concurrency: usize,
    /// Request timeout seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
    /// Minimum random pause before each request
    #[arg(long, default_value_t = 1000)]
    delay_min_ms: u64,
    /// Maximum random pause before each request
    #[arg(long, default_value_t = 3000)]
    delay_max_ms: u64,
    #[arg(long, default_value = "sift-bot/0.1 (+https://example.com/bot)")]
    user_agent: String,
    /// Accept invalid TLS certificates
    #[arg(long, default_value_t = false)]
    insecure: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();

    let seeds = load_seeds(&args.seeds)?;
    if seeds.is_empty() {
        return Err(anyhow!("no valid seeds in {}", args.seeds.display()));
    }

    let config = CrawlConfig {
        timeout: Duration::from_secs(args.timeout_secs),
        user_agent: args.user_agent.clone(),
        accept_invalid_certs: args.insecure,
        ..CrawlConfig::default()
    }
    .with_delay(Duration::from_millis(args.delay_min_ms), Duration::from_millis(args.delay_max_ms));

    let store = DocumentStore::open(&args.store)?;
    let fetcher = HttpFetcher::new(&config)?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, stopping after the current level");
                cancel.cancel();
            }
        });
    }

    tracing::info!(
        seeds = seeds.len(),
        max_depth = args.max_depth,
        concurrency = args.concurrency,
        store = %args.store.display(),
        "crawl starting"
    );
    let crawler = Crawler::new(fetcher, store).with_cancellation(cancel);
    let summary = crawler.crawl(&seeds, args.max_depth, args.concurrency).await?;
    println!(
        "done: stored={} attempted={} duplicates={} failed={} levels={}",
        summary.stored, summary.attempted, summary.duplicate_content, summary.failed, summary.levels
    );
    Ok(())
}

/// One URL per line; blank lines and `#` comments are skipped, bare hosts get `https://`.
fn load_seeds(path: &Path) -> Result<Vec<Url>> {
    let mut seeds = Vec::new();
    for line in BufReader::new(File::open(path)?).lines() {
        let s = line?.trim().to_string();
        if s.is_empty() || s.starts_with('#') { continue; }
        match Url::parse(&s).or_else(|_| Url::parse(&format!("https://{}", s))) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => seeds.push(u),
            _ => tracing::warn!(seed = %s, "ignoring invalid seed"),
        }
    }
    Ok(seeds)
}

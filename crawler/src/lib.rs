//! Depth-bounded, concurrency-bounded web crawler feeding the document store.

mod config;
mod extract;
mod fetch;
mod frontier;

pub use config::CrawlConfig;
pub use extract::{collapse_whitespace, extract, Page};
pub use fetch::{Fetched, Fetcher, HttpFetcher};
pub use frontier::{CrawlSummary, Crawler};

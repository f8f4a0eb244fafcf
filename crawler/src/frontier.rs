use crate::extract::{extract, without_fragment};
use crate::fetch::Fetcher;
use anyhow::Result;
use parking_lot::Mutex;
use sha1::{Digest, Sha1};
use sift_core::docstore::DocumentStore;
use sift_core::StoredDocument;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Counters for one crawl run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Levels that were actually processed, seeds included.
    pub levels: usize,
    /// URLs claimed and handed to the fetcher.
    pub attempted: usize,
    pub stored: usize,
    pub duplicate_content: usize,
    pub failed: usize,
}

/// URLs and page fingerprints already claimed during one crawl. Each check-and-insert
/// happens under a single lock acquisition, so two tasks can never both claim the same
/// entry.
#[derive(Default)]
struct Seen {
    urls: HashSet<String>,
    content: HashSet<String>,
}

impl Seen {
    fn claim_url(&mut self, url: &Url) -> bool { self.urls.insert(url.as_str().to_string()) }

    fn claim_content(&mut self, text: &str) -> bool {
        let mut hasher = Sha1::new();
        hasher.update(text.as_bytes());
        self.content.insert(format!("{:x}", hasher.finalize()))
    }
}

enum Outcome {
    Stored(Vec<Url>),
    DuplicateContent,
    Failed,
}

struct Task<F> {
    fetcher: Arc<F>,
    store: DocumentStore,
    seen: Arc<Mutex<Seen>>,
    permits: Arc<Semaphore>,
}

impl<F> Clone for Task<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: self.fetcher.clone(),
            store: self.store.clone(),
            seen: self.seen.clone(),
            permits: self.permits.clone(),
        }
    }
}

impl<F: Fetcher> Task<F> {
    async fn visit(self, url: Url, follow_links: bool) -> Outcome {
        let fetched = {
            let Ok(_permit) = self.permits.acquire().await else { return Outcome::Failed };
            self.fetcher.fetch(&url).await
        };
        let Some(fetched) = fetched else { return Outcome::Failed };

        let page = extract(&fetched.url, &fetched.body);
        if !self.seen.lock().claim_content(&page.text) {
            tracing::debug!(%url, "skipping duplicate content");
            return Outcome::DuplicateContent;
        }

        let doc = StoredDocument { url: url.to_string(), content: page.text };
        if let Err(err) = self.store.put(&doc) {
            tracing::error!(%url, error = %err, "failed to persist document");
            return Outcome::Failed;
        }
        tracing::info!(%url, links = page.links.len(), "stored document");
        Outcome::Stored(if follow_links { page.links } else { Vec::new() })
    }
}

/// Level-synchronous breadth-first crawler writing every retained page to a
/// [`DocumentStore`].
pub struct Crawler<F> {
    fetcher: Arc<F>,
    store: DocumentStore,
    cancel: CancellationToken,
}

impl<F: Fetcher + 'static> Crawler<F> {
    pub fn new(fetcher: F, store: DocumentStore) -> Self {
        Self { fetcher: Arc::new(fetcher), store, cancel: CancellationToken::new() }
    }

    /// Stop before the next level starts once `token` is cancelled. A level already in
    /// flight always runs to completion.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Crawl outward from `seeds`, at most `max_depth` links away, with no more than
    /// `concurrency_limit` fetches in flight.
    ///
    /// Each URL is fetched at most once per call. Every fetch of a level resolves before
    /// the next level starts. Failed fetches and duplicate pages are counted and
    /// otherwise ignored.
    pub async fn crawl(&self, seeds: &[Url], max_depth: usize, concurrency_limit: usize) -> Result<CrawlSummary> {
        let task = Task {
            fetcher: self.fetcher.clone(),
            store: self.store.clone(),
            seen: Arc::new(Mutex::new(Seen::default())),
            permits: Arc::new(Semaphore::new(concurrency_limit.max(1))),
        };
        let mut summary = CrawlSummary::default();
        let mut level: Vec<Url> = seeds.iter().cloned().map(without_fragment).collect();

        for depth in 0..=max_depth {
            if level.is_empty() {
                break;
            }
            if self.cancel.is_cancelled() {
                tracing::info!(depth, "crawl cancelled");
                break;
            }

            let follow_links = depth < max_depth;
            let mut tasks = JoinSet::new();
            for url in level {
                if !task.seen.lock().claim_url(&url) {
                    tracing::debug!(%url, "skipping seen url");
                    continue;
                }
                summary.attempted += 1;
                tasks.spawn(task.clone().visit(url, follow_links));
            }

            let mut next = Vec::new();
            let mut next_keys = HashSet::new();
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(Outcome::Stored(links)) => {
                        summary.stored += 1;
                        for link in links {
                            if next_keys.insert(link.as_str().to_string()) {
                                next.push(link);
                            }
                        }
                    }
                    Ok(Outcome::DuplicateContent) => summary.duplicate_content += 1,
                    Ok(Outcome::Failed) => summary.failed += 1,
                    Err(err) => {
                        tracing::error!(error = %err, "fetch task aborted");
                        summary.failed += 1;
                    }
                }
            }

            summary.levels += 1;
            tracing::info!(depth, stored = summary.stored, next = next.len(), "level complete");
            level = next;
        }

        self.store.flush()?;
        tracing::info!(?summary, "crawl finished");
        Ok(summary)
    }
}

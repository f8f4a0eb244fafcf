use crate::config::CrawlConfig;
use anyhow::{bail, Result};
use async_trait::async_trait;
use rand::Rng;
use reqwest::{header, Client};
use url::Url;
use std::time::Duration;
use tokio::time::sleep;

/// A successfully fetched page.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    /// Where the body was served from once redirects were followed. Relative links
    /// resolve against this, not the requested URL.
    pub url: Url,
    pub body: String,
}

/// Source of page bodies. Every failure is reported as `None`; the crawler never sees
/// an error from here.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Option<Fetched>;
}

pub struct HttpFetcher {
    client: Client,
    delay_min: Duration,
    delay_max: Duration,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        if config.accept_invalid_certs {
            tracing::warn!("TLS certificate verification disabled");
        }
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;
        Ok(Self {
            client,
            delay_min: config.delay_min.min(config.delay_max),
            delay_max: config.delay_min.max(config.delay_max),
            max_body_bytes: config.max_body_bytes,
        })
    }

    async fn politeness_delay(&self) {
        if self.delay_max.is_zero() {
            return;
        }
        let delay = rand::thread_rng().gen_range(self.delay_min..=self.delay_max);
        sleep(delay).await;
    }

    async fn get(&self, url: &Url) -> Result<Fetched> {
        let mut resp = self.client.get(url.clone()).send().await?.error_for_status()?;
        if let Some(ct) = resp.headers().get(header::CONTENT_TYPE) {
            if let Ok(v) = ct.to_str() {
                if !(v.starts_with("text/html") || v.starts_with("application/xhtml")) {
                    bail!("unsupported content type {v}");
                }
            }
        }
        if let Some(len) = resp.content_length() {
            if len > self.max_body_bytes as u64 {
                bail!("declared body of {len} bytes exceeds limit");
            }
        }
        let final_url = resp.url().clone();
        // Content-Length may be absent or wrong; stop reading once the limit is passed
        let mut bytes = Vec::new();
        while let Some(chunk) = resp.chunk().await? {
            if bytes.len() + chunk.len() > self.max_body_bytes {
                bail!("body exceeds limit of {} bytes", self.max_body_bytes);
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(Fetched { url: final_url, body: String::from_utf8_lossy(&bytes).into_owned() })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Option<Fetched> {
        self.politeness_delay().await;
        match self.get(url).await {
            Ok(page) => {
                if page.url != *url {
                    tracing::debug!(%url, final_url = %page.url, "followed redirect");
                }
                Some(page)
            }
            Err(err) => {
                tracing::warn!(%url, error = %err, "fetch failed");
                None
            }
        }
    }
}

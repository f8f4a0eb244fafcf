use std::time::Duration;

/// Crawler settings. Built explicitly by the caller; nothing here is read from the
/// environment or changed globally.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Lower bound of the random pause before each request.
    pub delay_min: Duration,
    /// Upper bound of the random pause before each request.
    pub delay_max: Duration,
    /// Whole-request timeout. Exceeding it is an ordinary fetch failure.
    pub timeout: Duration,
    pub user_agent: String,
    /// Skip TLS certificate verification. Off unless the caller opts in.
    pub accept_invalid_certs: bool,
    /// Bodies larger than this are dropped.
    pub max_body_bytes: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            delay_min: Duration::from_secs(1),
            delay_max: Duration::from_secs(3),
            timeout: Duration::from_secs(10),
            user_agent: "sift-bot/0.1 (+https://example.com/bot)".to_string(),
            accept_invalid_certs: false,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

impl CrawlConfig {
    pub fn with_delay(mut self, min: Duration, max: Duration) -> Self {
        self.delay_min = min.min(max);
        self.delay_max = min.max(max);
        self
    }
}

use anyhow::Result;
use axum::{extract::{Query, State}, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use sift_core::search::search_query;
use sift_core::store::IndexStore;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer, AllowOrigin};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub url: String,
    /// `url` with literal query words wrapped in `<mark>`. Display only.
    pub highlighted_url: String,
    pub score: f64,
}

#[derive(Clone)]
pub struct AppState {
    pub db_path: Arc<PathBuf>,
}

pub fn build_app(db_path: PathBuf) -> Result<Router> {
    // Fail at startup rather than on the first query if the index is unreadable
    let index = IndexStore::open_read_only(&db_path)?;
    let num_docs = index.doc_count()?;
    tracing::info!(num_docs, db = %db_path.display(), "index opened");
    let app_state = AppState { db_path: Arc::new(db_path) };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    let db_path = state.db_path.clone();
    let query = params.q.clone();
    // Each request gets its own read-only connection; SQLite does the blocking I/O.
    let hits = tokio::task::spawn_blocking(move || -> Result<Vec<sift_core::SearchHit>> {
        let index = IndexStore::open_read_only(db_path.as_path())?;
        search_query(&index, &query)
    })
    .await
    .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?
    .map_err(|err| {
        tracing::error!(error = %err, "search failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "search failed".to_string())
    })?;

    let total_hits = hits.len();
    let k = params.k.max(1).min(100);
    // Capture raw query words for highlighting, minus the operators
    let raw_terms: Vec<String> = params
        .q
        .split_whitespace()
        .filter(|w| !matches!(w.to_lowercase().as_str(), "and" | "or" | "not"))
        .map(|s| s.to_string())
        .collect();
    let results = hits
        .into_iter()
        .take(k)
        .map(|h| SearchHit { highlighted_url: highlight_terms(&h.url, &raw_terms), url: h.url, score: h.score })
        .collect();

    let elapsed = start.elapsed();
    Ok(Json(SearchResponse { query: params.q, took_s: elapsed.as_secs_f64(), total_hits, results }))
}

/// Wrap case-insensitive literal occurrences of each term in `<mark>`. Terms are matched
/// in one pass so a later term never matches inside markup added for an earlier one.
pub fn highlight_terms(text: &str, terms: &[String]) -> String {
    let mut alternatives: Vec<String> = terms
        .iter()
        .filter(|t| !t.trim().is_empty())
        .map(|t| regex::escape(t))
        .collect();
    if alternatives.is_empty() {
        return text.to_string();
    }
    // longest first: "rust" must not win over "rustacean"
    alternatives.sort_by_key(|t| std::cmp::Reverse(t.len()));
    match regex::RegexBuilder::new(&alternatives.join("|")).case_insensitive(true).build() {
        Ok(pat) => pat.replace_all(text, |caps: &regex::Captures| format!("<mark>{}</mark>", &caps[0])).into_owned(),
        Err(_) => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(s: &str) -> Vec<String> { s.split_whitespace().map(String::from).collect() }

    #[test]
    fn highlights_each_term_case_insensitively() {
        assert_eq!(
            highlight_terms("https://Rust-lang.org/learn", &terms("rust learn")),
            "https://<mark>Rust</mark>-lang.org/<mark>learn</mark>"
        );
    }

    #[test]
    fn overlapping_terms_do_not_nest_markup() {
        assert_eq!(highlight_terms("http://x/mark", &terms("mark ark")), "http://x/<mark>mark</mark>");
    }

    #[test]
    fn no_terms_leaves_text_alone() {
        assert_eq!(highlight_terms("http://x/", &[]), "http://x/");
        assert_eq!(highlight_terms("http://x/a.b", &terms("a.b")), "http://x/<mark>a.b</mark>");
    }
}

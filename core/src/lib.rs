use serde::{Deserialize, Serialize};

pub mod compress;
pub mod docstore;
pub mod query;
pub mod search;
pub mod store;
pub mod tokenizer;

pub type DocId = i64;

/// Raw page text as the crawler persists it, keyed in the document store by a hash of `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub url: String,
    pub content: String,
}

/// Row of the `documents` table.
#[derive(Debug, Clone, PartialEq)]
pub struct DocMeta {
    pub id: DocId,
    pub url: String,
    pub doc_length: u32,
}

/// One inverted index entry ready to be written. `token` is already compressed.
#[derive(Debug, Clone, PartialEq)]
pub struct Posting {
    pub token: Vec<u8>,
    pub doc_id: DocId,
    pub frequency: u32,
    pub tf: f64,
    pub idf: f64,
}

/// Posting joined with its document, as read back at query time.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPosting {
    pub doc_id: DocId,
    pub url: String,
    pub tf: f64,
    pub idf: f64,
}

impl ScoredPosting {
    pub fn tfidf(&self) -> f64 { self.tf * self.idf }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub url: String,
    pub score: f64,
}

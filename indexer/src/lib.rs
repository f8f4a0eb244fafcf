use anyhow::{Context, Result};
use sift_core::compress::compress_token;
use sift_core::docstore::DocumentStore;
use sift_core::store::{IndexStore, BUILT_AT_KEY, DOC_COUNT_KEY};
use sift_core::tokenizer::tokenize;
use sift_core::{DocId, Posting, StoredDocument};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use time::format_description::well_known::Rfc3339;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexSummary {
    pub documents: u64,
    pub terms: usize,
    pub postings: usize,
}

/// Raw per-document token counts. Tokens that never occurred have frequency 0.
#[derive(Debug, Default)]
pub struct TermCounts {
    counts: BTreeMap<String, u32>,
    doc_length: u32,
}

impl TermCounts {
    pub fn from_tokens<I: IntoIterator<Item = String>>(tokens: I) -> Self {
        let mut out = Self::default();
        for token in tokens {
            *out.counts.entry(token).or_insert(0) += 1;
            out.doc_length += 1;
        }
        out
    }

    pub fn frequency(&self, token: &str) -> u32 { self.counts.get(token).copied().unwrap_or(0) }

    /// Number of tokens that survived stopword removal.
    pub fn doc_length(&self) -> u32 { self.doc_length }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> { self.counts.iter().map(|(t, c)| (t.as_str(), *c)) }
}

struct TermEntry {
    df: u32,
    compressed: Vec<u8>,
}

/// Corpus-wide document frequency per token. Unseen tokens have df 0.
#[derive(Default)]
pub struct TermStats {
    terms: HashMap<String, TermEntry>,
}

impl TermStats {
    /// Count one document. Each distinct token in `counts` raises its df by one.
    pub fn observe(&mut self, counts: &TermCounts) -> Result<()> {
        for (token, _) in counts.iter() {
            match self.terms.get_mut(token) {
                Some(entry) => entry.df += 1,
                None => {
                    let compressed = compress_token(token)?;
                    self.terms.insert(token.to_string(), TermEntry { df: 1, compressed });
                }
            }
        }
        Ok(())
    }

    pub fn df(&self, token: &str) -> u32 { self.terms.get(token).map_or(0, |e| e.df) }

    fn compressed(&self, token: &str) -> Option<&[u8]> { self.terms.get(token).map(|e| e.compressed.as_slice()) }

    pub fn len(&self) -> usize { self.terms.len() }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() }
}

/// `ln((N + 1) / (1 + df))`, floored at zero.
pub fn idf(num_docs: u64, df: u32) -> f64 {
    ((num_docs as f64 + 1.0) / (1.0 + df as f64)).ln().max(0.0)
}

pub fn tf(frequency: u32, doc_length: u32) -> f64 {
    if doc_length == 0 { 0.0 } else { frequency as f64 / doc_length as f64 }
}

/// Rebuild the whole inverted index from the document store.
///
/// Runs inside a single transaction that first clears the index, so a rerun replaces
/// the previous build instead of appending to it, and a failure leaves the previous
/// build in place. Document ids follow the store's iteration order. idf uses the
/// document count frozen after every document has been read.
pub fn build_index(docs: &DocumentStore, index: &mut IndexStore) -> Result<IndexSummary> {
    let batch = index.rebuild()?;
    let mut stats = TermStats::default();
    let mut pending: Vec<(DocId, TermCounts)> = Vec::new();

    for doc in docs.iter() {
        let doc = doc?;
        let counts = TermCounts::from_tokens(tokenize(&doc.content));
        let doc_id = batch.insert_document(&doc.url, counts.doc_length())?;
        stats.observe(&counts)?;
        pending.push((doc_id, counts));
    }

    let num_docs = pending.len() as u64;
    tracing::info!(num_docs, num_terms = stats.len(), "ingested documents");

    let mut num_postings = 0usize;
    for (doc_id, counts) in &pending {
        let postings = counts
            .iter()
            .map(|(token, frequency)| -> Result<Posting> {
                let compressed = stats.compressed(token).with_context(|| format!("no stats for token {token:?}"))?;
                Ok(Posting {
                    token: compressed.to_vec(),
                    doc_id: *doc_id,
                    frequency,
                    tf: tf(frequency, counts.doc_length()),
                    idf: idf(num_docs, stats.df(token)),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        num_postings += postings.len();
        batch.insert_postings(&postings)?;
    }

    batch.set_metadata(DOC_COUNT_KEY, &num_docs.to_string())?;
    let built_at = time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
    batch.set_metadata(BUILT_AT_KEY, &built_at)?;
    batch.commit()?;

    let summary = IndexSummary { documents: num_docs, terms: stats.len(), postings: num_postings };
    tracing::info!(?summary, "index build complete");
    Ok(summary)
}

/// Load a directory of `{"url": .., "content": ..}` JSON files into the document store.
/// Files that cannot be read or parsed are logged and skipped.
pub fn import_json_dir(input: &Path, docs: &DocumentStore) -> Result<usize> {
    let mut imported = 0usize;
    for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
        let p = entry.path();
        if !p.is_file() || p.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        let parsed = fs::read_to_string(p)
            .map_err(anyhow::Error::from)
            .and_then(|text| serde_json::from_str::<StoredDocument>(&text).map_err(anyhow::Error::from));
        match parsed {
            Ok(doc) => {
                docs.put(&doc)?;
                imported += 1;
            }
            Err(err) => tracing::warn!(path = %p.display(), %err, "skipping unreadable document"),
        }
    }
    docs.flush()?;
    tracing::info!(imported, input = %input.display(), "import complete");
    Ok(imported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idf_is_never_negative() {
        for n in 0..20u64 {
            for df in 0..=(n as u32 + 5) {
                assert!(idf(n, df) >= 0.0, "idf({n}, {df}) negative");
            }
        }
        assert_eq!(idf(3, 3), 0.0);
        assert!((idf(3, 0) - 4f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn tf_handles_empty_documents() {
        assert_eq!(tf(0, 0), 0.0);
        assert_eq!(tf(2, 8), 0.25);
    }

    #[test]
    fn term_counts_default_to_zero() {
        let counts = TermCounts::from_tokens(vec!["rust".to_string(), "crab".to_string(), "rust".to_string()]);
        assert_eq!(counts.frequency("rust"), 2);
        assert_eq!(counts.frequency("python"), 0);
        assert_eq!(counts.doc_length(), 3);
    }

    #[test]
    fn df_counts_documents_not_occurrences() {
        let mut stats = TermStats::default();
        stats.observe(&TermCounts::from_tokens(vec!["a".into(), "a".into(), "b".into()])).unwrap();
        stats.observe(&TermCounts::from_tokens(vec!["a".into()])).unwrap();
        assert_eq!(stats.df("a"), 2);
        assert_eq!(stats.df("b"), 1);
        assert_eq!(stats.df("zzz"), 0);
        assert_eq!(stats.len(), 2);
    }
}

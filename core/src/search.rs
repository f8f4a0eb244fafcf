use crate::compress::compress_token;
use crate::query::{parse, Term};
use crate::store::IndexStore;
use crate::tokenizer::tokenize;
use crate::{DocId, SearchHit};
use anyhow::Result;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
struct Scored {
    url: String,
    score: f64,
}

type ScoreMap = HashMap<DocId, Scored>;

/// Run a boolean query against a built index and return `(url, score)` hits, best first.
///
/// Query syntax problems never surface here; see [`crate::query::parse`]. Only storage
/// errors do.
pub fn search_query(store: &IndexStore, raw: &str) -> Result<Vec<SearchHit>> {
    let query = parse(raw);
    let mut combined: Option<ScoreMap> = None;
    for group in &query.groups {
        let mut union = ScoreMap::new();
        for term in group {
            for (doc_id, s) in eval_term(store, term)? {
                union
                    .entry(doc_id)
                    .and_modify(|e| e.score += s.score)
                    .or_insert(s);
            }
        }
        combined = Some(match combined {
            None => union,
            Some(acc) => intersect(acc, union),
        });
        if combined.as_ref().is_some_and(|m| m.is_empty()) {
            break;
        }
    }

    let mut hits: Vec<SearchHit> = combined
        .unwrap_or_default()
        .into_values()
        .map(|s| SearchHit { url: s.url, score: s.score })
        .collect();
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    tracing::debug!(query = raw, hits = hits.len(), "search complete");
    Ok(hits)
}

fn intersect(acc: ScoreMap, mut other: ScoreMap) -> ScoreMap {
    acc.into_iter()
        .filter_map(|(doc_id, mut s)| {
            let o = other.remove(&doc_id)?;
            s.score += o.score;
            Some((doc_id, s))
        })
        .collect()
}

fn eval_term(store: &IndexStore, term: &Term) -> Result<ScoreMap> {
    match term {
        Term::Phrase(p) => phrase_scores(store, p),
        Term::Except(include, exclude) => {
            let mut scores = phrase_scores(store, include)?;
            if !scores.is_empty() {
                let excluded = matching_docs(store, exclude)?;
                scores.retain(|doc_id, _| !excluded.contains(doc_id));
            }
            Ok(scores)
        }
        Term::Not(exclude) => {
            let excluded = matching_docs(store, exclude)?;
            Ok(store
                .all_documents()?
                .into_iter()
                .filter(|d| !excluded.contains(&d.id))
                .map(|d| (d.id, Scored { url: d.url, score: 0.0 }))
                .collect())
        }
    }
}

/// Sum of `tf * idf` per document over every term of the phrase. Word order is ignored.
fn phrase_scores(store: &IndexStore, phrase: &str) -> Result<ScoreMap> {
    let mut scores = ScoreMap::new();
    for term in tokenize(phrase) {
        for p in store.postings(&compress_token(&term)?)? {
            let contrib = p.tfidf();
            scores
                .entry(p.doc_id)
                .or_insert_with(|| Scored { url: p.url, score: 0.0 })
                .score += contrib;
        }
    }
    Ok(scores)
}

/// Documents containing any term of the phrase, whatever their score.
fn matching_docs(store: &IndexStore, phrase: &str) -> Result<HashSet<DocId>> {
    let mut docs = HashSet::new();
    for term in tokenize(phrase) {
        docs.extend(store.postings(&compress_token(&term)?)?.into_iter().map(|p| p.doc_id));
    }
    Ok(docs)
}

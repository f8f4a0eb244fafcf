use sift_core::compress::{compress_token, decompress_token};
use sift_core::docstore::DocumentStore;
use sift_core::search::search_query;
use sift_core::store::IndexStore;
use sift_core::tokenizer::tokenize;
use sift_core::StoredDocument;
use sift_indexer::{build_index, import_json_dir};
use std::fs;

fn stem(word: &str) -> String { tokenize(word).remove(0) }

fn corpus() -> DocumentStore {
    let store = DocumentStore::temporary().unwrap();
    for (url, content) in [
        ("http://a/", "Rust crawler, rust!"),
        ("http://b/", "rust search engine"),
        ("http://c/", "the and of"),
    ] {
        store.put(&StoredDocument { url: url.into(), content: content.into() }).unwrap();
    }
    store
}

#[test]
fn build_scores_every_posting() {
    let docs = corpus();
    let mut index = IndexStore::open_in_memory().unwrap();
    let summary = build_index(&docs, &mut index).unwrap();
    assert_eq!(summary.documents, 3);
    assert_eq!(index.doc_count().unwrap(), 3);
    assert!(index.metadata("built_at").unwrap().is_some());

    let lengths: std::collections::HashMap<_, _> =
        index.all_documents().unwrap().into_iter().map(|d| (d.id, d.doc_length)).collect();
    let postings = index.all_postings().unwrap();
    assert_eq!(postings.len(), summary.postings);
    for p in &postings {
        let len = lengths[&p.doc_id];
        assert!(p.frequency >= 1);
        assert!(p.idf >= 0.0);
        assert!((p.tf - p.frequency as f64 / len as f64).abs() < 1e-12);
    }

    let crawler = compress_token(&stem("crawler")).unwrap();
    let p = postings.iter().find(|p| p.token == crawler).unwrap();
    assert_eq!(p.frequency, 1);
    assert!((p.tf - 1.0 / 3.0).abs() < 1e-12);
    assert!((p.idf - 2f64.ln()).abs() < 1e-12);

    let rust = compress_token(&stem("rust")).unwrap();
    let a_rust = postings.iter().find(|p| p.token == rust && p.frequency == 2).unwrap();
    assert!((a_rust.idf - (4.0f64 / 3.0).ln()).abs() < 1e-12);
}

#[test]
fn stored_tokens_decompress_to_tokenizer_output() {
    let docs = corpus();
    let mut index = IndexStore::open_in_memory().unwrap();
    build_index(&docs, &mut index).unwrap();
    let vocabulary: std::collections::HashSet<String> =
        docs.iter().flat_map(|d| tokenize(&d.unwrap().content)).collect();
    for p in index.all_postings().unwrap() {
        assert!(vocabulary.contains(&decompress_token(&p.token).unwrap()));
    }
}

#[test]
fn stopword_only_document_has_zero_length() {
    let docs = corpus();
    let mut index = IndexStore::open_in_memory().unwrap();
    build_index(&docs, &mut index).unwrap();
    let c = index.all_documents().unwrap().into_iter().find(|d| d.url == "http://c/").unwrap();
    assert_eq!(c.doc_length, 0);
    assert!(index.all_postings().unwrap().iter().all(|p| p.doc_id != c.id));
}

#[test]
fn ids_follow_store_order() {
    let docs = corpus();
    let mut index = IndexStore::open_in_memory().unwrap();
    build_index(&docs, &mut index).unwrap();
    let read_order: Vec<String> = docs.iter().map(|d| d.unwrap().url).collect();
    let id_order: Vec<String> = index.all_documents().unwrap().into_iter().map(|d| d.url).collect();
    assert_eq!(read_order, id_order);
}

#[test]
fn rebuilding_does_not_duplicate_postings() {
    let docs = corpus();
    let mut index = IndexStore::open_in_memory().unwrap();
    let first = build_index(&docs, &mut index).unwrap();
    let second = build_index(&docs, &mut index).unwrap();
    assert_eq!(first, second);
    assert_eq!(index.all_postings().unwrap().len(), first.postings);
    assert_eq!(index.all_documents().unwrap().len(), 3);
}

#[test]
fn empty_store_builds_empty_index() {
    let docs = DocumentStore::temporary().unwrap();
    let mut index = IndexStore::open_in_memory().unwrap();
    let summary = build_index(&docs, &mut index).unwrap();
    assert_eq!(summary.documents, 0);
    assert_eq!(index.doc_count().unwrap(), 0);
    assert!(search_query(&index, "rust").unwrap().is_empty());
}

#[test]
fn built_index_answers_queries() {
    let docs = corpus();
    let mut index = IndexStore::open_in_memory().unwrap();
    build_index(&docs, &mut index).unwrap();

    let hits = search_query(&index, "rust").unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].url, "http://a/");

    let hits = search_query(&index, "rust and crawler").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].url, "http://a/");

    let hits = search_query(&index, "rust not crawler").unwrap();
    assert_eq!(hits.iter().map(|h| h.url.as_str()).collect::<Vec<_>>(), vec!["http://b/"]);
}

#[test]
fn import_reads_json_documents_and_skips_garbage() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("one.json"), r#"{"url": "http://one/", "content": "first page"}"#).unwrap();
    fs::create_dir(dir.path().join("nested")).unwrap();
    fs::write(dir.path().join("nested/two.json"), r#"{"url": "http://two/", "content": "second page"}"#).unwrap();
    fs::write(dir.path().join("broken.json"), "{not json").unwrap();
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let docs = DocumentStore::temporary().unwrap();
    assert_eq!(import_json_dir(dir.path(), &docs).unwrap(), 2);
    assert_eq!(docs.get("http://two/").unwrap().unwrap().content, "second page");
    assert_eq!(docs.len(), 2);
}

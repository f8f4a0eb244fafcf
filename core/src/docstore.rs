use crate::StoredDocument;
use anyhow::{Context, Result};
use sha1::{Digest, Sha1};
use std::path::Path;

/// Raw crawled pages, one record per URL.
///
/// Cloning is cheap and every clone shares the same tree, so concurrent crawl tasks can
/// each hold a handle.
#[derive(Clone)]
pub struct DocumentStore {
    db: sled::Db,
}

/// Hex SHA-1 of the URL. Distinct URLs never share a key the way sanitized filenames can.
pub fn document_key(url: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl DocumentStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let db = sled::open(path).with_context(|| format!("opening document store at {}", path.display()))?;
        Ok(Self { db })
    }

    /// Store that lives only as long as the handle, for tests and dry runs.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open().context("opening temporary document store")?;
        Ok(Self { db })
    }

    /// Insert or replace the record for `doc.url`. Returns `true` if the URL was new.
    pub fn put(&self, doc: &StoredDocument) -> Result<bool> {
        let bytes = bincode::serialize(doc)?;
        let previous = self.db.insert(document_key(&doc.url), bytes)?;
        Ok(previous.is_none())
    }

    pub fn get(&self, url: &str) -> Result<Option<StoredDocument>> {
        match self.db.get(document_key(url))? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn contains(&self, url: &str) -> Result<bool> {
        Ok(self.db.contains_key(document_key(url))?)
    }

    pub fn len(&self) -> usize { self.db.len() }

    pub fn is_empty(&self) -> bool { self.db.is_empty() }

    /// All records in key order. A record that fails to decode is yielded as an error
    /// rather than silently skipped.
    pub fn iter(&self) -> impl Iterator<Item = Result<StoredDocument>> + '_ {
        self.db.iter().map(|entry| -> Result<StoredDocument> {
            let (key, bytes) = entry?;
            bincode::deserialize(&bytes)
                .with_context(|| format!("decoding document {}", String::from_utf8_lossy(&key)))
        })
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

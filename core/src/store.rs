use crate::{DocId, DocMeta, Posting, ScoredPosting};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Transaction};
use std::path::Path;

pub const DOC_COUNT_KEY: &str = "doc_count";
pub const BUILT_AT_KEY: &str = "built_at";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    doc_length INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS inverted_index (
    id INTEGER PRIMARY KEY,
    token BLOB NOT NULL,
    doc_id INTEGER NOT NULL REFERENCES documents (id),
    frequency INTEGER NOT NULL,
    tf REAL NOT NULL,
    idf REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS inverted_index_token ON inverted_index (token);
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

/// SQLite-backed inverted index: document rows, postings keyed by compressed token,
/// and a small metadata table.
pub struct IndexStore {
    conn: Connection,
}

impl IndexStore {
    /// Open (creating if needed) a writable store and make sure the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).with_context(|| format!("opening index store at {}", path.display()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Read-only handle for query serving. Any number of these may coexist with each
    /// other once a build has committed.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("opening index store read-only at {}", path.display()))?;
        Ok(Self { conn })
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA).context("creating index schema")?;
        Ok(Self { conn })
    }

    /// Start a clear-then-rebuild batch. Every table is emptied inside the returned
    /// transaction; nothing is visible to readers until [`IndexBatch::commit`], and
    /// dropping the batch rolls back to the previous index.
    pub fn rebuild(&mut self) -> Result<IndexBatch<'_>> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(
            "DELETE FROM inverted_index;
             DELETE FROM documents;
             DELETE FROM metadata;
             DELETE FROM sqlite_sequence WHERE name = 'documents';",
        )
        .context("clearing index tables")?;
        Ok(IndexBatch { tx })
    }

    pub fn metadata(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    /// Total document count recorded by the last build; 0 for an unbuilt store.
    pub fn doc_count(&self) -> Result<u64> {
        match self.metadata(DOC_COUNT_KEY)? {
            Some(v) => v.parse().with_context(|| format!("bad doc_count value {v:?}")),
            None => Ok(0),
        }
    }

    /// Postings for one token, joined with their document URL. `token` must already be
    /// compressed with [`crate::compress::compress_token`].
    pub fn postings(&self, token: &[u8]) -> Result<Vec<ScoredPosting>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT i.doc_id, d.url, i.tf, i.idf
             FROM inverted_index i
             JOIN documents d ON i.doc_id = d.id
             WHERE i.token = ?1",
        )?;
        let rows = stmt.query_map(params![token], |row| {
            Ok(ScoredPosting { doc_id: row.get(0)?, url: row.get(1)?, tf: row.get(2)?, idf: row.get(3)? })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn all_documents(&self) -> Result<Vec<DocMeta>> {
        let mut stmt = self.conn.prepare_cached("SELECT id, url, doc_length FROM documents ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(DocMeta { id: row.get(0)?, url: row.get(1)?, doc_length: row.get(2)? })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Every stored posting in insertion order.
    pub fn all_postings(&self) -> Result<Vec<Posting>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT token, doc_id, frequency, tf, idf FROM inverted_index ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Posting {
                token: row.get(0)?,
                doc_id: row.get(1)?,
                frequency: row.get(2)?,
                tf: row.get(3)?,
                idf: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

/// Writer half of a rebuild; see [`IndexStore::rebuild`].
pub struct IndexBatch<'a> {
    tx: Transaction<'a>,
}

impl IndexBatch<'_> {
    pub fn insert_document(&self, url: &str, doc_length: u32) -> Result<DocId> {
        self.tx
            .prepare_cached("INSERT INTO documents (url, doc_length) VALUES (?1, ?2)")?
            .execute(params![url, doc_length])?;
        Ok(self.tx.last_insert_rowid())
    }

    pub fn insert_postings(&self, postings: &[Posting]) -> Result<()> {
        let mut stmt = self.tx.prepare_cached(
            "INSERT INTO inverted_index (token, doc_id, frequency, tf, idf) VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for p in postings {
            stmt.execute(params![p.token, p.doc_id, p.frequency, p.tf, p.idf])?;
        }
        Ok(())
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.tx.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn commit(self) -> Result<()> {
        self.tx.commit().context("committing index build")?;
        Ok(())
    }
}

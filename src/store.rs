//! C4 (persistence half) — the SQLite-backed catalogue index.
//!
//! [`Index`] owns a single [`rusqlite::Connection`] and is `Send` but not
//! `Sync`: a caller wanting concurrent access opens one `Index` per thread
//! against the same WAL-mode database file rather than sharing a handle
//! behind a `Mutex`. SQLite's WAL journal is exactly the synchronization
//! primitive this is designed around.

use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::config::Config;
use crate::model::{Hash40, IngestMeta, Kind, RawPosting, Statistics, Work};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS works (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    kind TEXT NOT NULL,
    season INTEGER,
    episode_number INTEGER,
    source_path TEXT NOT NULL UNIQUE,
    posting_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS postings (
    hash TEXT NOT NULL,
    anchor_time INTEGER NOT NULL,
    work_id INTEGER NOT NULL REFERENCES works(id)
);
CREATE INDEX IF NOT EXISTS idx_postings_hash ON postings(hash);
CREATE TABLE IF NOT EXISTS catalogue_config (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("catalogue was built with a different configuration than the one supplied")]
    ConfigMismatch,
    #[error("index query returned inconsistent data: {0}")]
    IndexCorruption(String),
    #[error("no work with id {0}")]
    WorkNotFound(i64),
}

/// A single posting as stored, joined back with its owning work id.
pub struct StoredPosting {
    pub work_id: i64,
    pub anchor_time: u32,
}

pub struct Index {
    conn: Connection,
}

impl Index {
    /// Open (creating if absent) the catalogue at `path`, pinning `cfg`
    /// as the configuration every subsequent fingerprint must share.
    pub fn open(path: impl AsRef<Path>, cfg: &Config) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(SCHEMA)?;

        let index = Index { conn };
        index.pin_or_check_config(cfg)?;
        Ok(index)
    }

    /// Open an in-memory catalogue, useful for tests.
    pub fn open_in_memory(cfg: &Config) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        let index = Index { conn };
        index.pin_or_check_config(cfg)?;
        Ok(index)
    }

    fn pin_or_check_config(&self, cfg: &Config) -> Result<(), StoreError> {
        let stored: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM catalogue_config WHERE key = 'config'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        match stored {
            None => {
                let json = serde_json::to_string(cfg)
                    .map_err(|e| StoreError::IndexCorruption(e.to_string()))?;
                self.conn.execute(
                    "INSERT INTO catalogue_config (key, value) VALUES ('config', ?1)",
                    params![json],
                )?;
                Ok(())
            }
            Some(json) => {
                let stored_cfg: Config = serde_json::from_str(&json)
                    .map_err(|e| StoreError::IndexCorruption(e.to_string()))?;
                if &stored_cfg == cfg {
                    Ok(())
                } else {
                    Err(StoreError::ConfigMismatch)
                }
            }
        }
    }

    /// Insert a work and its postings. Idempotent per `source_path`: a
    /// repeat call with the same `source_path` returns the existing
    /// `work_id` without touching its postings. Atomic per work (one
    /// transaction spans the work row and its posting batch), not atomic
    /// across separate calls.
    pub fn ingest(
        &mut self,
        meta: &IngestMeta,
        postings: &[RawPosting],
    ) -> Result<i64, StoreError> {
        if let Some(existing) = self.find_work_by_source(&meta.source_path)? {
            return Ok(existing);
        }

        let tx = self.conn.transaction()?;
        let now = Utc::now();
        tx.execute(
            "INSERT INTO works (title, kind, season, episode_number, source_path, posting_count, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                meta.title,
                meta.kind.to_string(),
                meta.season,
                meta.episode_number,
                meta.source_path,
                postings.len() as i64,
                now.to_rfc3339(),
            ],
        )?;
        let work_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO postings (hash, anchor_time, work_id) VALUES (?1, ?2, ?3)",
            )?;
            for posting in postings {
                stmt.execute(params![posting.hash.0, posting.anchor_time, work_id])?;
            }
        }

        tx.commit()?;
        Ok(work_id)
    }

    fn find_work_by_source(&self, source_path: &str) -> Result<Option<i64>, StoreError> {
        self.conn
            .query_row(
                "SELECT id FROM works WHERE source_path = ?1",
                params![source_path],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::from)
    }

    /// Every posting on record for `hash`, across all works.
    pub fn postings_for_hash(&self, hash: &Hash40) -> Result<Vec<StoredPosting>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT work_id, anchor_time FROM postings WHERE hash = ?1")?;
        let rows = stmt.query_map(params![hash.0], |row| {
            Ok(StoredPosting {
                work_id: row.get(0)?,
                anchor_time: row.get(1)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    pub fn get_work(&self, work_id: i64) -> Result<Work, StoreError> {
        self.conn
            .query_row(
                "SELECT id, title, kind, season, episode_number, source_path, posting_count, created_at
                 FROM works WHERE id = ?1",
                params![work_id],
                row_to_work,
            )
            .optional()?
            .ok_or(StoreError::WorkNotFound(work_id))
    }

    pub fn statistics(&self) -> Result<Statistics, StoreError> {
        let total_works: u64 =
            self.conn.query_row("SELECT COUNT(*) FROM works", [], |r| r.get(0))?;
        let total_postings: u64 =
            self.conn.query_row("SELECT COUNT(*) FROM postings", [], |r| r.get(0))?;
        let movies: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM works WHERE kind = 'movie'",
            [],
            |r| r.get(0),
        )?;
        let episodes: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM works WHERE kind = 'episode'",
            [],
            |r| r.get(0),
        )?;
        Ok(Statistics {
            total_works,
            total_postings,
            movies,
            episodes,
        })
    }
}

fn row_to_work(row: &rusqlite::Row) -> rusqlite::Result<Work> {
    let kind_str: String = row.get(2)?;
    let kind: Kind = kind_str.parse().unwrap_or(Kind::Movie);
    let created_at_str: String = row.get(7)?;
    let created_at = chrono::DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());
    Ok(Work {
        id: row.get(0)?,
        title: row.get(1)?,
        kind,
        season: row.get(3)?,
        episode_number: row.get(4)?,
        source_path: row.get(5)?,
        posting_count: row.get::<_, i64>(6)? as u64,
        created_at,
    })
}

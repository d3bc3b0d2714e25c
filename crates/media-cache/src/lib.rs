//! Local store for pristine source bytes, keyed by delivery URL.
//!
//! The live preview path stages each source here once so that repeated
//! parameter changes re-render from disk instead of re-fetching from the
//! delivery network.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Time parse error: {0}")]
    Time(#[from] chrono::ParseError),

    #[error("Unsupported cache version: {0}")]
    UnsupportedVersion(i64),
}

pub type Result<T> = std::result::Result<T, CacheError>;

const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS cached_sources(
    url TEXT PRIMARY KEY,
    content_hash TEXT NOT NULL,
    local_path TEXT NOT NULL,
    fetched_at TEXT NOT NULL
);
"#;

/// Disk-backed source cache: bytes under a root directory, bookkeeping in
/// SQLite next to them.
#[derive(Debug)]
pub struct SourceCache {
    conn: Mutex<Connection>,
    root: PathBuf,
}

impl SourceCache {
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        let conn = Connection::open(root.join("sources.sqlite"))?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            root,
        })
    }

    /// Bookkeeping in memory, bytes under `root`. Test constructor.
    pub fn in_memory(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            root,
        })
    }

    /// Write the fetched bytes and record them; returns the local-path token.
    pub fn store(&self, url: &str, bytes: &[u8]) -> Result<PathBuf> {
        let content_hash = blake3::hash(bytes).to_hex().to_string();
        let local_path = self.root.join(format!("{}.bin", blake3::hash(url.as_bytes()).to_hex()));
        fs::write(&local_path, bytes)?;

        let conn = self.conn.lock().expect("cache mutex poisoned");
        conn.execute(
            "INSERT INTO cached_sources (url, content_hash, local_path, fetched_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(url) DO UPDATE SET
                content_hash = excluded.content_hash,
                local_path = excluded.local_path,
                fetched_at = excluded.fetched_at",
            params![
                url,
                content_hash,
                local_path.to_string_lossy(),
                to_rfc3339(Utc::now())
            ],
        )?;
        debug!("cached source {} ({} bytes)", url, bytes.len());
        Ok(local_path)
    }

    /// Cached-local-path token for a URL, if the bytes are still on disk.
    /// Rows whose file vanished are dropped on sight.
    pub fn lookup(&self, url: &str) -> Result<Option<PathBuf>> {
        let conn = self.conn.lock().expect("cache mutex poisoned");
        let found: Option<String> = conn
            .query_row(
                "SELECT local_path FROM cached_sources WHERE url = ?1",
                params![url],
                |row| row.get(0),
            )
            .optional()?;

        match found {
            Some(raw) => {
                let path = PathBuf::from(raw);
                if path.exists() {
                    Ok(Some(path))
                } else {
                    conn.execute("DELETE FROM cached_sources WHERE url = ?1", params![url])?;
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }

    /// Delete entries fetched before `now - max_age`; returns how many went.
    pub fn prune_older_than(&self, max_age: Duration) -> Result<usize> {
        let cutoff = Utc::now() - max_age;
        let conn = self.conn.lock().expect("cache mutex poisoned");

        let mut stmt = conn.prepare(
            "SELECT url, local_path FROM cached_sources WHERE fetched_at < ?1",
        )?;
        let stale: Vec<(String, String)> = stmt
            .query_map(params![to_rfc3339(cutoff)], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<rusqlite::Result<_>>()?;
        drop(stmt);

        for (url, local_path) in &stale {
            let _ = fs::remove_file(local_path);
            conn.execute("DELETE FROM cached_sources WHERE url = ?1", params![url])?;
        }
        Ok(stale.len())
    }
}

fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    match version {
        0 => {
            conn.execute_batch(SCHEMA_V1)?;
            conn.execute("PRAGMA user_version = 1", [])?;
        }
        1 => {}
        v => return Err(CacheError::UnsupportedVersion(v)),
    }
    Ok(())
}

pub fn to_rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

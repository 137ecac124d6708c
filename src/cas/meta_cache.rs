// rinne is a snapshot-based history manager for project trees
// Copyright (C) 2025
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};

/// A row read back from the cache for the unchanged-file fast path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedFile {
    pub size: u64,
    pub mtime_ticks: i64,
    pub file_hash: String,
    pub chunk_hashes: Vec<String>,
    pub snapshot_file_hash: String,
    pub updated_at_ticks: i64,
}

#[derive(Debug, Clone)]
struct StagedRow {
    size: u64,
    mtime_ticks: i64,
    file_hash: String,
    chunk_hashes: Vec<Option<String>>,
    snapshot_file_hash: String,
    updated_at_ticks: i64,
}

/// Persistent per-space cache of `(path, size, mtime) -> (fileHash,
/// chunkHashes)`, backed by SQLite. Staged writes accumulate in memory
/// under a mutex (safe for parallel compact workers) and are upserted in
/// one transaction on `commit_staged`.
pub struct FileMetaCache {
    conn: Mutex<Connection>,
    staged: Mutex<HashMap<String, StagedRow>>,
}

impl FileMetaCache {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(db_path)
            .with_context(|| format!("failed to open file meta cache at {}", db_path.display()))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS file_meta (
                path               TEXT PRIMARY KEY,
                size               INTEGER NOT NULL,
                mtime_ticks        INTEGER NOT NULL,
                file_hash          TEXT NOT NULL,
                chunk_hashes       TEXT NOT NULL,
                snapshot_file_hash TEXT NOT NULL,
                updated_at_ticks   INTEGER NOT NULL
            )",
            [],
        )
        .context("failed to create file_meta table")?;

        Ok(Self {
            conn: Mutex::new(conn),
            staged: Mutex::new(HashMap::new()),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory cache")?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS file_meta (
                path               TEXT PRIMARY KEY,
                size               INTEGER NOT NULL,
                mtime_ticks        INTEGER NOT NULL,
                file_hash          TEXT NOT NULL,
                chunk_hashes       TEXT NOT NULL,
                snapshot_file_hash TEXT NOT NULL,
                updated_at_ticks   INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            staged: Mutex::new(HashMap::new()),
        })
    }

    /// Looks up a committed row by repo-relative path.
    pub fn try_get(&self, path: &str) -> Result<Option<CachedFile>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT size, mtime_ticks, file_hash, chunk_hashes, snapshot_file_hash, updated_at_ticks
             FROM file_meta WHERE path = ?1",
            params![path],
            |row| {
                let chunk_hashes_json: String = row.get(3)?;
                Ok(CachedFile {
                    size: row.get::<_, i64>(0)? as u64,
                    mtime_ticks: row.get(1)?,
                    file_hash: row.get(2)?,
                    chunk_hashes: serde_json::from_str(&chunk_hashes_json).unwrap_or_default(),
                    snapshot_file_hash: row.get(4)?,
                    updated_at_ticks: row.get(5)?,
                })
            },
        )
        .optional()
        .context("failed to query file meta cache")
    }

    /// Buffers a pending row in memory; not visible via `try_get` until
    /// `commit_staged` runs.
    pub fn stage(
        &self,
        path: &str,
        size: u64,
        mtime_ticks: i64,
        file_hash: &str,
        chunk_count: usize,
        snapshot_file_hash: &str,
        updated_at_ticks: i64,
    ) {
        self.staged.lock().insert(
            path.to_string(),
            StagedRow {
                size,
                mtime_ticks,
                file_hash: file_hash.to_string(),
                chunk_hashes: vec![None; chunk_count],
                snapshot_file_hash: snapshot_file_hash.to_string(),
                updated_at_ticks,
            },
        );
    }

    /// Fills in one chunk hash of a staged row, for streaming completion of
    /// a file's chunk list as chunking/storing proceeds.
    pub fn set_staged_chunk_hash(&self, path: &str, index: usize, hash: &str) {
        let mut staged = self.staged.lock();
        if let Some(row) = staged.get_mut(path) {
            if index < row.chunk_hashes.len() {
                row.chunk_hashes[index] = Some(hash.to_string());
            }
        }
    }

    /// Upserts every staged row in a single transaction, then clears the
    /// staging map. Rows with an incomplete chunk list (a chunk hash never
    /// set) are skipped — they are not a safe fast-path candidate.
    pub fn commit_staged(&self) -> Result<usize> {
        let mut staged = self.staged.lock();
        if staged.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction().context("failed to begin cache transaction")?;
        let mut committed = 0;
        for (path, row) in staged.drain() {
            if row.chunk_hashes.iter().any(Option::is_none) {
                continue;
            }
            let chunk_hashes: Vec<&str> = row
                .chunk_hashes
                .iter()
                .map(|h| h.as_deref().unwrap())
                .collect();
            let chunk_hashes_json = serde_json::to_string(&chunk_hashes)?;
            tx.execute(
                "INSERT INTO file_meta
                    (path, size, mtime_ticks, file_hash, chunk_hashes, snapshot_file_hash, updated_at_ticks)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(path) DO UPDATE SET
                    size = excluded.size,
                    mtime_ticks = excluded.mtime_ticks,
                    file_hash = excluded.file_hash,
                    chunk_hashes = excluded.chunk_hashes,
                    snapshot_file_hash = excluded.snapshot_file_hash,
                    updated_at_ticks = excluded.updated_at_ticks",
                params![
                    path,
                    row.size as i64,
                    row.mtime_ticks,
                    row.file_hash,
                    chunk_hashes_json,
                    row.snapshot_file_hash,
                    row.updated_at_ticks,
                ],
            )?;
            committed += 1;
        }
        tx.commit().context("failed to commit cache transaction")?;
        Ok(committed)
    }

    /// Drops a row without committing, used when a cache hit turns out to
    /// be stale (e.g. a referenced blob is missing).
    pub fn invalidate(&self, path: &str) -> Result<()> {
        self.conn
            .lock()
            .execute("DELETE FROM file_meta WHERE path = ?1", params![path])
            .context("failed to invalidate file meta cache row")?;
        Ok(())
    }

    /// Deletes rows older than `min_updated_at_ticks` whose path is not in
    /// `alive_paths`. Advisory only — a deleted row only costs a rehash.
    pub fn garbage_collect(
        &self,
        alive_paths: &std::collections::HashSet<String>,
        min_updated_at_ticks: i64,
    ) -> Result<usize> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT path, updated_at_ticks FROM file_meta")?;
        let rows: Vec<(String, i64)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<_>>()?;

        let mut deleted = 0;
        for (path, updated_at) in rows {
            if updated_at < min_updated_at_ticks && !alive_paths.contains(&path) {
                conn.execute("DELETE FROM file_meta WHERE path = ?1", params![path])?;
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

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

pub mod zip_backend;

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::atomic_file;
use crate::hashing::hash_bytes_lower;
use crate::layout::PathLayout;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IgnoreRef {
    pub source: String,
    pub rules: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainFields {
    #[serde(rename = "prevId")]
    pub prev_id: Option<String>,
    pub prev: Option<String>,
    #[serde(rename = "this")]
    pub this: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HashRecord {
    pub algo: String,
    pub zip: String,
    pub chain: ChainFields,
}

/// One space's per-snapshot metadata row, including the linked hash chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainRecord {
    pub schema: u32,
    pub id: String,
    pub seq: u32,
    pub utc: DateTime<Utc>,
    pub space: String,
    pub zip: String,
    pub message: String,
    pub ignore: IgnoreRef,
    pub hash: HashRecord,
}

impl ChainRecord {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read chain record {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("failed to parse chain record {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        atomic_file::write_bytes(path, json.as_bytes(), true)
    }
}

fn chain_this(prev: &str, utc: &DateTime<Utc>, id: &str, zip_hash: &str) -> String {
    let utc_str = utc.to_rfc3339();
    let mut joined = Vec::new();
    joined.extend_from_slice(prev.as_bytes());
    joined.push(0u8);
    joined.extend_from_slice(utc_str.as_bytes());
    joined.push(0u8);
    joined.extend_from_slice(id.as_bytes());
    joined.push(0u8);
    joined.extend_from_slice(zip_hash.as_bytes());
    hash_bytes_lower(&joined)
}

/// Appends a new chain record for sequence `seq` in `space`, computing the
/// chain hash from the previous record (or treating `prev` as empty for
/// `seq == 1`).
pub struct ChainMeta {
    layout: PathLayout,
}

impl ChainMeta {
    pub fn new(layout: PathLayout) -> Self {
        Self { layout }
    }

    fn record_path(&self, space: &str, id: &str) -> std::path::PathBuf {
        self.layout.zip_meta_dir(space).join(format!("{id}.json"))
    }

    /// Loads every record for `space`, sorted by `seq` ascending.
    pub fn load_chain(&self, space: &str) -> Result<Vec<ChainRecord>> {
        let dir = self.layout.zip_meta_dir(space);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for entry in std::fs::read_dir(&dir)
            .with_context(|| format!("failed to read {}", dir.display()))?
        {
            let entry = entry?;
            if entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            records.push(ChainRecord::load(&entry.path())?);
        }
        records.sort_by_key(|r| r.seq);
        Ok(records)
    }

    pub fn append(
        &self,
        space: &str,
        id: &str,
        seq: u32,
        utc: DateTime<Utc>,
        zip_hash: String,
        message: String,
        ignore: IgnoreRef,
    ) -> Result<ChainRecord> {
        let chain = self.load_chain(space)?;
        let previous = chain.last();
        let prev_this = previous.map(|r| r.hash.chain.this.clone()).unwrap_or_default();
        let prev_id = previous.map(|r| r.id.clone());

        let this = chain_this(&prev_this, &utc, id, &zip_hash);

        let record = ChainRecord {
            schema: 1,
            id: id.to_string(),
            seq,
            utc,
            space: space.to_string(),
            zip: format!("{id}.zip"),
            message,
            ignore,
            hash: HashRecord {
                algo: "SHA256".to_string(),
                zip: zip_hash,
                chain: ChainFields {
                    prev_id,
                    prev: if prev_this.is_empty() {
                        None
                    } else {
                        Some(prev_this)
                    },
                    this,
                },
            },
        };

        record.save(&self.record_path(space, id))?;
        Ok(record)
    }
}

/// One mismatch found during verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyDetail {
    pub id: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct VerifyReport {
    pub target: String,
    pub is_ok: bool,
    pub summary: String,
    pub details: Vec<VerifyDetail>,
}

/// Walks the chain in `seq` order, recomputing `this` from each record's
/// fields and the previous record's `this`, and recomputing `zipHash` from
/// the archive on disk. Every mismatch becomes one detail line; a mismatch
/// never aborts the walk.
pub fn verify_chain(layout: &PathLayout, space: &str) -> Result<VerifyReport> {
    let meta = ChainMeta::new(layout.clone());
    let chain = meta.load_chain(space)?;

    let mut details = Vec::new();
    let mut prev_this = String::new();

    for record in &chain {
        let expected_this = chain_this(&prev_this, &record.utc, &record.id, &record.hash.zip);
        if expected_this != record.hash.chain.this {
            details.push(VerifyDetail {
                id: record.id.clone(),
                message: format!(
                    "chain hash mismatch: expected {expected_this}, recorded {}",
                    record.hash.chain.this
                ),
            });
        }

        let recorded_prev = record.hash.chain.prev.clone().unwrap_or_default();
        if recorded_prev != prev_this {
            details.push(VerifyDetail {
                id: record.id.clone(),
                message: "chain.prev does not match the previous record's chain.this".to_string(),
            });
        }

        let zip_path = layout.zip_backend_space_dir(space).join(&record.zip);
        if zip_path.is_file() {
            match std::fs::read(&zip_path) {
                Ok(bytes) => {
                    let actual_zip_hash = hash_bytes_lower(&bytes);
                    if actual_zip_hash != record.hash.zip {
                        details.push(VerifyDetail {
                            id: record.id.clone(),
                            message: format!(
                                "zip hash mismatch: expected {}, archive hashes to {actual_zip_hash}",
                                record.hash.zip
                            ),
                        });
                    }
                }
                Err(e) => details.push(VerifyDetail {
                    id: record.id.clone(),
                    message: format!("failed to read archive: {e}"),
                }),
            }
        } else {
            details.push(VerifyDetail {
                id: record.id.clone(),
                message: format!("archive missing: {}", zip_path.display()),
            });
        }

        prev_this = record.hash.chain.this.clone();
    }

    let is_ok = details.is_empty();
    let summary = if is_ok {
        format!("chain for space '{space}' verified ok ({} records)", chain.len())
    } else {
        format!(
            "chain for space '{space}' has {} mismatch(es) across {} records",
            details.len(),
            chain.len()
        )
    };

    Ok(VerifyReport {
        target: space.to_string(),
        is_ok,
        summary,
        details,
    })
}

/// Recomputes the chain hashes over the retained records (after a
/// deletion), preserving id/utc/zipHash and only overwriting the chain
/// fields. Idempotent: running it twice in a row is a no-op.
pub fn restitch_chain(layout: &PathLayout, space: &str) -> Result<usize> {
    let meta = ChainMeta::new(layout.clone());
    let mut chain = meta.load_chain(space)?;
    chain.sort_by_key(|r| r.seq);

    let mut rewritten = 0;
    let mut prev_this = String::new();
    let mut prev_id: Option<String> = None;

    for record in &mut chain {
        let new_this = chain_this(&prev_this, &record.utc, &record.id, &record.hash.zip);
        let new_prev = if prev_this.is_empty() {
            None
        } else {
            Some(prev_this.clone())
        };

        if record.hash.chain.this != new_this
            || record.hash.chain.prev != new_prev
            || record.hash.chain.prev_id != prev_id
        {
            record.hash.chain.this = new_this.clone();
            record.hash.chain.prev = new_prev;
            record.hash.chain.prev_id = prev_id.clone();
            record.save(&meta.record_path(space, &record.id))?;
            rewritten += 1;
        }

        prev_this = new_this;
        prev_id = Some(record.id.clone());
    }

    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ignore_ref() -> IgnoreRef {
        IgnoreRef {
            source: ".rinneignore".to_string(),
            rules: vec![],
        }
    }

    #[test]
    fn first_record_has_empty_prev() {
        let dir = tempfile::tempdir().unwrap();
        let layout = PathLayout::new(dir.path());
        let meta = ChainMeta::new(layout);
        let utc = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let record = meta
            .append("main", "00000001_x", 1, utc, "ziphash1".to_string(), "".to_string(), ignore_ref())
            .unwrap();
        assert!(record.hash.chain.prev.is_none());
    }

    #[test]
    fn chain_links_across_three_saves() {
        let dir = tempfile::tempdir().unwrap();
        let layout = PathLayout::new(dir.path());
        let meta = ChainMeta::new(layout.clone());
        let utc = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        let r1 = meta
            .append("main", "id1", 1, utc, "h1".to_string(), "".to_string(), ignore_ref())
            .unwrap();
        let r2 = meta
            .append("main", "id2", 2, utc, "h2".to_string(), "".to_string(), ignore_ref())
            .unwrap();
        let r3 = meta
            .append("main", "id3", 3, utc, "h3".to_string(), "".to_string(), ignore_ref())
            .unwrap();

        assert_eq!(r2.hash.chain.prev.as_deref(), Some(r1.hash.chain.this.as_str()));
        assert_eq!(r3.hash.chain.prev.as_deref(), Some(r2.hash.chain.this.as_str()));
    }

    #[test]
    fn restitch_after_deleting_last_record_leaves_earlier_records_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let layout = PathLayout::new(dir.path());
        let meta = ChainMeta::new(layout.clone());
        let utc = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        meta.append("main", "id1", 1, utc, "h1".to_string(), "".to_string(), ignore_ref())
            .unwrap();
        meta.append("main", "id2", 2, utc, "h2".to_string(), "".to_string(), ignore_ref())
            .unwrap();
        meta.append("main", "id3", 3, utc, "h3".to_string(), "".to_string(), ignore_ref())
            .unwrap();

        let path1 = meta.record_path("main", "id1");
        let path2 = meta.record_path("main", "id2");
        let before1 = std::fs::read_to_string(&path1).unwrap();
        let before2 = std::fs::read_to_string(&path2).unwrap();

        std::fs::remove_file(meta.record_path("main", "id3")).unwrap();

        restitch_chain(&layout, "main").unwrap();

        let after1 = std::fs::read_to_string(&path1).unwrap();
        let after2 = std::fs::read_to_string(&path2).unwrap();
        assert_eq!(before1, after1);
        assert_eq!(before2, after2);
    }

    #[test]
    fn restitch_twice_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let layout = PathLayout::new(dir.path());
        let meta = ChainMeta::new(layout.clone());
        let utc = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        meta.append("main", "id1", 1, utc, "h1".to_string(), "".to_string(), ignore_ref())
            .unwrap();

        // Remove the record and re-add it out of band to simulate a
        // deletion needing restitch (prev_id/prev fields stale).
        let path = meta.record_path("main", "id1");
        let mut record = ChainRecord::load(&path).unwrap();
        record.hash.chain.prev_id = Some("stale".to_string());
        record.save(&path).unwrap();

        let first = restitch_chain(&layout, "main").unwrap();
        assert_eq!(first, 1);
        let second = restitch_chain(&layout, "main").unwrap();
        assert_eq!(second, 0);
    }
}

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

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::atomic_file;

/// A CAS-backend snapshot's `meta.json`: stable field names, independent of
/// whether the snapshot currently holds a materialised payload, a manifest,
/// or both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotMeta {
    pub v: u32,
    #[serde(rename = "hashAlg")]
    pub hash_alg: String,
    #[serde(rename = "snapshotHash")]
    pub snapshot_hash: String,
    #[serde(rename = "fileCount")]
    pub file_count: u64,
    #[serde(rename = "totalBytes")]
    pub total_bytes: u64,
}

impl SnapshotMeta {
    pub fn new(snapshot_hash: String, file_count: u64, total_bytes: u64) -> Self {
        Self {
            v: 1,
            hash_alg: "sha256".to_string(),
            snapshot_hash,
            file_count,
            total_bytes,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot meta {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("failed to parse snapshot meta {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize snapshot meta")?;
        atomic_file::write_bytes(path, json.as_bytes(), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");
        let meta = SnapshotMeta::new("deadbeef".to_string(), 3, 42);
        meta.save(&path).unwrap();
        let loaded = SnapshotMeta::load(&path).unwrap();
        assert_eq!(meta, loaded);
    }

    #[test]
    fn field_names_match_the_external_contract() {
        let meta = SnapshotMeta::new("abc".to_string(), 1, 2);
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"hashAlg\":\"sha256\""));
        assert!(json.contains("\"snapshotHash\":\"abc\""));
        assert!(json.contains("\"fileCount\":1"));
        assert!(json.contains("\"totalBytes\":2"));
    }
}

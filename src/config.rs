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
use crate::chunker::ChunkerParams;
use crate::global::defaults;

/// Repository-wide settings chosen once at `init` and reloaded on every
/// later command. Nothing here is negotiable per-invocation: changing the
/// chunking or directory-depth parameters after data has been written would
/// silently desynchronise content addressing, so they live here instead of
/// as CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RepoConfig {
    pub avg_chunk_size: u64,
    pub min_chunk_size: u64,
    pub max_chunk_size: u64,
    pub zstd_level: i32,
    pub directory_depth: usize,
    pub workers: usize,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            avg_chunk_size: defaults::AVG_CHUNK_SIZE,
            min_chunk_size: defaults::MIN_CHUNK_SIZE,
            max_chunk_size: defaults::MAX_CHUNK_SIZE,
            zstd_level: defaults::DEFAULT_ZSTD_LEVEL,
            directory_depth: defaults::DEFAULT_DIRECTORY_DEPTH,
            workers: defaults::DEFAULT_WORKERS,
        }
    }
}

impl RepoConfig {
    pub fn chunker_params(&self) -> Result<ChunkerParams> {
        ChunkerParams::new(self.avg_chunk_size, self.min_chunk_size, self.max_chunk_size)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read repository config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("failed to parse repository config {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize repository config")?;
        atomic_file::write_bytes(path, json.as_bytes(), true)
    }
}

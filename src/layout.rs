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

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::global::SnapshotId;

pub const RINNE_DIR: &str = ".rinne";
pub const RINNEIGNORE_FILE: &str = ".rinneignore";
const DEFAULT_SPACE: &str = "main";

const WINDOWS_RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Pure, value-typed mapping from logical entities (repo, space, snapshot id,
/// manifest) to on-disk paths. Never touches the filesystem itself except to
/// read the single-line `current` space-selector file.
#[derive(Debug, Clone)]
pub struct PathLayout {
    root: PathBuf,
}

impl PathLayout {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            root: repo_root.into(),
        }
    }

    pub fn repo_root(&self) -> &Path {
        &self.root
    }

    pub fn rinne_dir(&self) -> PathBuf {
        self.root.join(RINNE_DIR)
    }

    pub fn rinneignore_file(&self) -> PathBuf {
        self.root.join(RINNEIGNORE_FILE)
    }

    pub fn config_dir(&self) -> PathBuf {
        self.rinne_dir().join("config")
    }

    pub fn repo_config_file(&self) -> PathBuf {
        self.config_dir().join("repo.json")
    }

    pub fn version_file(&self) -> PathBuf {
        self.config_dir().join("version.txt")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.rinne_dir().join("logs")
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.rinne_dir().join("temp")
    }

    pub fn current_space_file(&self) -> PathBuf {
        self.rinne_dir().join("snapshots").join("current")
    }

    pub fn space_dir(&self, space: &str) -> PathBuf {
        self.rinne_dir()
            .join("snapshots")
            .join("space")
            .join(sanitize_space_name(space))
    }

    pub fn snapshot_dir(&self, space: &str, id: &SnapshotId) -> PathBuf {
        self.space_dir(space).join(id.to_string())
    }

    pub fn snapshot_meta_file(&self, space: &str, id: &SnapshotId) -> PathBuf {
        self.snapshot_dir(space, id).join("meta.json")
    }

    pub fn snapshot_note_file(&self, space: &str, id: &SnapshotId) -> PathBuf {
        self.snapshot_dir(space, id).join("note.md")
    }

    pub fn snapshot_payload_dir(&self, space: &str, id: &SnapshotId) -> PathBuf {
        self.snapshot_dir(space, id).join("snapshots")
    }

    pub fn store_dir(&self) -> PathBuf {
        self.rinne_dir().join("store")
    }

    pub fn store_meta_dir(&self) -> PathBuf {
        self.store_dir().join(".meta")
    }

    pub fn refcount_file(&self) -> PathBuf {
        self.store_meta_dir().join("refcount.json")
    }

    pub fn store_tmp_dir(&self) -> PathBuf {
        self.store_dir().join(".tmp")
    }

    pub fn manifests_dir(&self) -> PathBuf {
        self.store_dir().join("manifests")
    }

    pub fn manifest_file(&self, id: &SnapshotId) -> PathBuf {
        self.manifests_dir().join(format!("{id}.json"))
    }

    /// Blob path under the store, sharded by the first `directory_depth`
    /// hex-digit pairs of the SHA-256 hex digest.
    pub fn blob_path(&self, hash_hex: &str, directory_depth: usize) -> PathBuf {
        let mut dir = self.store_dir();
        let mut chars = hash_hex.chars();
        for _ in 0..directory_depth {
            let pair: String = (&mut chars).take(2).collect();
            if pair.is_empty() {
                break;
            }
            dir = dir.join(pair);
        }
        dir.join(format!("{hash_hex}.zst"))
    }

    pub fn zip_backend_space_dir(&self, space: &str) -> PathBuf {
        self.rinne_dir()
            .join("data")
            .join(sanitize_space_name(space))
    }

    pub fn zip_file(&self, space: &str, id: &SnapshotId) -> PathBuf {
        self.zip_backend_space_dir(space).join(format!("{id}.zip"))
    }

    pub fn zip_meta_dir(&self, space: &str) -> PathBuf {
        self.zip_backend_space_dir(space).join("meta")
    }

    pub fn zip_meta_file(&self, space: &str, id: &SnapshotId) -> PathBuf {
        self.zip_meta_dir(space).join(format!("{id}.json"))
    }

    /// Resolves the active space: caller-supplied name if given, else the
    /// contents of the `current` file, else the default space.
    pub fn resolve_space(&self, requested: Option<&str>) -> Result<String> {
        if let Some(name) = requested {
            return Ok(sanitize_space_name(name));
        }

        let current_file = self.current_space_file();
        if current_file.is_file() {
            let contents = std::fs::read_to_string(&current_file)?;
            let line = contents.lines().next().unwrap_or("").trim();
            if !line.is_empty() {
                return Ok(sanitize_space_name(line));
            }
        }

        Ok(DEFAULT_SPACE.to_string())
    }
}

/// Sanitises a space name: trims, replaces path separators and invalid
/// filename characters with `-`, strips control characters, guards against
/// Windows reserved device names, and falls back to `main` for empty input.
pub fn sanitize_space_name(name: &str) -> String {
    let trimmed = name.trim();

    let mut sanitized: String = trimmed
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            other => other,
        })
        .collect();

    if sanitized.chars().all(|c| c == '.') {
        sanitized.clear();
    }

    if sanitized.is_empty() {
        return DEFAULT_SPACE.to_string();
    }

    let upper = sanitized.to_ascii_uppercase();
    let base = upper.split('.').next().unwrap_or(&upper);
    if WINDOWS_RESERVED_NAMES.contains(&base) {
        sanitized = format!("_{sanitized}");
    }

    sanitized
}

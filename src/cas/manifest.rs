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

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chunker::ChunkerParams;
use crate::error::RinneError;

pub const MANIFEST_VERSION: &str = "cas:2";

/// One file's record within a manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileEntry {
    #[serde(rename = "RelativePath")]
    pub relative_path: String,
    #[serde(rename = "Bytes", deserialize_with = "de_numeric")]
    pub bytes: u64,
    #[serde(rename = "ChunkHashes")]
    pub chunk_hashes: Vec<String>,
}

/// Serialisable record of a snapshot's files, dirs, chunk plan, and overall
/// hash. Field order matches §6's external interface exactly and is
/// preserved on serialisation because `serde_json` emits struct fields in
/// declaration order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Root")]
    pub root: String,
    #[serde(rename = "OriginalSha256")]
    pub original_sha256: String,
    #[serde(rename = "TotalBytes", deserialize_with = "de_numeric")]
    pub total_bytes: u64,
    #[serde(rename = "AvgSizeBytes", deserialize_with = "de_numeric")]
    pub avg_size_bytes: u64,
    #[serde(rename = "MinSizeBytes", deserialize_with = "de_numeric")]
    pub min_size_bytes: u64,
    #[serde(rename = "MaxSizeBytes", deserialize_with = "de_numeric")]
    pub max_size_bytes: u64,
    #[serde(rename = "Level", deserialize_with = "de_numeric_i32")]
    pub level: i32,
    #[serde(rename = "FileCount", deserialize_with = "de_numeric")]
    pub file_count: u64,
    #[serde(rename = "Files")]
    pub files: Vec<FileEntry>,
    #[serde(rename = "Dirs")]
    pub dirs: Vec<String>,
}

/// Accepts a JSON number or a numeric string, per §4.8.
fn de_numeric<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| serde::de::Error::custom("expected non-negative integer")),
        Value::String(s) => s.parse::<u64>().map_err(serde::de::Error::custom),
        other => Err(serde::de::Error::custom(format!(
            "expected number or numeric string, got {other}"
        ))),
    }
}

/// Same as `de_numeric` but for the signed `Level` field.
fn de_numeric_i32<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| serde::de::Error::custom("expected integer in range")),
        Value::String(s) => s.parse::<i32>().map_err(serde::de::Error::custom),
        other => Err(serde::de::Error::custom(format!(
            "expected number or numeric string, got {other}"
        ))),
    }
}

impl Manifest {
    pub fn new(
        root: String,
        original_sha256: String,
        params: ChunkerParams,
        level: i32,
        files: Vec<FileEntry>,
        dirs: Vec<String>,
    ) -> Self {
        let total_bytes = files.iter().map(|f| f.bytes).sum();
        let file_count = files.len() as u64;
        Manifest {
            version: MANIFEST_VERSION.to_string(),
            root,
            original_sha256,
            total_bytes,
            avg_size_bytes: params.avg_size,
            min_size_bytes: params.min_size,
            max_size_bytes: params.max_size,
            level,
            file_count,
            files,
            dirs,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize manifest")
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let manifest: Manifest =
            serde_json::from_str(text).context("failed to parse manifest JSON")?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        Self::from_json(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.version != MANIFEST_VERSION {
            bail!(RinneError::Corrupt(format!(
                "unsupported manifest version '{}', expected '{MANIFEST_VERSION}'",
                self.version
            )));
        }
        for entry in &self.files {
            if entry.relative_path.starts_with('/') {
                bail!(RinneError::Corrupt(format!(
                    "manifest file path '{}' must not start with '/'",
                    entry.relative_path
                )));
            }
            if entry
                .relative_path
                .split('/')
                .any(|segment| segment == "." || segment == "..")
            {
                bail!(RinneError::Corrupt(format!(
                    "manifest file path '{}' contains '.' or '..' segments",
                    entry.relative_path
                )));
            }
        }
        Ok(())
    }

    /// Builds the filtered projection used by partial restore: retains only
    /// files/dirs selected by `selectors` (a file is selected when its path
    /// equals a selector or starts with `selector + "/"`; dirs include all
    /// ancestors of selected files). Recomputes `file_count`/`total_bytes`
    /// but keeps `root` and the chunker parameters from the source manifest.
    pub fn filtered(&self, selectors: &[String]) -> Manifest {
        if selectors.is_empty() {
            return self.clone();
        }

        let files: Vec<FileEntry> = self
            .files
            .iter()
            .filter(|f| is_selected(&f.relative_path, selectors))
            .cloned()
            .collect();

        let mut dirs: BTreeSet<String> = self
            .dirs
            .iter()
            .filter(|d| is_selected(d, selectors))
            .cloned()
            .collect();

        for file in &files {
            for ancestor in ancestor_dirs(&file.relative_path) {
                dirs.insert(ancestor);
            }
        }

        let total_bytes = files.iter().map(|f| f.bytes).sum();
        let file_count = files.len() as u64;

        Manifest {
            version: self.version.clone(),
            root: self.root.clone(),
            original_sha256: self.original_sha256.clone(),
            total_bytes,
            avg_size_bytes: self.avg_size_bytes,
            min_size_bytes: self.min_size_bytes,
            max_size_bytes: self.max_size_bytes,
            level: self.level,
            file_count,
            files,
            dirs: dirs.into_iter().collect(),
        }
    }
}

fn is_selected(path: &str, selectors: &[String]) -> bool {
    selectors
        .iter()
        .any(|s| path == s || path.starts_with(&format!("{s}/")))
}

fn ancestor_dirs(relative_path: &str) -> Vec<String> {
    let mut dirs = Vec::new();
    let mut parts: Vec<&str> = relative_path.split('/').collect();
    parts.pop();
    let mut acc = String::new();
    for part in parts {
        if !acc.is_empty() {
            acc.push('/');
        }
        acc.push_str(part);
        dirs.push(acc.clone());
    }
    dirs
}

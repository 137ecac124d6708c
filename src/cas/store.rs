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
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use parking_lot::Mutex;

use crate::error::RinneError;
use crate::global::defaults::{DEFAULT_DIRECTORY_DEPTH, DEFAULT_ZSTD_LEVEL};
use crate::hashing::hash_bytes_lower;
use crate::layout::PathLayout;
use crate::utils::random_suffix;

/// Zstd-compressed, content-addressable blob store keyed by SHA-256. Safe
/// for concurrent `put_if_absent` calls from multiple threads in this
/// process; cross-process safety relies on create-new rename semantics.
pub struct CasStore {
    layout: PathLayout,
    directory_depth: usize,
    zstd_level: i32,
    hash_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CasStore {
    pub fn new(layout: PathLayout) -> Self {
        Self {
            layout,
            directory_depth: DEFAULT_DIRECTORY_DEPTH,
            zstd_level: DEFAULT_ZSTD_LEVEL,
            hash_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_params(layout: PathLayout, directory_depth: usize, zstd_level: i32) -> Result<Self> {
        if !(1..=22).contains(&zstd_level) {
            bail!(RinneError::OutOfRange(format!(
                "zstd level {zstd_level} out of range [1,22]"
            )));
        }
        Ok(Self {
            layout,
            directory_depth,
            zstd_level,
            hash_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn path_for(&self, hash_hex: &str) -> PathBuf {
        self.layout.blob_path(hash_hex, self.directory_depth)
    }

    pub fn exists(&self, hash_hex: &str) -> bool {
        self.path_for(hash_hex).is_file()
    }

    fn lock_for(&self, hash_hex: &str) -> Arc<Mutex<()>> {
        self.hash_locks
            .lock()
            .entry(hash_hex.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Idempotent, concurrency-safe write: computes the hash, returns
    /// immediately if the blob already exists, otherwise compresses and
    /// writes it under a per-hash lock using create-new rename semantics.
    pub fn put_if_absent(&self, data: &[u8]) -> Result<String> {
        let hash_hex = hash_bytes_lower(data);

        if self.exists(&hash_hex) {
            return Ok(hash_hex);
        }

        let per_hash_lock = self.lock_for(&hash_hex);
        let _guard = per_hash_lock.lock();

        if self.exists(&hash_hex) {
            return Ok(hash_hex);
        }

        let final_path = self.path_for(&hash_hex);
        if let Some(parent) = final_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create blob directory {}", parent.display()))?;
        }

        let compressed = zstd::encode_all(data, self.zstd_level)
            .with_context(|| "failed to zstd-compress blob")?;

        let tmp_name = format!(".{hash_hex}.{}.tmp", random_suffix(8));
        let tmp_path = final_path.with_file_name(tmp_name);
        std::fs::write(&tmp_path, &compressed)
            .with_context(|| format!("failed to write temp blob {}", tmp_path.display()))?;

        // create-new rename: if a concurrent writer already produced the
        // final file, keep theirs and discard ours.
        match std::fs::hard_link(&tmp_path, &final_path) {
            Ok(()) => {
                std::fs::remove_file(&tmp_path).ok();
            }
            Err(_) if final_path.is_file() => {
                std::fs::remove_file(&tmp_path).ok();
            }
            Err(_) => {
                // hard_link unsupported (e.g. cross-device) — fall back to
                // a plain rename, which is safe because we're still under
                // the per-hash lock.
                std::fs::rename(&tmp_path, &final_path).with_context(|| {
                    format!(
                        "failed to rename {} onto {}",
                        tmp_path.display(),
                        final_path.display()
                    )
                })?;
            }
        }

        if !final_path.is_file() {
            bail!(RinneError::StoreWriteFailed(format!(
                "blob {hash_hex} missing after write"
            )));
        }

        Ok(hash_hex)
    }

    /// Reads and Zstd-decompresses the blob for `hash_hex`.
    pub fn load(&self, hash_hex: &str) -> Result<Vec<u8>> {
        let path = self.path_for(hash_hex);
        if !path.is_file() {
            bail!(RinneError::NotFound(format!("blob {hash_hex}")));
        }
        let file = File::open(&path)
            .with_context(|| format!("failed to open blob {}", path.display()))?;
        let mut decompressed = Vec::new();
        zstd::stream::Decoder::new(file)
            .with_context(|| format!("failed to open zstd stream for {}", path.display()))?
            .read_to_end(&mut decompressed)
            .with_context(|| format!("failed to decompress blob {}", path.display()))?;
        Ok(decompressed)
    }

    pub fn directory_depth(&self) -> usize {
        self.directory_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    fn store_in_tempdir() -> (tempfile::TempDir, CasStore) {
        let dir = tempfile::tempdir().unwrap();
        let layout = PathLayout::new(dir.path());
        (dir, CasStore::new(layout))
    }

    #[test]
    fn put_if_absent_is_idempotent() {
        let (_dir, store) = store_in_tempdir();
        let h1 = store.put_if_absent(b"payload").unwrap();
        let h2 = store.put_if_absent(b"payload").unwrap();
        assert_eq!(h1, h2);
        assert!(store.exists(&h1));
    }

    #[test]
    fn load_round_trips_original_bytes() {
        let (_dir, store) = store_in_tempdir();
        let hash = store.put_if_absent(b"round trip me").unwrap();
        let loaded = store.load(&hash).unwrap();
        assert_eq!(loaded, b"round trip me");
    }

    #[test]
    fn load_missing_blob_errors() {
        let (_dir, store) = store_in_tempdir();
        assert!(store.load("0".repeat(64).as_str()).is_err());
    }

    #[test]
    fn concurrent_put_if_absent_on_same_bytes_writes_once() {
        let (_dir, store) = store_in_tempdir();
        let store = Arc::new(store);
        let hashes: Vec<String> = (0..16)
            .into_par_iter()
            .map(|_| store.put_if_absent(b"same bytes, many writers").unwrap())
            .collect();
        assert!(hashes.iter().all(|h| h == &hashes[0]));
    }

    #[test]
    fn blob_path_is_sharded_by_directory_depth() {
        let (_dir, store) = store_in_tempdir();
        let hash = store.put_if_absent(b"shard me").unwrap();
        let path = store.path_for(&hash);
        assert_eq!(
            path.strip_prefix(store.layout.store_dir()).unwrap(),
            std::path::Path::new(&hash[0..2]).join(&hash[2..4]).join(format!("{hash}.zst"))
        );
    }
}

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

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::atomic_file;
use crate::cas::manifest::{FileEntry, Manifest};
use crate::cas::meta_cache::FileMetaCache;
use crate::cas::store::CasStore;
use crate::chunker::{ChunkerParams, FastCdcChunker};
use crate::hashing;
use crate::ignore::IgnoreMatcher;
use crate::utils::CancellationToken;

use super::resolve_workers;

/// Inputs to a compact run (directory -> CAS), per §4.9.
pub struct CompactInput<'a> {
    pub input_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub params: ChunkerParams,
    pub zstd_level: i32,
    pub workers: usize,
    pub full_hash_check: bool,
    pub ignore: &'a IgnoreMatcher,
    pub cancel: &'a CancellationToken,
}

pub struct CompactPipe<'a> {
    store: &'a CasStore,
    meta_cache: &'a FileMetaCache,
}

struct WalkResult {
    files: Vec<String>,
    dirs: Vec<String>,
}

impl<'a> CompactPipe<'a> {
    pub fn new(store: &'a CasStore, meta_cache: &'a FileMetaCache) -> Self {
        Self { store, meta_cache }
    }

    pub fn run(&self, input: &CompactInput) -> Result<Manifest> {
        let walked = enumerate(&input.input_dir, input.ignore)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(resolve_workers(input.workers))
            .build()
            .context("failed to build compact worker pool")?;

        let files: Vec<FileEntry> = pool.install(|| -> Result<Vec<FileEntry>> {
            walked
                .files
                .par_iter()
                .map(|relative_path| {
                    input.cancel.check()?;
                    self.compact_one_file(
                        &input.input_dir,
                        relative_path,
                        input.params,
                        input.zstd_level,
                        input.full_hash_check,
                        input.cancel,
                    )
                })
                .collect()
        })?;

        let mut sorted_files = files;
        sorted_files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        let absolute_paths: Vec<PathBuf> = walked
            .files
            .iter()
            .map(|p| input.input_dir.join(p))
            .collect();
        let root_hash =
            hashing::hash_ordered_files(absolute_paths.iter().map(PathBuf::as_path), input.cancel)?;

        let manifest = Manifest::new(
            root_hash.clone(),
            root_hash,
            input.params,
            input.zstd_level,
            sorted_files,
            walked.dirs,
        );

        let json = manifest.to_json()?;
        let write_result = atomic_file::write_with(&input.manifest_path, true, |file: &mut File| {
            file.write_all(json.as_bytes())
                .context("failed to write manifest body")
        });

        match write_result {
            Ok(()) => {
                self.meta_cache.commit_staged()?;
                Ok(manifest)
            }
            Err(e) => {
                // AtomicFile already removed the temp file; the cache stage
                // is simply dropped (never committed) by leaving it as-is
                // for the next compact attempt to overwrite.
                Err(e)
            }
        }
    }

    fn compact_one_file(
        &self,
        root: &Path,
        relative_path: &str,
        params: ChunkerParams,
        zstd_level: i32,
        full_hash_check: bool,
        cancel: &CancellationToken,
    ) -> Result<FileEntry> {
        let absolute_path = root.join(relative_path);
        let metadata = std::fs::metadata(&absolute_path)
            .with_context(|| format!("failed to stat {}", absolute_path.display()))?;
        let size = metadata.len();
        let mtime_ticks = mtime_ticks(&metadata);

        if let Some(cached) = self.try_reuse_cache(relative_path, size, mtime_ticks, full_hash_check, &absolute_path)? {
            return Ok(FileEntry {
                relative_path: relative_path.to_string(),
                bytes: size,
                chunk_hashes: cached,
            });
        }

        if size == 0 {
            self.meta_cache.stage(
                relative_path,
                0,
                mtime_ticks,
                &hashing::hash_bytes(b""),
                0,
                &hashing::hash_bytes(b""),
                now_ticks(),
            );
            return Ok(FileEntry {
                relative_path: relative_path.to_string(),
                bytes: 0,
                chunk_hashes: Vec::new(),
            });
        }

        let file = File::open(&absolute_path)
            .with_context(|| format!("failed to open {}", absolute_path.display()))?;
        let mut chunker = FastCdcChunker::new(file, params);

        let mut chunk_hashes = Vec::new();
        while let Some(chunk) = chunker.next_chunk()? {
            cancel.check()?;
            let _ = zstd_level; // level is applied inside CasStore::put_if_absent
            chunk_hashes.push(self.store.put_if_absent(&chunk.bytes)?);
        }

        let file_hash = hashing::hash_file(&absolute_path, cancel)?;
        self.meta_cache.stage(
            relative_path,
            size,
            mtime_ticks,
            &file_hash,
            chunk_hashes.len(),
            &file_hash,
            now_ticks(),
        );
        for (i, hash) in chunk_hashes.iter().enumerate() {
            self.meta_cache.set_staged_chunk_hash(relative_path, i, hash);
        }

        Ok(FileEntry {
            relative_path: relative_path.to_string(),
            bytes: size,
            chunk_hashes,
        })
    }

    fn try_reuse_cache(
        &self,
        relative_path: &str,
        size: u64,
        mtime_ticks: i64,
        full_hash_check: bool,
        absolute_path: &Path,
    ) -> Result<Option<Vec<String>>> {
        let Some(cached) = self.meta_cache.try_get(relative_path)? else {
            return Ok(None);
        };

        if cached.size != size || cached.mtime_ticks != mtime_ticks {
            return Ok(None);
        }

        if full_hash_check {
            let cancel = CancellationToken::new();
            let recomputed = hashing::hash_file(absolute_path, &cancel)?;
            if recomputed != cached.file_hash {
                self.meta_cache.invalidate(relative_path)?;
                return Ok(None);
            }
        }

        for hash in &cached.chunk_hashes {
            if !self.store.exists(hash) {
                self.meta_cache.invalidate(relative_path)?;
                return Ok(None);
            }
        }

        Ok(Some(cached.chunk_hashes))
    }
}

fn enumerate(root: &Path, ignore: &IgnoreMatcher) -> Result<WalkResult> {
    let mut files = Vec::new();
    let mut dirs = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.context("failed to walk input directory")?;
        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");

        let is_dir = entry.file_type().is_dir();
        if ignore.is_excluded(&relative, is_dir) {
            continue;
        }

        if is_dir {
            dirs.push(relative);
        } else if entry.file_type().is_file() {
            files.push(relative);
        }
    }

    files.sort();
    dirs.sort();
    Ok(WalkResult { files, dirs })
}

fn mtime_ticks(metadata: &std::fs::Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

fn now_ticks() -> i64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::PathLayout;

    fn setup() -> (tempfile::TempDir, PathLayout, CasStore, FileMetaCache) {
        let dir = tempfile::tempdir().unwrap();
        let layout = PathLayout::new(dir.path());
        let store = CasStore::new(layout.clone());
        let cache = FileMetaCache::in_memory().unwrap();
        (dir, layout, store, cache)
    }

    #[test]
    fn compacts_a_simple_tree_and_writes_manifest() {
        let (dir, layout, store, cache) = setup();
        let input_dir = dir.path().join("input");
        std::fs::create_dir_all(input_dir.join("b")).unwrap();
        std::fs::write(input_dir.join("a.txt"), b"hello\n").unwrap();
        std::fs::write(input_dir.join("b/c.txt"), b"world\n").unwrap();

        let manifest_path = layout.manifests_dir().join("test.json");
        let ignore = IgnoreMatcher::defaults().unwrap();
        let cancel = CancellationToken::new();

        let pipe = CompactPipe::new(&store, &cache);
        let input = CompactInput {
            input_dir,
            manifest_path: manifest_path.clone(),
            params: ChunkerParams::new(1024, 256, 4096).unwrap(),
            zstd_level: 3,
            workers: 2,
            full_hash_check: false,
            ignore: &ignore,
            cancel: &cancel,
        };

        let manifest = pipe.run(&input).unwrap();
        assert_eq!(manifest.file_count, 2);
        assert!(manifest_path.is_file());

        let expected_root = hashing::hash_bytes(b"hello\nworld\n");
        assert_eq!(manifest.original_sha256, expected_root);
    }

    #[test]
    fn zero_byte_files_have_no_chunks() {
        let (dir, layout, store, cache) = setup();
        let input_dir = dir.path().join("input");
        std::fs::create_dir_all(&input_dir).unwrap();
        std::fs::write(input_dir.join("empty.txt"), b"").unwrap();

        let manifest_path = layout.store_dir().join("manifest.json");
        let ignore = IgnoreMatcher::defaults().unwrap();
        let cancel = CancellationToken::new();
        let pipe = CompactPipe::new(&store, &cache);
        let input = CompactInput {
            input_dir,
            manifest_path,
            params: ChunkerParams::new(1024, 256, 4096).unwrap(),
            zstd_level: 3,
            workers: 1,
            full_hash_check: false,
            ignore: &ignore,
            cancel: &cancel,
        };

        let manifest = pipe.run(&input).unwrap();
        assert_eq!(manifest.files[0].bytes, 0);
        assert!(manifest.files[0].chunk_hashes.is_empty());
    }

    #[test]
    fn identical_content_at_two_paths_dedups_chunk_hashes() {
        let (dir, layout, store, cache) = setup();
        let input_dir = dir.path().join("input");
        std::fs::create_dir_all(input_dir.join("p")).unwrap();
        let payload = "X".repeat(1_048_576);
        std::fs::write(input_dir.join("p/one.bin"), &payload).unwrap();
        std::fs::write(input_dir.join("p/two.bin"), &payload).unwrap();

        let manifest_path = layout.store_dir().join("manifest.json");
        let ignore = IgnoreMatcher::defaults().unwrap();
        let cancel = CancellationToken::new();
        let pipe = CompactPipe::new(&store, &cache);
        let input = CompactInput {
            input_dir,
            manifest_path,
            params: ChunkerParams::new(16 * 1024, 4 * 1024, 64 * 1024).unwrap(),
            zstd_level: 3,
            workers: 2,
            full_hash_check: false,
            ignore: &ignore,
            cancel: &cancel,
        };

        let manifest = pipe.run(&input).unwrap();
        let one = manifest
            .files
            .iter()
            .find(|f| f.relative_path == "p/one.bin")
            .unwrap();
        let two = manifest
            .files
            .iter()
            .find(|f| f.relative_path == "p/two.bin")
            .unwrap();
        assert_eq!(one.chunk_hashes, two.chunk_hashes);
    }
}

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

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::cas::manifest::{FileEntry, Manifest};
use crate::cas::store::CasStore;
use crate::utils::{CancellationToken, random_suffix};

use super::resolve_workers;

/// Inputs to a restore run (manifest -> directory), per §4.10.
pub struct RestoreInput<'a> {
    pub manifest_path: PathBuf,
    pub output_dir: PathBuf,
    pub workers: usize,
    pub selectors: Vec<String>,
    pub cancel: &'a CancellationToken,
}

pub struct RestorePipe<'a> {
    store: &'a CasStore,
}

impl<'a> RestorePipe<'a> {
    pub fn new(store: &'a CasStore) -> Self {
        Self { store }
    }

    pub fn run(&self, input: &RestoreInput) -> Result<Manifest> {
        let manifest = Manifest::load(&input.manifest_path)?;
        let manifest = manifest.filtered(&input.selectors);

        let mut dirs = manifest.dirs.clone();
        dirs.sort();
        for dir in &dirs {
            std::fs::create_dir_all(input.output_dir.join(dir))
                .with_context(|| format!("failed to create directory {dir}"))?;
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(resolve_workers(input.workers))
            .build()
            .context("failed to build restore worker pool")?;

        pool.install(|| -> Result<()> {
            manifest
                .files
                .par_iter()
                .try_for_each(|entry| {
                    input.cancel.check()?;
                    self.restore_one_file(&input.output_dir, entry, input.cancel)
                })
        })?;

        Ok(manifest)
    }

    fn restore_one_file(
        &self,
        output_dir: &Path,
        entry: &FileEntry,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let final_path = output_dir.join(&entry.relative_path);
        if let Some(parent) = final_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }

        if entry.chunk_hashes.is_empty() {
            File::create(&final_path)
                .with_context(|| format!("failed to create empty file {}", final_path.display()))?;
            return Ok(());
        }

        let tmp_path = final_path.with_file_name(format!(
            "{}.{}.tmp",
            final_path.file_name().unwrap_or_default().to_string_lossy(),
            random_suffix(8)
        ));

        let write_result = (|| -> Result<()> {
            let mut tmp_file = File::create(&tmp_path)
                .with_context(|| format!("failed to create temp file {}", tmp_path.display()))?;
            for hash in &entry.chunk_hashes {
                cancel.check()?;
                let bytes = self.store.load(hash)?;
                tmp_file
                    .write_all(&bytes)
                    .with_context(|| format!("failed writing to {}", tmp_path.display()))?;
            }
            tmp_file.sync_all().ok();
            Ok(())
        })();

        match write_result {
            Ok(()) => {
                std::fs::rename(&tmp_path, &final_path).with_context(|| {
                    format!(
                        "failed to rename {} onto {}",
                        tmp_path.display(),
                        final_path.display()
                    )
                })?;
                Ok(())
            }
            Err(e) => {
                std::fs::remove_file(&tmp_path).ok();
                Err(e)
            }
        }
    }
}

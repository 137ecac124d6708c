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

use anyhow::{Context, Result, bail};
use walkdir::WalkDir;

use crate::error::RinneError;
use crate::ignore::IgnoreMatcher;
use crate::layout::RINNE_DIR;
use crate::utils::{CancellationToken, random_suffix};

/// One file to materialise onto the working tree during extract. Content
/// is pre-read by the caller (e.g. reassembled by RestorePipe from CAS
/// blobs, or read from a ZIP entry); TxRestore's job is the transactional
/// overlay, not chunk/archive decoding.
pub struct TxSourceEntry {
    pub relative_path: String,
    pub content: Vec<u8>,
}

/// Overlays a snapshot's files onto a working tree with full rollback on
/// any error, per §4.12. `.rinne/` and ignore-matched paths are protected
/// from the clean phase and skipped during extract.
pub struct TxRestore<'a> {
    working_tree: PathBuf,
    ignore: &'a IgnoreMatcher,
    cancel: &'a CancellationToken,
    #[cfg(test)]
    fault_after: std::cell::Cell<Option<usize>>,
}

impl<'a> TxRestore<'a> {
    pub fn new(working_tree: impl Into<PathBuf>, ignore: &'a IgnoreMatcher, cancel: &'a CancellationToken) -> Self {
        Self {
            working_tree: working_tree.into(),
            ignore,
            cancel,
            #[cfg(test)]
            fault_after: std::cell::Cell::new(None),
        }
    }

    /// Test-only hook: makes `run` fail with an injected error after the
    /// `n`-th file has been written, so rollback can be exercised without a
    /// real I/O fault.
    #[cfg(test)]
    fn fail_after(self, n: usize) -> Self {
        self.fault_after.set(Some(n));
        self
    }

    pub fn run(&self, entries: &[TxSourceEntry]) -> Result<()> {
        let root = self
            .working_tree
            .canonicalize()
            .with_context(|| format!("failed to resolve working tree {}", self.working_tree.display()))?;

        let staging = root
            .join(RINNE_DIR)
            .join("temp")
            .join(format!("restore_{}_tx", random_suffix(10)));
        let removed_dir = staging.join("removed");
        let before_write_dir = staging.join("before_write");
        std::fs::create_dir_all(&removed_dir)
            .with_context(|| format!("failed to create {}", removed_dir.display()))?;
        std::fs::create_dir_all(&before_write_dir)
            .with_context(|| format!("failed to create {}", before_write_dir.display()))?;

        let result = self.run_transaction(&root, &removed_dir, &before_write_dir, entries);

        match result {
            Ok(created) => {
                let _ = created;
                std::fs::remove_dir_all(&staging).ok();
                Ok(())
            }
            Err(e) => {
                self.rollback(&root, &removed_dir, &before_write_dir, &e.created);
                std::fs::remove_dir_all(&staging).ok();
                Err(e.source)
            }
        }
    }

    fn run_transaction(
        &self,
        root: &Path,
        removed_dir: &Path,
        before_write_dir: &Path,
        entries: &[TxSourceEntry],
    ) -> std::result::Result<Vec<PathBuf>, TxFailure> {
        self.clean_phase(root, removed_dir).map_err(TxFailure::no_progress)?;

        let mut created = Vec::new();
        for entry in entries {
            self.cancel
                .check()
                .map_err(|e| TxFailure::with_progress(e, created.clone()))?;

            if is_protected(&entry.relative_path) {
                continue;
            }

            let final_path = resolve_safe(root, &entry.relative_path)
                .map_err(|e| TxFailure::with_progress(e, created.clone()))?;

            if self.ignore.is_excluded(&entry.relative_path, false) {
                continue;
            }

            if final_path.exists() {
                let staged_path = before_write_dir.join(&entry.relative_path);
                if let Some(parent) = staged_path.parent() {
                    std::fs::create_dir_all(parent).ok();
                }
                std::fs::rename(&final_path, &staged_path)
                    .with_context(|| format!("failed to stage {} before overwrite", final_path.display()))
                    .map_err(|e| TxFailure::with_progress(e, created.clone()))?;
            }

            if let Some(parent) = final_path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create directory {}", parent.display()))
                    .map_err(|e| TxFailure::with_progress(e, created.clone()))?;
            }

            std::fs::write(&final_path, &entry.content)
                .with_context(|| format!("failed to write {}", final_path.display()))
                .map_err(|e| TxFailure::with_progress(e, created.clone()))?;
            created.push(final_path);

            #[cfg(test)]
            if self.fault_after.get() == Some(created.len()) {
                return Err(TxFailure::with_progress(
                    anyhow::anyhow!("injected test fault"),
                    created,
                ));
            }
        }

        Ok(created)
    }

    /// Moves every non-protected, non-ignored file/dir out of the working
    /// tree into `removed_dir`, deepest paths first so emptied parent dirs
    /// can be removed afterward.
    fn clean_phase(&self, root: &Path, removed_dir: &Path) -> Result<()> {
        let mut entries: Vec<(PathBuf, String, bool)> = Vec::new();
        for entry in WalkDir::new(root).min_depth(1).contents_first(true) {
            let entry = entry.context("failed to walk working tree during clean phase")?;
            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");

            if is_protected(&relative) {
                continue;
            }
            entries.push((entry.path().to_path_buf(), relative, entry.file_type().is_dir()));
        }

        for (path, relative, is_dir) in entries {
            self.cancel.check()?;
            if self.ignore.is_excluded(&relative, is_dir) {
                continue;
            }

            if is_dir {
                // Only remove if it became empty (its live children were
                // already moved in this same deepest-first pass).
                if std::fs::read_dir(&path).map(|mut d| d.next().is_none()).unwrap_or(false) {
                    std::fs::remove_dir(&path).ok();
                }
                continue;
            }

            let dest = removed_dir.join(&relative);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::rename(&path, &dest)
                .with_context(|| format!("failed to move {} aside", path.display()))?;
        }

        Ok(())
    }

    fn rollback(&self, root: &Path, removed_dir: &Path, before_write_dir: &Path, created: &[PathBuf]) {
        for path in created {
            std::fs::remove_file(path).ok();
        }
        restore_staged_tree(before_write_dir, root);
        restore_staged_tree(removed_dir, root);
    }
}

struct TxFailure {
    source: anyhow::Error,
    created: Vec<PathBuf>,
}

impl TxFailure {
    fn no_progress(source: anyhow::Error) -> Self {
        Self {
            source,
            created: Vec::new(),
        }
    }

    fn with_progress(source: anyhow::Error, created: Vec<PathBuf>) -> Self {
        Self { source, created }
    }
}

fn is_protected(relative_path: &str) -> bool {
    crate::ignore::is_forced_excluded(relative_path)
}

/// Rejects any path that would escape the working tree (zip-slip defence):
/// the resolved path must start with the normalised root.
fn resolve_safe(root: &Path, relative_path: &str) -> Result<PathBuf> {
    if relative_path
        .split('/')
        .any(|segment| segment == ".." || segment.is_empty() && !relative_path.is_empty())
    {
        bail!(RinneError::UnsafePath {
            path: PathBuf::from(relative_path)
        });
    }

    let candidate = root.join(relative_path);
    let normalized_root = root.to_path_buf();
    if !candidate.starts_with(&normalized_root) {
        bail!(RinneError::UnsafePath { path: candidate });
    }
    Ok(candidate)
}

fn restore_staged_tree(staged_dir: &Path, root: &Path) {
    if !staged_dir.is_dir() {
        return;
    }
    for entry in WalkDir::new(staged_dir).min_depth(1).contents_first(true) {
        let Ok(entry) = entry else { continue };
        if entry.file_type().is_dir() {
            continue;
        }
        let relative = entry.path().strip_prefix(staged_dir).unwrap_or(entry.path());
        let dest = root.join(relative);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        std::fs::rename(entry.path(), &dest).ok();
    }
}

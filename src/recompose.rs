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

use crate::cas::store::CasStore;
use crate::error::RinneError;
use crate::global::{Clock, SnapshotId};
use crate::hashing;
use crate::ignore::is_forced_excluded;
use crate::layout::PathLayout;
use crate::pipeline::restore::{RestoreInput, RestorePipe};
use crate::selector::resolve_selector;
use crate::snapshot_meta::SnapshotMeta;
use crate::utils::{CancellationToken, random_suffix};

/// What to do with a source snapshot that has no materialised payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceHydration {
    /// Restore into a scratch temp dir that is discarded after the merge.
    EphemeralHydrate,
    /// Restore directly into the snapshot's own payload dir, permanently.
    AutoHydrate,
    /// Refuse sources without a payload.
    Fail,
}

/// One ordered input to a recompose: a space and a selector resolving to a
/// concrete snapshot within it.
pub struct RecomposeSource {
    pub space: String,
    pub selector: String,
}

pub struct RecomposeInput<'a> {
    pub layout: PathLayout,
    pub store: &'a CasStore,
    pub sources: Vec<RecomposeSource>,
    pub target_space: String,
    pub hydration: SourceHydration,
    pub workers: usize,
    pub clock: &'a dyn Clock,
    pub cancel: &'a CancellationToken,
}

/// Resolves each source, merges them left-wins into a staged tree, and
/// moves the staged tree into place as a new snapshot, per §4.13.
pub fn run(input: &RecomposeInput) -> Result<SnapshotId> {
    let mut roots: Vec<PathBuf> = Vec::new();
    let mut scratch_dirs: Vec<tempfile::TempDir> = Vec::new();

    for source in &input.sources {
        input.cancel.check()?;
        let id = resolve_selector(&input.layout, &source.space, &source.selector)?;
        let root = resolve_source_root(input, &source.space, &id, &mut scratch_dirs)?;
        roots.push(root);
    }

    let tmp_root = input
        .layout
        .space_dir(&input.target_space)
        .join(format!(".recompose_tmp_{}", random_suffix(12)));
    let staging = tmp_root.join("snapshots");
    std::fs::create_dir_all(&staging)
        .with_context(|| format!("failed to create staging dir {}", staging.display()))?;

    let merge_result = merge_left_wins(&roots, &staging, input.cancel);
    if let Err(e) = merge_result {
        std::fs::remove_dir_all(&tmp_root).ok();
        return Err(e);
    }

    let new_id = SnapshotId::new_time_uuid(input.clock);
    let final_dir = input.layout.snapshot_dir(&input.target_space, &new_id);
    if let Some(parent) = final_dir.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let rename_result = std::fs::rename(&tmp_root, &final_dir)
        .with_context(|| format!("failed to move staged snapshot into {}", final_dir.display()));
    if let Err(e) = rename_result {
        std::fs::remove_dir_all(&tmp_root).ok();
        return Err(e);
    }

    write_meta(&final_dir.join("snapshots"), &final_dir.join("meta.json"), input.cancel)?;

    Ok(new_id)
}

fn resolve_source_root(
    input: &RecomposeInput,
    space: &str,
    id: &SnapshotId,
    scratch_dirs: &mut Vec<tempfile::TempDir>,
) -> Result<PathBuf> {
    let payload_dir = input.layout.snapshot_payload_dir(space, id);
    if is_nonempty_dir(&payload_dir) {
        return Ok(payload_dir);
    }

    let manifest_path = input.layout.manifest_file(id);
    if !manifest_path.is_file() {
        bail!(RinneError::NotFound(format!(
            "snapshot {id} in space '{space}' has neither a payload nor a manifest"
        )));
    }

    match input.hydration {
        SourceHydration::Fail => bail!(RinneError::InvalidArgument(format!(
            "snapshot {id} in space '{space}' has no payload and hydration is disabled"
        ))),
        SourceHydration::EphemeralHydrate => {
            let scratch = tempfile::tempdir().context("failed to create ephemeral hydrate dir")?;
            hydrate(input.store, &manifest_path, scratch.path(), input.workers, input.cancel)?;
            let path = scratch.path().to_path_buf();
            scratch_dirs.push(scratch);
            Ok(path)
        }
        SourceHydration::AutoHydrate => {
            hydrate(input.store, &manifest_path, &payload_dir, input.workers, input.cancel)?;
            Ok(payload_dir)
        }
    }
}

fn hydrate(
    store: &CasStore,
    manifest_path: &Path,
    output_dir: &Path,
    workers: usize,
    cancel: &CancellationToken,
) -> Result<()> {
    let pipe = RestorePipe::new(store);
    let restore_input = RestoreInput {
        manifest_path: manifest_path.to_path_buf(),
        output_dir: output_dir.to_path_buf(),
        workers,
        selectors: Vec::new(),
        cancel,
    };
    pipe.run(&restore_input)?;
    Ok(())
}

fn is_nonempty_dir(path: &Path) -> bool {
    path.is_dir() && std::fs::read_dir(path).map(|mut d| d.next().is_some()).unwrap_or(false)
}

/// Copies every file from each root in order into `staging`, never
/// overwriting a path a previous (earlier, higher-priority) source already
/// placed there. `.rinne` is never crossed into, in either direction.
fn merge_left_wins(roots: &[PathBuf], staging: &Path, cancel: &CancellationToken) -> Result<()> {
    for root in roots {
        for entry in WalkDir::new(root).min_depth(1) {
            cancel.check()?;
            let entry = entry.with_context(|| format!("failed to walk source tree {}", root.display()))?;
            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");

            if is_forced_excluded(&relative) {
                continue;
            }

            let dest = staging.join(&relative);
            if entry.file_type().is_dir() {
                std::fs::create_dir_all(&dest)
                    .with_context(|| format!("failed to create directory {}", dest.display()))?;
                continue;
            }

            if dest.exists() {
                continue;
            }
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create directory {}", parent.display()))?;
            }
            std::fs::copy(entry.path(), &dest)
                .with_context(|| format!("failed to copy {} into staging", entry.path().display()))?;
        }
    }
    Ok(())
}

fn write_meta(payload_dir: &Path, meta_path: &Path, cancel: &CancellationToken) -> Result<()> {
    let mut files: Vec<PathBuf> = Vec::new();
    let mut file_count = 0u64;
    let mut total_bytes = 0u64;
    for entry in WalkDir::new(payload_dir).min_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", payload_dir.display()))?;
        if entry.file_type().is_file() {
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            file_count += 1;
            total_bytes += size;
            files.push(entry.path().to_path_buf());
        }
    }

    let snapshot_hash = hashing::hash_ordered_files(files.iter().map(PathBuf::as_path), cancel)?;
    SnapshotMeta::new(snapshot_hash, file_count, total_bytes).save(meta_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::global::FixedClock;
    use chrono::{TimeZone, Utc};

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
    }

    fn write_payload(layout: &PathLayout, space: &str, id: &SnapshotId, files: &[(&str, &str)]) {
        let dir = layout.snapshot_payload_dir(space, id);
        for (relative, content) in files {
            let path = dir.join(relative);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }
    }

    #[test]
    fn left_wins_merge_prefers_the_earlier_source() {
        let dir = tempfile::tempdir().unwrap();
        let layout = PathLayout::new(dir.path());
        let store = CasStore::new(layout.clone());
        let clk = clock();

        let id_a = SnapshotId::new_time_uuid(&clk);
        write_payload(&layout, "a", &id_a, &[("x", "A"), ("y", "A")]);
        std::fs::create_dir_all(layout.snapshot_dir("a", &id_a)).unwrap();

        let id_b = SnapshotId::new_time_uuid(&clk);
        write_payload(&layout, "b", &id_b, &[("y", "B"), ("z", "B")]);
        std::fs::create_dir_all(layout.snapshot_dir("b", &id_b)).unwrap();

        let cancel = CancellationToken::new();
        let new_clock = FixedClock(Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap());
        let input = RecomposeInput {
            layout: layout.clone(),
            store: &store,
            sources: vec![
                RecomposeSource {
                    space: "a".to_string(),
                    selector: id_a.to_string(),
                },
                RecomposeSource {
                    space: "b".to_string(),
                    selector: id_b.to_string(),
                },
            ],
            target_space: "merged".to_string(),
            hydration: SourceHydration::Fail,
            workers: 1,
            clock: &new_clock,
            cancel: &cancel,
        };

        let new_id = run(&input).unwrap();
        let payload = layout.snapshot_payload_dir("merged", &new_id);
        assert_eq!(std::fs::read_to_string(payload.join("x")).unwrap(), "A");
        assert_eq!(std::fs::read_to_string(payload.join("y")).unwrap(), "A");
        assert_eq!(std::fs::read_to_string(payload.join("z")).unwrap(), "B");

        let meta = SnapshotMeta::load(&layout.snapshot_meta_file("merged", &new_id)).unwrap();
        assert_eq!(meta.file_count, 3);
    }

    #[test]
    fn missing_source_without_payload_or_manifest_fails() {
        let dir = tempfile::tempdir().unwrap();
        let layout = PathLayout::new(dir.path());
        let store = CasStore::new(layout.clone());
        let clk = clock();
        let id = SnapshotId::new_time_uuid(&clk);

        let cancel = CancellationToken::new();
        let input = RecomposeInput {
            layout: layout.clone(),
            store: &store,
            sources: vec![RecomposeSource {
                space: "a".to_string(),
                selector: id.to_string(),
            }],
            target_space: "merged".to_string(),
            hydration: SourceHydration::Fail,
            workers: 1,
            clock: &clk,
            cancel: &cancel,
        };

        assert!(run(&input).is_err());
    }
}

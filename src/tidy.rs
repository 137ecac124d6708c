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

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use globset::Glob;
use serde_json::Value;

use crate::cas::manifest::Manifest;
use crate::chain;
use crate::global::SnapshotId;
use crate::layout::PathLayout;
use crate::selector::list_snapshot_ids;
use crate::utils::CancellationToken;

/// Exactly one retention selector drives which snapshots are deleted.
pub enum RetentionSelector {
    Keep(usize),
    Latest(usize),
    Before(DateTime<Utc>),
    Match(Vec<String>),
}

pub struct TidyInput<'a> {
    pub layout: PathLayout,
    pub space: String,
    pub selector: RetentionSelector,
    pub run_gc: bool,
    pub dry_run: bool,
    pub cancel: &'a CancellationToken,
}

#[derive(Debug, Clone, Default)]
pub struct GcReport {
    pub examined: usize,
    pub deletable: usize,
    pub bytes_freed: u64,
    pub candidates: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TidyReport {
    pub deleted: Vec<String>,
    pub delete_failures: Vec<(String, String)>,
    pub gc: Option<GcReport>,
}

/// Selects, deletes, and (optionally) garbage-collects per §4.14, then
/// restitches the ZIP-backend chain for the affected space.
pub fn run(input: &TidyInput) -> Result<TidyReport> {
    let ids = list_snapshot_ids(&input.layout, &input.space)?;
    let to_delete = select_for_deletion(&ids, &input.selector)?;

    let mut report = TidyReport::default();

    if !input.dry_run {
        for id in &to_delete {
            input.cancel.check()?;
            match delete_snapshot(&input.layout, &input.space, id) {
                Ok(()) => report.deleted.push(id.to_string()),
                Err(e) => report.delete_failures.push((id.to_string(), e.to_string())),
            }
        }
    } else {
        report.deleted = to_delete.iter().map(|id| id.to_string()).collect();
    }

    if input.run_gc {
        report.gc = Some(garbage_collect(&input.layout, input.dry_run, input.cancel)?);
    }

    chain::restitch_chain(&input.layout, &input.space)?;

    Ok(report)
}

fn select_for_deletion(ids: &[SnapshotId], selector: &RetentionSelector) -> Result<Vec<SnapshotId>> {
    let selected = match selector {
        RetentionSelector::Keep(n) => {
            if ids.len() > *n {
                ids[..ids.len() - n].to_vec()
            } else {
                Vec::new()
            }
        }
        RetentionSelector::Latest(m) => {
            if ids.len() > *m {
                ids[ids.len() - m..].to_vec()
            } else {
                ids.to_vec()
            }
        }
        RetentionSelector::Before(cutoff) => ids.iter().filter(|id| id.utc() < *cutoff).cloned().collect(),
        RetentionSelector::Match(globs) => {
            let compiled: Result<Vec<_>> = globs
                .iter()
                .map(|g| Glob::new(g).with_context(|| format!("invalid glob pattern '{g}'")))
                .collect();
            let compiled = compiled?;
            ids.iter()
                .filter(|id| {
                    let rendered = id.to_string();
                    compiled.iter().all(|g| g.compile_matcher().is_match(&rendered))
                })
                .cloned()
                .collect()
        }
    };
    Ok(selected)
}

fn delete_snapshot(layout: &PathLayout, space: &str, id: &SnapshotId) -> Result<()> {
    let snapshot_dir = layout.snapshot_dir(space, id);
    if snapshot_dir.is_dir() {
        std::fs::remove_dir_all(&snapshot_dir)
            .with_context(|| format!("failed to remove {}", snapshot_dir.display()))?;
    }

    let manifest_path = layout.manifest_file(id);
    if manifest_path.is_file() {
        std::fs::remove_file(&manifest_path)
            .with_context(|| format!("failed to remove {}", manifest_path.display()))?;
    }

    Ok(())
}

/// Scans all remaining manifests for blob references, materialises the
/// refmap, then walks the blob store deleting (or, if `dry_run`, merely
/// reporting) every blob with zero references.
fn garbage_collect(layout: &PathLayout, dry_run: bool, cancel: &CancellationToken) -> Result<GcReport> {
    let mut ref_count: HashMap<String, u64> = HashMap::new();

    let manifests_dir = layout.manifests_dir();
    if manifests_dir.is_dir() {
        for entry in std::fs::read_dir(&manifests_dir)
            .with_context(|| format!("failed to read {}", manifests_dir.display()))?
        {
            cancel.check()?;
            let entry = entry?;
            if entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let manifest = Manifest::load(&entry.path())?;
            for file in &manifest.files {
                for hash in &file.chunk_hashes {
                    *ref_count.entry(hash.clone()).or_insert(0) += 1;
                }
            }
        }
    }

    write_refcount(layout, &ref_count, dry_run)?;

    let mut report = GcReport::default();
    let store_dir = layout.store_dir();
    if store_dir.is_dir() {
        walk_blobs(&store_dir, cancel, &mut |path| {
            report.examined += 1;
            let hash = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            let referenced = ref_count.get(&hash).copied().unwrap_or(0) > 0;
            if !referenced {
                let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                report.deletable += 1;
                report.bytes_freed += size;
                report.candidates.push(hash);
                if !dry_run {
                    std::fs::remove_file(path).ok();
                }
            }
            Ok(())
        })?;
    }

    Ok(report)
}

fn walk_blobs(
    dir: &std::path::Path,
    cancel: &CancellationToken,
    visit: &mut dyn FnMut(&std::path::Path) -> Result<()>,
) -> Result<()> {
    for entry in std::fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))? {
        cancel.check()?;
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            if path.file_name().and_then(|n| n.to_str()) == Some(".meta") || path.file_name().and_then(|n| n.to_str()) == Some(".tmp") {
                continue;
            }
            walk_blobs(&path, cancel, visit)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("zst") {
            visit(&path)?;
        }
    }
    Ok(())
}

fn write_refcount(layout: &PathLayout, ref_count: &HashMap<String, u64>, dry_run: bool) -> Result<()> {
    let map: serde_json::Map<String, Value> = ref_count
        .iter()
        .map(|(k, v)| (k.clone(), Value::from(*v)))
        .collect();
    let json = serde_json::to_string_pretty(&Value::Object(map))?;

    let path = if dry_run {
        layout.store_meta_dir().join("refcount.preview.json")
    } else {
        layout.refcount_file()
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cas::manifest::FileEntry;
    use crate::cas::store::CasStore;
    use crate::chunker::ChunkerParams;
    use crate::global::FixedClock;
    use chrono::TimeZone;

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
    }

    fn make_snapshot(layout: &PathLayout) -> SnapshotId {
        let clk = clock();
        let id = SnapshotId::new_time_uuid(&clk);
        std::fs::create_dir_all(layout.snapshot_dir("main", &id)).unwrap();
        id
    }

    #[test]
    fn keep_n_selects_all_but_the_newest_n() {
        let dir = tempfile::tempdir().unwrap();
        let layout = PathLayout::new(dir.path());
        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(make_snapshot(&layout));
        }
        ids.sort_by_key(|id| id.to_string());

        let selected = select_for_deletion(&ids, &RetentionSelector::Keep(1)).unwrap();
        assert_eq!(selected.len(), 2);
        assert!(!selected.contains(ids.last().unwrap()));
    }

    #[test]
    fn gc_frees_unreferenced_blobs_and_keeps_referenced_ones() {
        let dir = tempfile::tempdir().unwrap();
        let layout = PathLayout::new(dir.path());
        let store = CasStore::new(layout.clone());

        let h1 = store.put_if_absent(b"blob one").unwrap();
        let h2 = store.put_if_absent(b"blob two").unwrap();
        let h3 = store.put_if_absent(b"blob three").unwrap();

        std::fs::create_dir_all(layout.manifests_dir()).unwrap();
        let m1 = Manifest::new(
            "root1".to_string(),
            "orig1".to_string(),
            ChunkerParams::new(1024, 256, 4096).unwrap(),
            3,
            vec![FileEntry {
                relative_path: "a.bin".to_string(),
                bytes: 1,
                chunk_hashes: vec![h2.clone(), h3.clone()],
            }],
            vec![],
        );
        std::fs::write(layout.manifests_dir().join("m1.json"), m1.to_json().unwrap()).unwrap();
        let _ = h1;

        let cancel = CancellationToken::new();
        let report = garbage_collect(&layout, false, &cancel).unwrap();

        assert_eq!(report.deletable, 1);
        assert!(!store.exists(&h1));
        assert!(store.exists(&h2));
        assert!(store.exists(&h3));
        assert!(layout.refcount_file().is_file());
    }

    #[test]
    fn dry_run_gc_does_not_delete_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let layout = PathLayout::new(dir.path());
        let store = CasStore::new(layout.clone());
        let h1 = store.put_if_absent(b"unreferenced").unwrap();

        let cancel = CancellationToken::new();
        let report = garbage_collect(&layout, true, &cancel).unwrap();
        assert_eq!(report.deletable, 1);
        assert!(store.exists(&h1));
    }
}

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
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use walkdir::WalkDir;
use zip::ZipArchive;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::chain::{ChainMeta, ChainRecord, IgnoreRef};
use crate::global::{Clock, SnapshotId};
use crate::hashing::hash_bytes_lower;
use crate::ignore::IgnoreMatcher;
use crate::layout::{PathLayout, RINNEIGNORE_FILE};
use crate::restorer::{TxRestore, TxSourceEntry};
use crate::utils::CancellationToken;

/// Packs `input_dir` into a self-contained ZIP archive, records it in the
/// space's hash chain, and returns the written record. The archive itself
/// is treated as an opaque container: entry compression/layout is left to
/// the `zip` crate (§1 Out of scope: "ZIP archive creation/extraction as an
/// opaque container").
pub fn snapshot(
    layout: &PathLayout,
    space: &str,
    input_dir: &Path,
    ignore: &IgnoreMatcher,
    ignore_rules: &[String],
    message: String,
    clock: &dyn Clock,
    cancel: &CancellationToken,
) -> Result<ChainRecord> {
    let meta = ChainMeta::new(layout.clone());
    let chain = meta.load_chain(space)?;
    let seq = chain.last().map(|r| r.seq + 1).unwrap_or(1);
    let id = SnapshotId::new_sequence(seq, clock);

    let zip_path = layout.zip_file(space, &id);
    if let Some(parent) = zip_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    write_archive(input_dir, &zip_path, ignore, cancel)?;

    let zip_bytes = std::fs::read(&zip_path)
        .with_context(|| format!("failed to read {} for hashing", zip_path.display()))?;
    let zip_hash = hash_bytes_lower(&zip_bytes);

    meta.append(
        space,
        &id.to_string(),
        seq,
        clock.now_utc(),
        zip_hash,
        message,
        IgnoreRef {
            source: RINNEIGNORE_FILE.to_string(),
            rules: ignore_rules.to_vec(),
        },
    )
}

fn write_archive(input_dir: &Path, zip_path: &Path, ignore: &IgnoreMatcher, cancel: &CancellationToken) -> Result<()> {
    let file = File::create(zip_path)
        .with_context(|| format!("failed to create archive {}", zip_path.display()))?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for entry in WalkDir::new(input_dir).min_depth(1).sort_by_file_name() {
        cancel.check()?;
        let entry = entry.with_context(|| format!("failed to walk {}", input_dir.display()))?;
        let relative = entry
            .path()
            .strip_prefix(input_dir)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");

        let is_dir = entry.file_type().is_dir();
        if ignore.is_excluded(&relative, is_dir) {
            continue;
        }

        if is_dir {
            writer
                .add_directory(format!("{relative}/"), options)
                .with_context(|| format!("failed to add directory {relative} to archive"))?;
        } else if entry.file_type().is_file() {
            writer
                .start_file(&relative, options)
                .with_context(|| format!("failed to start archive entry {relative}"))?;
            let bytes = std::fs::read(entry.path())
                .with_context(|| format!("failed to read {}", entry.path().display()))?;
            writer
                .write_all(&bytes)
                .with_context(|| format!("failed to write archive entry {relative}"))?;
        }
    }

    writer.finish().context("failed to finalize archive")?;
    Ok(())
}

/// Extracts the ZIP archive for `(space, id)` and overlays it onto
/// `working_tree` via [`TxRestore`]'s clean/extract/rollback protocol.
pub fn restore(
    layout: &PathLayout,
    space: &str,
    id: &SnapshotId,
    working_tree: &Path,
    ignore: &IgnoreMatcher,
    cancel: &CancellationToken,
) -> Result<()> {
    let zip_path = layout.zip_file(space, id);
    let file = File::open(&zip_path)
        .with_context(|| format!("failed to open archive {}", zip_path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("failed to read archive {}", zip_path.display()))?;

    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut zip_entry = archive
            .by_index(i)
            .with_context(|| format!("failed to read archive entry {i}"))?;
        if zip_entry.is_dir() {
            continue;
        }
        let relative_path = match zip_entry.enclosed_name() {
            Some(path) => path.to_string_lossy().replace('\\', "/"),
            None => continue,
        };
        let mut content = Vec::new();
        zip_entry
            .read_to_end(&mut content)
            .with_context(|| format!("failed to read archive entry {relative_path}"))?;
        entries.push(TxSourceEntry { relative_path, content });
    }

    let tx = TxRestore::new(working_tree, ignore, cancel);
    tx.run(&entries)
}

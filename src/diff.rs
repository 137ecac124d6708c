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

use std::cmp::Ordering;

use crate::cas::manifest::Manifest;

/// How one path's entry differs between two manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryDiff {
    Added,
    Removed,
    Changed,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    pub relative_path: String,
    pub kind: EntryDiff,
}

/// Structural diff between `from` and `to`: every path present in either
/// manifest appears exactly once, tagged by comparing chunk hash lists.
/// Both manifests' `files` are assumed sorted by `relative_path`, true of
/// every manifest this crate writes (`CompactPipe` sorts before saving).
pub fn diff_manifests(from: &Manifest, to: &Manifest) -> Vec<DiffEntry> {
    let mut result = Vec::new();
    let mut left = from.files.iter().peekable();
    let mut right = to.files.iter().peekable();

    loop {
        match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => match l.relative_path.cmp(&r.relative_path) {
                Ordering::Less => {
                    result.push(DiffEntry {
                        relative_path: l.relative_path.clone(),
                        kind: EntryDiff::Removed,
                    });
                    left.next();
                }
                Ordering::Greater => {
                    result.push(DiffEntry {
                        relative_path: r.relative_path.clone(),
                        kind: EntryDiff::Added,
                    });
                    right.next();
                }
                Ordering::Equal => {
                    let kind = if l.chunk_hashes == r.chunk_hashes {
                        EntryDiff::Unchanged
                    } else {
                        EntryDiff::Changed
                    };
                    result.push(DiffEntry {
                        relative_path: l.relative_path.clone(),
                        kind,
                    });
                    left.next();
                    right.next();
                }
            },
            (Some(l), None) => {
                result.push(DiffEntry {
                    relative_path: l.relative_path.clone(),
                    kind: EntryDiff::Removed,
                });
                left.next();
            }
            (None, Some(r)) => {
                result.push(DiffEntry {
                    relative_path: r.relative_path.clone(),
                    kind: EntryDiff::Added,
                });
                right.next();
            }
            (None, None) => break,
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cas::manifest::FileEntry;
    use crate::chunker::ChunkerParams;

    fn manifest(files: Vec<(&str, &str)>) -> Manifest {
        let entries = files
            .into_iter()
            .map(|(path, hash)| FileEntry {
                relative_path: path.to_string(),
                bytes: 1,
                chunk_hashes: vec![hash.to_string()],
            })
            .collect();
        Manifest::new(
            "root".to_string(),
            "orig".to_string(),
            ChunkerParams::new(1024, 256, 4096).unwrap(),
            3,
            entries,
            vec![],
        )
    }

    #[test]
    fn detects_added_removed_changed_and_unchanged() {
        let from = manifest(vec![("a.txt", "h1"), ("b.txt", "h2"), ("c.txt", "h3")]);
        let to = manifest(vec![("a.txt", "h1"), ("b.txt", "h2x"), ("d.txt", "h4")]);

        let entries = diff_manifests(&from, &to);
        let find = |path: &str| entries.iter().find(|e| e.relative_path == path).unwrap().kind;

        assert_eq!(find("a.txt"), EntryDiff::Unchanged);
        assert_eq!(find("b.txt"), EntryDiff::Changed);
        assert_eq!(find("c.txt"), EntryDiff::Removed);
        assert_eq!(find("d.txt"), EntryDiff::Added);
    }

    #[test]
    fn identical_manifests_diff_to_all_unchanged() {
        let from = manifest(vec![("a.txt", "h1"), ("b.txt", "h2")]);
        let to = from.clone();
        let entries = diff_manifests(&from, &to);
        assert!(entries.iter().all(|e| e.kind == EntryDiff::Unchanged));
    }
}

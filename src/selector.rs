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

use anyhow::{Result, bail};

use crate::error::RinneError;
use crate::global::SnapshotId;
use crate::layout::PathLayout;

/// Every snapshot id that has a directory under `space`, sorted ascending
/// (oldest first) by rendered id — which sorts chronologically for both id
/// formats since each starts with its UTC timestamp.
pub fn list_snapshot_ids(layout: &PathLayout, space: &str) -> Result<Vec<SnapshotId>> {
    let dir = layout.space_dir(space);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut ids: Vec<SnapshotId> = std::fs::read_dir(&dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().to_str().and_then(|s| s.parse::<SnapshotId>().ok()))
        .collect();
    ids.sort_by_key(|id| id.to_string());
    Ok(ids)
}

/// Resolves an id selector against a space's snapshots: an exact id wins;
/// else a unique prefix of any id; else `~N` for the Nth-from-newest
/// (`~0` is the newest).
pub fn resolve_selector(layout: &PathLayout, space: &str, selector: &str) -> Result<SnapshotId> {
    let ids = list_snapshot_ids(layout, space)?;

    if let Some(exact) = ids.iter().find(|id| id.to_string() == selector) {
        return Ok(exact.clone());
    }

    if let Some(rest) = selector.strip_prefix('~') {
        if let Ok(n) = rest.parse::<usize>() {
            if let Some(id) = ids.iter().rev().nth(n) {
                return Ok(id.clone());
            }
            bail!(RinneError::NotFound(format!(
                "space '{space}' has no snapshot {n} back from newest"
            )));
        }
    }

    let matches: Vec<&SnapshotId> = ids.iter().filter(|id| id.to_string().starts_with(selector)).collect();
    match matches.len() {
        0 => bail!(RinneError::NotFound(format!(
            "no snapshot in space '{space}' matches selector '{selector}'"
        ))),
        1 => Ok(matches[0].clone()),
        _ => bail!(RinneError::AmbiguousSelector {
            selector: selector.to_string(),
            matches: matches.iter().map(|id| id.to_string()).collect(),
        }),
    }
}

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

use anyhow::{Context, Result, bail};

use crate::error::RinneError;

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".tmp");
    path.with_file_name(name)
}

/// Write-to-temp-then-rename primitive. `overwrite=false` fails with
/// `RinneError::AlreadyExists` if `path` already exists; otherwise any
/// stale temp sibling is removed first, the callback writes into the temp
/// file, and the temp is renamed onto `path` only on success. If the
/// callback returns an error the temp file is deleted and `path` is left
/// untouched.
pub fn write_with<F>(path: &Path, overwrite: bool, write_fn: F) -> Result<()>
where
    F: FnOnce(&mut File) -> Result<()>,
{
    if !overwrite && path.exists() {
        bail!(RinneError::AlreadyExists(path.display().to_string()));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create parent directory for {}", path.display()))?;
    }

    let tmp_path = tmp_path_for(path);
    if tmp_path.exists() {
        std::fs::remove_file(&tmp_path).ok();
    }

    let result = (|| -> Result<()> {
        let mut file = File::create(&tmp_path)
            .with_context(|| format!("failed to create temp file {}", tmp_path.display()))?;
        write_fn(&mut file)?;
        file.sync_all()
            .with_context(|| format!("failed to sync temp file {}", tmp_path.display()))?;
        Ok(())
    })();

    match result {
        Ok(()) => {
            std::fs::rename(&tmp_path, path).with_context(|| {
                format!(
                    "failed to rename {} onto {}",
                    tmp_path.display(),
                    path.display()
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

/// Path-writer convenience: writes `data` atomically to `path`.
pub fn write_bytes(path: &Path, data: &[u8], overwrite: bool) -> Result<()> {
    write_with(path, overwrite, |file| {
        file.write_all(data)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    })
}

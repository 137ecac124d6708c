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

use std::path::PathBuf;

use anyhow::{Context, Result};
use rinne::commands::{GlobalArgs, cmd_init};
use tempfile::tempdir;

fn global_args(repo: PathBuf) -> GlobalArgs {
    GlobalArgs { repo, verbose: 0, quiet: true }
}

#[test]
fn init_creates_repo_layout() -> Result<()> {
    let tmp = tempdir()?;
    let repo_path = tmp.path().join("repo");
    std::fs::create_dir_all(&repo_path)?;

    let global = global_args(repo_path.clone());
    cmd_init::run(&global, &cmd_init::CmdArgs {}).with_context(|| "failed to run init")?;

    assert!(repo_path.join(".rinne").is_dir());
    assert!(repo_path.join(".rinne/config/repo.json").is_file());
    assert!(repo_path.join(".rinne/config/version.txt").is_file());
    assert!(repo_path.join(".rinne/store/manifests").is_dir());
    assert!(repo_path.join(".rinne/store/.meta").is_dir());
    assert!(repo_path.join(".rinne/store/.tmp").is_dir());

    Ok(())
}

#[test]
fn init_twice_fails() -> Result<()> {
    let tmp = tempdir()?;
    let repo_path = tmp.path().join("repo");
    std::fs::create_dir_all(&repo_path)?;

    let global = global_args(repo_path.clone());
    cmd_init::run(&global, &cmd_init::CmdArgs {})?;
    let second = cmd_init::run(&global, &cmd_init::CmdArgs {});
    assert!(second.is_err());

    Ok(())
}

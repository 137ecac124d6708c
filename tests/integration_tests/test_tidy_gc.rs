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

use anyhow::Result;
use rinne::commands::{Backend, GlobalArgs, cmd_compact, cmd_gc, cmd_init, cmd_tidy};
use rinne::layout::PathLayout;
use rinne::selector::list_snapshot_ids;
use rinne::utils::CancellationToken;
use tempfile::tempdir;

fn global_args(repo: PathBuf) -> GlobalArgs {
    GlobalArgs { repo, verbose: 0, quiet: true }
}

fn compact_version(global: &GlobalArgs, input_dir: &std::path::Path, content: &[u8], cancel: &CancellationToken) -> Result<()> {
    std::fs::write(input_dir.join("a.txt"), content)?;
    cmd_compact::run(
        global,
        &cmd_compact::CmdArgs {
            input: input_dir.to_path_buf(),
            backend: Backend::Cas,
            space: None,
            message: String::new(),
            workers: 1,
            full_hash_check: false,
        },
        cancel,
    )
}

#[test]
fn tidy_keep_one_deletes_older_snapshots() -> Result<()> {
    let tmp = tempdir()?;
    let repo_path = tmp.path().join("repo");
    std::fs::create_dir_all(&repo_path)?;
    let global = global_args(repo_path.clone());
    cmd_init::run(&global, &cmd_init::CmdArgs {})?;

    let input_dir = tmp.path().join("project");
    std::fs::create_dir_all(&input_dir)?;

    let cancel = CancellationToken::new();
    compact_version(&global, &input_dir, b"v1", &cancel)?;
    compact_version(&global, &input_dir, b"v2", &cancel)?;
    compact_version(&global, &input_dir, b"v3", &cancel)?;

    let layout = PathLayout::new(repo_path.clone());
    assert_eq!(list_snapshot_ids(&layout, "main")?.len(), 3);

    cmd_tidy::run(
        &global,
        &cmd_tidy::CmdArgs {
            space: None,
            keep: Some(1),
            latest: None,
            before: None,
            matches: vec![],
            gc: false,
            dry_run: false,
        },
        &cancel,
    )?;

    assert_eq!(list_snapshot_ids(&layout, "main")?.len(), 1);
    Ok(())
}

#[test]
fn tidy_dry_run_does_not_delete_anything() -> Result<()> {
    let tmp = tempdir()?;
    let repo_path = tmp.path().join("repo");
    std::fs::create_dir_all(&repo_path)?;
    let global = global_args(repo_path.clone());
    cmd_init::run(&global, &cmd_init::CmdArgs {})?;

    let input_dir = tmp.path().join("project");
    std::fs::create_dir_all(&input_dir)?;

    let cancel = CancellationToken::new();
    compact_version(&global, &input_dir, b"v1", &cancel)?;
    compact_version(&global, &input_dir, b"v2", &cancel)?;

    let layout = PathLayout::new(repo_path.clone());
    cmd_tidy::run(
        &global,
        &cmd_tidy::CmdArgs {
            space: None,
            keep: Some(0),
            latest: None,
            before: None,
            matches: vec![],
            gc: false,
            dry_run: true,
        },
        &cancel,
    )?;

    assert_eq!(list_snapshot_ids(&layout, "main")?.len(), 2);
    Ok(())
}

#[test]
fn gc_removes_blobs_left_unreferenced_after_tidy() -> Result<()> {
    let tmp = tempdir()?;
    let repo_path = tmp.path().join("repo");
    std::fs::create_dir_all(&repo_path)?;
    let global = global_args(repo_path.clone());
    cmd_init::run(&global, &cmd_init::CmdArgs {})?;

    let input_dir = tmp.path().join("project");
    std::fs::create_dir_all(&input_dir)?;

    let cancel = CancellationToken::new();
    compact_version(&global, &input_dir, &vec![1u8; 2 * 1024 * 1024], &cancel)?;
    compact_version(&global, &input_dir, &vec![2u8; 2 * 1024 * 1024], &cancel)?;

    let layout = PathLayout::new(repo_path.clone());
    cmd_tidy::run(
        &global,
        &cmd_tidy::CmdArgs {
            space: None,
            keep: Some(1),
            latest: None,
            before: None,
            matches: vec![],
            gc: false,
            dry_run: false,
        },
        &cancel,
    )?;
    assert_eq!(list_snapshot_ids(&layout, "main")?.len(), 1);

    cmd_gc::run(&global, &cmd_gc::CmdArgs { space: None, dry_run: false }, &cancel)?;
    assert!(layout.refcount_file().is_file());

    Ok(())
}

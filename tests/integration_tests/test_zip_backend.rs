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
use rinne::commands::{Backend, GlobalArgs, cmd_compact, cmd_init, cmd_log, cmd_restore};
use rinne::utils::CancellationToken;
use tempfile::tempdir;

fn global_args(repo: PathBuf) -> GlobalArgs {
    GlobalArgs { repo, verbose: 0, quiet: true }
}

#[test]
fn zip_backend_snapshot_then_restore_round_trips() -> Result<()> {
    let tmp = tempdir()?;
    let repo_path = tmp.path().join("repo");
    std::fs::create_dir_all(&repo_path)?;
    let global = global_args(repo_path.clone());
    cmd_init::run(&global, &cmd_init::CmdArgs {})?;

    let input_dir = tmp.path().join("project");
    std::fs::create_dir_all(input_dir.join("nested"))?;
    std::fs::write(input_dir.join("nested/note.txt"), b"archived contents\n")?;

    let cancel = CancellationToken::new();
    cmd_compact::run(
        &global,
        &cmd_compact::CmdArgs {
            input: input_dir.clone(),
            backend: Backend::Zip,
            space: None,
            message: "zip snapshot".to_string(),
            workers: 1,
            full_hash_check: false,
        },
        &cancel,
    )?;

    let output_dir = tmp.path().join("restored");
    cmd_restore::run(
        &global,
        &cmd_restore::CmdArgs {
            output: output_dir.clone(),
            backend: Backend::Zip,
            space: None,
            selector: "~0".to_string(),
            paths: vec![],
            workers: 1,
        },
        &cancel,
    )?;

    assert_eq!(std::fs::read_to_string(output_dir.join("nested/note.txt"))?, "archived contents\n");

    Ok(())
}

#[test]
fn zip_backend_log_lists_two_snapshots_newest_first() -> Result<()> {
    let tmp = tempdir()?;
    let repo_path = tmp.path().join("repo");
    std::fs::create_dir_all(&repo_path)?;
    let global = global_args(repo_path.clone());
    cmd_init::run(&global, &cmd_init::CmdArgs {})?;

    let input_dir = tmp.path().join("project");
    std::fs::create_dir_all(&input_dir)?;
    std::fs::write(input_dir.join("a.txt"), b"v1")?;

    let cancel = CancellationToken::new();
    let compact_args = cmd_compact::CmdArgs {
        input: input_dir.clone(),
        backend: Backend::Zip,
        space: None,
        message: String::new(),
        workers: 1,
        full_hash_check: false,
    };
    cmd_compact::run(&global, &compact_args, &cancel)?;
    std::fs::write(input_dir.join("a.txt"), b"v2")?;
    cmd_compact::run(&global, &compact_args, &cancel)?;

    let chain = rinne::chain::ChainMeta::new(rinne::layout::PathLayout::new(repo_path.clone())).load_chain("main")?;
    assert_eq!(chain.len(), 2);

    cmd_log::run(&global, &cmd_log::CmdArgs { backend: Backend::Zip, space: None })?;

    Ok(())
}

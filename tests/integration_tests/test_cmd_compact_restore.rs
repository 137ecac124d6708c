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

use anyhow::{Context, Result};
use rinne::commands::{Backend, GlobalArgs, cmd_compact, cmd_init, cmd_restore};
use rinne::utils::CancellationToken;
use tempfile::tempdir;

fn global_args(repo: PathBuf) -> GlobalArgs {
    GlobalArgs { repo, verbose: 0, quiet: true }
}

fn write_tree(root: &Path) {
    std::fs::create_dir_all(root.join("docs")).unwrap();
    std::fs::write(root.join("docs/readme.txt"), b"hello from rinne\n").unwrap();
    std::fs::write(root.join("asset.bin"), vec![7u8; 64 * 1024]).unwrap();
}

#[test]
fn compact_then_restore_round_trips_file_contents() -> Result<()> {
    let tmp = tempdir()?;
    let repo_path = tmp.path().join("repo");
    std::fs::create_dir_all(&repo_path)?;
    let global = global_args(repo_path.clone());
    cmd_init::run(&global, &cmd_init::CmdArgs {})?;

    let input_dir = tmp.path().join("project");
    write_tree(&input_dir);

    let cancel = CancellationToken::new();
    let compact_args = cmd_compact::CmdArgs {
        input: input_dir.clone(),
        backend: Backend::Cas,
        space: None,
        message: "first snapshot".to_string(),
        workers: 2,
        full_hash_check: false,
    };
    cmd_compact::run(&global, &compact_args, &cancel).with_context(|| "compact failed")?;

    let output_dir = tmp.path().join("restored");
    let restore_args = cmd_restore::CmdArgs {
        output: output_dir.clone(),
        backend: Backend::Cas,
        space: None,
        selector: "~0".to_string(),
        paths: vec![],
        workers: 2,
    };
    cmd_restore::run(&global, &restore_args, &cancel).with_context(|| "restore failed")?;

    assert_eq!(
        std::fs::read(output_dir.join("docs/readme.txt"))?,
        std::fs::read(input_dir.join("docs/readme.txt"))?,
    );
    assert_eq!(
        std::fs::read(output_dir.join("asset.bin"))?,
        std::fs::read(input_dir.join("asset.bin"))?,
    );

    Ok(())
}

#[test]
fn restore_with_path_selector_restricts_output() -> Result<()> {
    let tmp = tempdir()?;
    let repo_path = tmp.path().join("repo");
    std::fs::create_dir_all(&repo_path)?;
    let global = global_args(repo_path.clone());
    cmd_init::run(&global, &cmd_init::CmdArgs {})?;

    let input_dir = tmp.path().join("project");
    write_tree(&input_dir);

    let cancel = CancellationToken::new();
    cmd_compact::run(
        &global,
        &cmd_compact::CmdArgs {
            input: input_dir.clone(),
            backend: Backend::Cas,
            space: None,
            message: String::new(),
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
            backend: Backend::Cas,
            space: None,
            selector: "~0".to_string(),
            paths: vec!["asset.bin".to_string()],
            workers: 1,
        },
        &cancel,
    )?;

    assert!(output_dir.join("asset.bin").is_file());
    assert!(!output_dir.join("docs/readme.txt").exists());

    Ok(())
}

#[test]
fn second_compact_reuses_cached_chunks_for_unchanged_files() -> Result<()> {
    let tmp = tempdir()?;
    let repo_path = tmp.path().join("repo");
    std::fs::create_dir_all(&repo_path)?;
    let global = global_args(repo_path.clone());
    cmd_init::run(&global, &cmd_init::CmdArgs {})?;

    let input_dir = tmp.path().join("project");
    write_tree(&input_dir);

    let cancel = CancellationToken::new();
    let args = cmd_compact::CmdArgs {
        input: input_dir.clone(),
        backend: Backend::Cas,
        space: None,
        message: String::new(),
        workers: 1,
        full_hash_check: false,
    };
    cmd_compact::run(&global, &args, &cancel)?;

    std::fs::write(input_dir.join("docs/readme.txt"), b"hello from rinne\n")?;
    cmd_compact::run(&global, &args, &cancel)?;

    let output_dir = tmp.path().join("restored");
    cmd_restore::run(
        &global,
        &cmd_restore::CmdArgs {
            output: output_dir.clone(),
            backend: Backend::Cas,
            space: None,
            selector: "~0".to_string(),
            paths: vec![],
            workers: 1,
        },
        &cancel,
    )?;
    assert_eq!(std::fs::read_to_string(output_dir.join("docs/readme.txt"))?, "hello from rinne\n");

    Ok(())
}

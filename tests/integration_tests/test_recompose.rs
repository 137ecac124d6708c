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
use rinne::commands::{Backend, GlobalArgs, cmd_compact, cmd_init, cmd_recompose, cmd_restore};
use rinne::utils::CancellationToken;
use tempfile::tempdir;

fn global_args(repo: PathBuf) -> GlobalArgs {
    GlobalArgs { repo, verbose: 0, quiet: true }
}

#[test]
fn recompose_merges_two_spaces_left_wins() -> Result<()> {
    let tmp = tempdir()?;
    let repo_path = tmp.path().join("repo");
    std::fs::create_dir_all(&repo_path)?;
    let global = global_args(repo_path.clone());
    cmd_init::run(&global, &cmd_init::CmdArgs {})?;

    let cancel = CancellationToken::new();

    let frontend_dir = tmp.path().join("frontend");
    std::fs::create_dir_all(&frontend_dir)?;
    std::fs::write(frontend_dir.join("shared.txt"), b"frontend wins")?;
    std::fs::write(frontend_dir.join("app.js"), b"console.log(1)")?;
    cmd_compact::run(
        &global,
        &cmd_compact::CmdArgs {
            input: frontend_dir.clone(),
            backend: Backend::Cas,
            space: Some("frontend".to_string()),
            message: String::new(),
            workers: 1,
            full_hash_check: false,
        },
        &cancel,
    )?;

    let backend_dir = tmp.path().join("backend");
    std::fs::create_dir_all(&backend_dir)?;
    std::fs::write(backend_dir.join("shared.txt"), b"backend loses")?;
    std::fs::write(backend_dir.join("server.py"), b"print(1)")?;
    cmd_compact::run(
        &global,
        &cmd_compact::CmdArgs {
            input: backend_dir.clone(),
            backend: Backend::Cas,
            space: Some("backend".to_string()),
            message: String::new(),
            workers: 1,
            full_hash_check: false,
        },
        &cancel,
    )?;

    cmd_recompose::run(
        &global,
        &cmd_recompose::CmdArgs {
            sources: vec!["frontend:~0".to_string(), "backend:~0".to_string()],
            target_space: "merged".to_string(),
            hydration: cmd_recompose::HydrationArg::Ephemeral,
            workers: 1,
        },
        &cancel,
    )?;

    let output_dir = tmp.path().join("merged-out");
    cmd_restore::run(
        &global,
        &cmd_restore::CmdArgs {
            output: output_dir.clone(),
            backend: Backend::Cas,
            space: Some("merged".to_string()),
            selector: "~0".to_string(),
            paths: vec![],
            workers: 1,
        },
        &cancel,
    )?;

    assert_eq!(std::fs::read_to_string(output_dir.join("shared.txt"))?, "frontend wins");
    assert!(output_dir.join("app.js").is_file());
    assert!(output_dir.join("server.py").is_file());

    Ok(())
}

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

pub mod cmd_compact;
pub mod cmd_diff;
pub mod cmd_gc;
pub mod cmd_init;
pub mod cmd_log;
pub mod cmd_recompose;
pub mod cmd_restore;
pub mod cmd_show;
pub mod cmd_tidy;

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::error::RinneError;
use crate::global::SnapshotId;
use crate::layout::PathLayout;
use crate::config::RepoConfig;
use crate::utils::CancellationToken;

/// Which storage model a `compact`/`restore`/`log` invocation targets.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Zip,
    Cas,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Repository root. Defaults to the current directory.
    #[arg(long, short = 'C', global = true, default_value = ".")]
    pub repo: PathBuf,

    /// Increase logging verbosity; may be repeated.
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

impl GlobalArgs {
    pub fn apply_verbosity(&self) {
        let level = if self.quiet { 0 } else { 1 + self.verbose as u32 };
        crate::global::set_verbosity(level);
    }
}

#[derive(Parser, Debug)]
#[command(name = "rinne", about = "Snapshot-based history manager for project trees", version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new repository in the current directory.
    Init(cmd_init::CmdArgs),
    /// Take a point-in-time snapshot of a directory.
    Compact(cmd_compact::CmdArgs),
    /// Materialise a snapshot onto a working tree.
    Restore(cmd_restore::CmdArgs),
    /// List a space's snapshots.
    Log(cmd_log::CmdArgs),
    /// Print a snapshot's manifest/metadata summary.
    Show(cmd_show::CmdArgs),
    /// Show which files changed between two snapshots.
    Diff(cmd_diff::CmdArgs),
    /// Merge snapshots from one or more spaces into a new snapshot.
    Recompose(cmd_recompose::CmdArgs),
    /// Apply a retention policy to a space, optionally running garbage collection.
    Tidy(cmd_tidy::CmdArgs),
    /// Reclaim unreferenced blobs from the CAS store.
    Gc(cmd_gc::CmdArgs),
}

pub fn dispatch(cli: &Cli, cancel: &CancellationToken) -> Result<()> {
    cli.global.apply_verbosity();
    match &cli.command {
        Commands::Init(args) => cmd_init::run(&cli.global, args),
        Commands::Compact(args) => cmd_compact::run(&cli.global, args, cancel),
        Commands::Restore(args) => cmd_restore::run(&cli.global, args, cancel),
        Commands::Log(args) => cmd_log::run(&cli.global, args),
        Commands::Show(args) => cmd_show::run(&cli.global, args),
        Commands::Diff(args) => cmd_diff::run(&cli.global, args),
        Commands::Recompose(args) => cmd_recompose::run(&cli.global, args, cancel),
        Commands::Tidy(args) => cmd_tidy::run(&cli.global, args, cancel),
        Commands::Gc(args) => cmd_gc::run(&cli.global, args, cancel),
    }
}

/// Opens an existing repository's layout and config, failing with
/// `RinneError::NotFound` if `global.repo` has no `.rinne` directory.
pub(crate) fn open_repo(global: &GlobalArgs) -> Result<(PathLayout, RepoConfig)> {
    let layout = PathLayout::new(global.repo.clone());
    if !layout.rinne_dir().is_dir() {
        bail!(RinneError::NotFound(format!(
            "no rinne repository found at {}",
            global.repo.display()
        )));
    }
    let config = RepoConfig::load(&layout.repo_config_file())?;
    Ok((layout, config))
}

/// Resolves a selector against the ZIP backend's hash chain for `space`.
/// Mirrors `selector::resolve_selector`'s exact/prefix/`~N` rules, since the
/// ZIP backend's records live under `zip_meta_dir`, not the CAS backend's
/// `space_dir` that `selector.rs` walks.
pub(crate) fn resolve_zip_selector(layout: &PathLayout, space: &str, selector: &str) -> Result<SnapshotId> {
    let chain = crate::chain::ChainMeta::new(layout.clone()).load_chain(space)?;
    let ids: Vec<SnapshotId> = chain.iter().filter_map(|r| r.id.parse().ok()).collect();

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

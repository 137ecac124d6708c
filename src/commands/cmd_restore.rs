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

use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::cas::store::CasStore;
use crate::chain::zip_backend;
use crate::ignore::{IgnoreMatcher, IgnoreRules};
use crate::pipeline::restore::{RestoreInput, RestorePipe};
use crate::selector::resolve_selector;
use crate::ui;
use crate::utils::CancellationToken;

use super::{Backend, GlobalArgs, open_repo, resolve_zip_selector};

#[derive(Args, Debug)]
#[clap(about = "Materialise a snapshot onto a working tree")]
pub struct CmdArgs {
    /// Directory to restore into.
    pub output: PathBuf,

    /// Storage backend to read from.
    #[arg(long, value_enum, default_value = "cas")]
    pub backend: Backend,

    /// Space the snapshot belongs to.
    #[arg(long)]
    pub space: Option<String>,

    /// Snapshot selector: exact id, unique id prefix, or `~N` for N back from newest.
    #[arg(long, default_value = "~0")]
    pub selector: String,

    /// Restrict restore to specific relative paths. Restores everything if empty.
    #[arg(long = "path")]
    pub paths: Vec<String>,

    /// Worker thread count. 0 means use available cores.
    #[arg(long, default_value_t = 0)]
    pub workers: usize,
}

pub fn run(global_args: &GlobalArgs, args: &CmdArgs, cancel: &CancellationToken) -> Result<()> {
    let (layout, config) = open_repo(global_args)?;
    let space = layout.resolve_space(args.space.as_deref())?;

    match args.backend {
        Backend::Zip => {
            let id = resolve_zip_selector(&layout, &space, &args.selector)?;
            let ignore_rules = IgnoreRules::from_file(&layout.rinneignore_file())?.with_builtin_defaults();
            let ignore = IgnoreMatcher::build(&ignore_rules)?;
            fs::create_dir_all(&args.output)?;
            zip_backend::restore(&layout, &space, &id, &args.output, &ignore, cancel)?;
            ui::cli::log!("restored {} from space {} into {}", id, space.bold(), args.output.display());
        }
        Backend::Cas => {
            let id = resolve_selector(&layout, &space, &args.selector)?;
            let store = CasStore::with_params(layout.clone(), config.directory_depth, config.zstd_level)?;
            let manifest_path = layout.manifest_file(&id);
            let restore_input = RestoreInput {
                manifest_path,
                output_dir: args.output.clone(),
                workers: args.workers,
                selectors: args.paths.clone(),
                cancel,
            };
            let pipe = RestorePipe::new(&store);
            let manifest = pipe.run(&restore_input)?;
            ui::cli::log!(
                "restored {} file(s) from {} into {}",
                manifest.file_count,
                id,
                args.output.display()
            );
        }
    }
    Ok(())
}

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

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::tidy::{self, RetentionSelector, TidyInput};
use crate::ui;
use crate::utils::CancellationToken;

use super::{GlobalArgs, open_repo};

#[derive(Args, Debug)]
#[clap(about = "Reclaim unreferenced blobs from the CAS store")]
pub struct CmdArgs {
    /// Space whose manifests anchor the reference count. Defaults to the repository's default space.
    #[arg(long)]
    pub space: Option<String>,

    /// Report what would be freed without deleting anything.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

pub fn run(global_args: &GlobalArgs, args: &CmdArgs, cancel: &CancellationToken) -> Result<()> {
    let (layout, _config) = open_repo(global_args)?;
    let space = layout.resolve_space(args.space.as_deref())?;

    let input = TidyInput {
        layout,
        space: space.clone(),
        selector: RetentionSelector::Keep(usize::MAX),
        run_gc: true,
        dry_run: args.dry_run,
        cancel,
    };

    let report = tidy::run(&input)?;
    let gc = report.gc.unwrap_or_default();
    ui::cli::log!(
        "{} examined {} blob(s), {} deletable ({} byte(s)) in space {}",
        if args.dry_run { "gc (dry run)" } else { "gc" },
        gc.examined,
        gc.deletable,
        gc.bytes_freed,
        space.bold()
    );

    Ok(())
}

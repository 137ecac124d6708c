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

use crate::cas::manifest::Manifest;
use crate::diff::{EntryDiff, diff_manifests};
use crate::selector::resolve_selector;
use crate::ui;

use super::{GlobalArgs, open_repo};

#[derive(Args, Debug)]
#[clap(about = "Show which files changed between two snapshots")]
pub struct CmdArgs {
    /// Earlier snapshot selector.
    pub from: String,
    /// Later snapshot selector.
    pub to: String,

    /// Space both snapshots belong to.
    #[arg(long)]
    pub space: Option<String>,
}

pub fn run(global_args: &GlobalArgs, args: &CmdArgs) -> Result<()> {
    let (layout, _config) = open_repo(global_args)?;
    let space = layout.resolve_space(args.space.as_deref())?;

    let from_id = resolve_selector(&layout, &space, &args.from)?;
    let to_id = resolve_selector(&layout, &space, &args.to)?;

    let from_manifest = Manifest::load(&layout.manifest_file(&from_id))?;
    let to_manifest = Manifest::load(&layout.manifest_file(&to_id))?;

    let entries = diff_manifests(&from_manifest, &to_manifest);
    for entry in &entries {
        if entry.kind == EntryDiff::Unchanged {
            continue;
        }
        let (sign, text) = match entry.kind {
            EntryDiff::Added => ("+", entry.relative_path.green()),
            EntryDiff::Removed => ("-", entry.relative_path.red()),
            EntryDiff::Changed => ("~", entry.relative_path.yellow()),
            EntryDiff::Unchanged => unreachable!(),
        };
        ui::cli::log!("{sign} {text}");
    }

    Ok(())
}

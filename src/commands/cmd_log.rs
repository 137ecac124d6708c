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

use crate::chain::ChainMeta;
use crate::selector::list_snapshot_ids;
use crate::ui;

use super::{Backend, GlobalArgs, open_repo};

#[derive(Args, Debug)]
#[clap(about = "List a space's snapshots")]
pub struct CmdArgs {
    /// Storage backend to list from.
    #[arg(long, value_enum, default_value = "cas")]
    pub backend: Backend,

    /// Space to list. Defaults to the repository's default space.
    #[arg(long)]
    pub space: Option<String>,
}

pub fn run(global_args: &GlobalArgs, args: &CmdArgs) -> Result<()> {
    let (layout, _config) = open_repo(global_args)?;
    let space = layout.resolve_space(args.space.as_deref())?;

    match args.backend {
        Backend::Zip => {
            let chain = ChainMeta::new(layout).load_chain(&space)?;
            if chain.is_empty() {
                ui::cli::log!("space '{}' has no snapshots", space);
            }
            for record in chain.iter().rev() {
                ui::cli::log!("{}  {}  {}", record.id.bold(), record.utc.to_rfc3339(), record.message);
            }
        }
        Backend::Cas => {
            let ids = list_snapshot_ids(&layout, &space)?;
            if ids.is_empty() {
                ui::cli::log!("space '{}' has no snapshots", space);
            }
            for id in ids.iter().rev() {
                ui::cli::log!("{}", id.to_string().bold());
            }
        }
    }
    Ok(())
}

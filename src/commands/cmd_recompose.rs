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

use anyhow::{Result, anyhow};
use clap::Args;
use colored::Colorize;

use crate::cas::store::CasStore;
use crate::global::SystemClock;
use crate::recompose::{self, RecomposeInput, RecomposeSource, SourceHydration};
use crate::ui;
use crate::utils::CancellationToken;

use super::{GlobalArgs, open_repo};

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum HydrationArg {
    Ephemeral,
    Auto,
    Fail,
}

impl From<HydrationArg> for SourceHydration {
    fn from(value: HydrationArg) -> Self {
        match value {
            HydrationArg::Ephemeral => SourceHydration::EphemeralHydrate,
            HydrationArg::Auto => SourceHydration::AutoHydrate,
            HydrationArg::Fail => SourceHydration::Fail,
        }
    }
}

#[derive(Args, Debug)]
#[clap(about = "Merge snapshots from one or more spaces into a new snapshot")]
pub struct CmdArgs {
    /// Sources as "space:selector" pairs, earliest-priority first.
    #[arg(required = true)]
    pub sources: Vec<String>,

    /// Space the merged snapshot is written into.
    #[arg(long)]
    pub target_space: String,

    /// What to do with a source snapshot that has no materialised payload.
    #[arg(long, value_enum, default_value = "ephemeral")]
    pub hydration: HydrationArg,

    /// Worker thread count for any hydration restores. 0 means use available cores.
    #[arg(long, default_value_t = 0)]
    pub workers: usize,
}

pub fn run(global_args: &GlobalArgs, args: &CmdArgs, cancel: &CancellationToken) -> Result<()> {
    let (layout, _config) = open_repo(global_args)?;
    let store = CasStore::new(layout.clone());

    let sources = args
        .sources
        .iter()
        .map(|raw| {
            let (space, selector) = raw
                .split_once(':')
                .ok_or_else(|| anyhow!("source '{raw}' must be formatted as 'space:selector'"))?;
            Ok(RecomposeSource {
                space: space.to_string(),
                selector: selector.to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let clock = SystemClock;
    let input = RecomposeInput {
        layout,
        store: &store,
        sources,
        target_space: args.target_space.clone(),
        hydration: args.hydration.into(),
        workers: args.workers,
        clock: &clock,
        cancel,
    };

    let new_id = recompose::run(&input)?;
    ui::cli::log!(
        "recomposed into space {} as {}",
        args.target_space.bold(),
        new_id.to_string().bold().green()
    );
    Ok(())
}

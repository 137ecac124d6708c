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
use crate::selector::resolve_selector;
use crate::snapshot_meta::SnapshotMeta;
use crate::ui;

use super::{GlobalArgs, open_repo};

#[derive(Args, Debug)]
#[clap(about = "Print a snapshot's manifest and metadata summary")]
pub struct CmdArgs {
    /// Snapshot selector: exact id, unique id prefix, or `~N` for N back from newest.
    #[arg(default_value = "~0")]
    pub selector: String,

    /// Space the snapshot belongs to.
    #[arg(long)]
    pub space: Option<String>,
}

pub fn run(global_args: &GlobalArgs, args: &CmdArgs) -> Result<()> {
    let (layout, _config) = open_repo(global_args)?;
    let space = layout.resolve_space(args.space.as_deref())?;
    let id = resolve_selector(&layout, &space, &args.selector)?;

    let manifest = Manifest::load(&layout.manifest_file(&id))?;
    let meta_path = layout.snapshot_meta_file(&space, &id);
    let meta = if meta_path.is_file() { Some(SnapshotMeta::load(&meta_path)?) } else { None };

    ui::cli::log!("{} {}", "snapshot".bold(), id);
    ui::cli::log!("  space:       {space}");
    ui::cli::log!("  root hash:   {}", manifest.original_sha256);
    ui::cli::log!("  files:       {}", manifest.file_count);
    ui::cli::log!("  total bytes: {}", manifest.total_bytes);
    ui::cli::log!(
        "  chunk sizes: avg {} / min {} / max {}",
        manifest.avg_size_bytes,
        manifest.min_size_bytes,
        manifest.max_size_bytes
    );
    if let Some(meta) = meta {
        ui::cli::log!("  snapshot hash (meta): {}", meta.snapshot_hash);
    }

    Ok(())
}

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

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use crate::cas::meta_cache::FileMetaCache;
use crate::cas::store::CasStore;
use crate::chain::zip_backend;
use crate::global::{SnapshotId, SystemClock};
use crate::ignore::{IgnoreMatcher, IgnoreRules};
use crate::pipeline::compact::{CompactInput, CompactPipe};
use crate::snapshot_meta::SnapshotMeta;
use crate::ui;
use crate::utils::CancellationToken;

use super::{Backend, GlobalArgs, open_repo};

#[derive(Args, Debug)]
#[clap(about = "Take a point-in-time snapshot of a directory")]
pub struct CmdArgs {
    /// Directory to snapshot.
    #[arg(default_value = ".")]
    pub input: PathBuf,

    /// Storage backend to write into.
    #[arg(long, value_enum, default_value = "cas")]
    pub backend: Backend,

    /// Space to append the snapshot to. Defaults to the repository's default space.
    #[arg(long)]
    pub space: Option<String>,

    /// Free-text message recorded alongside the snapshot.
    #[arg(long, default_value = "")]
    pub message: String,

    /// Worker thread count. 0 means use available cores.
    #[arg(long, default_value_t = 0)]
    pub workers: usize,

    /// Re-hash files even when cached metadata suggests they are unchanged.
    #[arg(long, default_value_t = false)]
    pub full_hash_check: bool,
}

pub fn run(global_args: &GlobalArgs, args: &CmdArgs, cancel: &CancellationToken) -> Result<()> {
    let (layout, config) = open_repo(global_args)?;
    let space = layout.resolve_space(args.space.as_deref())?;
    let ignore_rules = IgnoreRules::from_file(&layout.rinneignore_file())?.with_builtin_defaults();
    let ignore = IgnoreMatcher::build(&ignore_rules)?;

    match args.backend {
        Backend::Zip => {
            let clock = SystemClock;
            let record = zip_backend::snapshot(
                &layout,
                &space,
                &args.input,
                &ignore,
                &ignore_rules.exclude,
                args.message.clone(),
                &clock,
                cancel,
            )?;
            ui::cli::log!(
                "compacted {} into space {} as {}",
                args.input.display(),
                space.bold(),
                record.id.bold().green()
            );
        }
        Backend::Cas => {
            let store = CasStore::with_params(layout.clone(), config.directory_depth, config.zstd_level)?;
            let meta_cache = FileMetaCache::open(&layout.store_meta_dir().join("file_meta.sqlite3"))?;
            let clock = SystemClock;
            let id = SnapshotId::new_time_uuid(&clock);

            let snapshot_dir = layout.snapshot_dir(&space, &id);
            fs::create_dir_all(&snapshot_dir)
                .with_context(|| format!("failed to create {}", snapshot_dir.display()))?;

            let manifest_path = layout.manifest_file(&id);
            let compact_input = CompactInput {
                input_dir: args.input.clone(),
                manifest_path: manifest_path.clone(),
                params: config.chunker_params()?,
                zstd_level: config.zstd_level,
                workers: args.workers,
                full_hash_check: args.full_hash_check,
                ignore: &ignore,
                cancel,
            };

            let pipe = CompactPipe::new(&store, &meta_cache);
            let manifest = pipe.run(&compact_input)?;

            let meta = SnapshotMeta::new(manifest.original_sha256.clone(), manifest.file_count, manifest.total_bytes);
            meta.save(&layout.snapshot_meta_file(&space, &id))?;

            ui::cli::log!(
                "compacted {} into space {} as {}",
                args.input.display(),
                space.bold(),
                id.to_string().bold().green()
            );
        }
    }
    Ok(())
}

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

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;

use crate::error::RinneError;
use crate::tidy::{self, RetentionSelector, TidyInput};
use crate::ui;
use crate::utils::CancellationToken;

use super::{GlobalArgs, open_repo};

#[derive(Args, Debug)]
#[clap(about = "Apply a retention policy to a space")]
pub struct CmdArgs {
    /// Space to tidy. Defaults to the repository's default space.
    #[arg(long)]
    pub space: Option<String>,

    /// Keep only the N newest snapshots, deleting the rest.
    #[arg(long)]
    pub keep: Option<usize>,

    /// Delete all but the N newest snapshots (alias semantics differ from `--keep`
    /// only in which snapshots are reported as selected, per the underlying selector).
    #[arg(long)]
    pub latest: Option<usize>,

    /// Delete snapshots older than this RFC3339 timestamp.
    #[arg(long)]
    pub before: Option<String>,

    /// Delete snapshots whose rendered id matches every given glob.
    #[arg(long = "match")]
    pub matches: Vec<String>,

    /// Also run garbage collection on the blob store afterwards.
    #[arg(long, default_value_t = false)]
    pub gc: bool,

    /// Report what would be deleted without deleting anything.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

pub fn run(global_args: &GlobalArgs, args: &CmdArgs, cancel: &CancellationToken) -> Result<()> {
    let (layout, _config) = open_repo(global_args)?;
    let space = layout.resolve_space(args.space.as_deref())?;

    let selector = if let Some(n) = args.keep {
        RetentionSelector::Keep(n)
    } else if let Some(n) = args.latest {
        RetentionSelector::Latest(n)
    } else if let Some(before) = &args.before {
        let parsed: DateTime<Utc> = before
            .parse()
            .map_err(|_| RinneError::InvalidArgument(format!("'{before}' is not an RFC3339 timestamp")))?;
        RetentionSelector::Before(parsed)
    } else if !args.matches.is_empty() {
        RetentionSelector::Match(args.matches.clone())
    } else {
        bail!(RinneError::InvalidArgument(
            "one of --keep, --latest, --before, or --match is required".to_string()
        ));
    };

    let input = TidyInput {
        layout,
        space: space.clone(),
        selector,
        run_gc: args.gc,
        dry_run: args.dry_run,
        cancel,
    };

    let report = tidy::run(&input)?;
    ui::cli::log!(
        "{} {} snapshot(s) from space {}",
        if args.dry_run { "would delete" } else { "deleted" },
        report.deleted.len(),
        space.bold()
    );
    for (id, reason) in &report.delete_failures {
        ui::cli::warning!("failed to delete {id}: {reason}");
    }
    if let Some(gc) = &report.gc {
        ui::cli::log!(
            "gc examined {} blob(s), freed {} byte(s) across {} blob(s)",
            gc.examined,
            gc.bytes_freed,
            gc.deletable
        );
    }

    Ok(())
}

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

use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;

use crate::config::RepoConfig;
use crate::error::RinneError;
use crate::layout::PathLayout;
use crate::ui;

use super::GlobalArgs;

const REPO_VERSION: &str = "1";

#[derive(Args, Debug)]
#[clap(about = "Initialize a new repository")]
pub struct CmdArgs {}

pub fn run(global_args: &GlobalArgs, _args: &CmdArgs) -> Result<()> {
    let layout = PathLayout::new(global_args.repo.clone());
    if layout.rinne_dir().is_dir() {
        bail!(RinneError::AlreadyExists(format!(
            "a repository already exists at {}",
            layout.rinne_dir().display()
        )));
    }

    fs::create_dir_all(layout.config_dir())?;
    fs::create_dir_all(layout.logs_dir())?;
    fs::create_dir_all(layout.temp_dir())?;
    fs::create_dir_all(layout.store_meta_dir())?;
    fs::create_dir_all(layout.store_tmp_dir())?;
    fs::create_dir_all(layout.manifests_dir())?;

    RepoConfig::default().save(&layout.repo_config_file())?;
    fs::write(layout.version_file(), REPO_VERSION)?;

    ui::cli::log!(
        "initialized rinne repository in {}",
        layout.rinne_dir().display().to_string().bold()
    );
    Ok(())
}

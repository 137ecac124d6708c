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

use clap::Parser;

use rinne::commands::{Cli, dispatch};
use rinne::error::RinneError;
use rinne::ui;
use rinne::utils::CancellationToken;

fn main() {
    let cli = Cli::parse();
    let cancel = CancellationToken::new();

    let handler_cancel = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_cancel.cancel()) {
        ui::cli::warning!("failed to install Ctrl-C handler: {e}");
    }

    if let Err(e) = dispatch(&cli, &cancel) {
        ui::cli::error!("{e}");
        let exit_code = e.downcast_ref::<RinneError>().map(RinneError::exit_code).unwrap_or(1);
        std::process::exit(exit_code);
    }
}

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

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

pub const PROGRESS_REFRESH_RATE_HZ: u8 = 10;
const SPINNER_TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ";

/// Verbosity-gated logging macros, mirroring `ui::cli::log!`/`warning!` from
/// the upstream tool this crate's logging style is modeled on.
pub mod cli {
    macro_rules! log {
        ($($arg:tt)*) => {{
            if $crate::global::verbosity() >= 1 {
                println!($($arg)*);
            }
        }};
    }

    macro_rules! verbose_1 {
        ($($arg:tt)*) => {{
            if $crate::global::verbosity() >= 2 {
                println!($($arg)*);
            }
        }};
    }

    macro_rules! warning {
        ($($arg:tt)*) => {{
            if $crate::global::verbosity() >= 1 {
                use colored::Colorize;
                println!("{} {}", "warning:".yellow().bold(), format!($($arg)*));
            }
        }};
    }

    macro_rules! error {
        ($($arg:tt)*) => {{
            use colored::Colorize;
            eprintln!("{} {}", "error:".red().bold(), format!($($arg)*));
        }};
    }

    pub(crate) use {error, log, verbose_1, warning};
}

/// Draw target shared by every progress bar this crate creates, so all of
/// them redraw at the same rate instead of fighting each other for frames.
pub fn default_bar_draw_target() -> ProgressDrawTarget {
    if crate::global::verbosity() == 0 {
        ProgressDrawTarget::hidden()
    } else {
        ProgressDrawTarget::stderr_with_hz(PROGRESS_REFRESH_RATE_HZ)
    }
}

/// An indeterminate spinner for phases whose total size isn't known up
/// front (scanning a working tree, restitching a chain).
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_draw_target(default_bar_draw_target());
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .expect("static template is valid")
            .tick_chars(SPINNER_TICK_CHARS),
    );
    bar.set_message(message.into());
    bar.enable_steady_tick(Duration::from_millis(1000 / PROGRESS_REFRESH_RATE_HZ as u64));
    bar
}

/// A counted progress bar for phases with a known item count (files chunked,
/// blobs restored, snapshots scanned during tidy/gc).
pub fn counted_bar(len: u64, message: impl Into<String>) -> ProgressBar {
    let bar = ProgressBar::new(len);
    bar.set_draw_target(default_bar_draw_target());
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:30.cyan/white}] {pos}/{len}")
            .expect("static template is valid")
            .progress_chars("=> "),
    );
    bar.set_message(message.into());
    bar
}

/// A byte-counted progress bar, for phases where the unit the user cares
/// about is bytes moved rather than items processed (compact/restore).
pub fn bytes_bar(total_bytes: u64, message: impl Into<String>) -> ProgressBar {
    let bar = ProgressBar::new(total_bytes);
    bar.set_draw_target(default_bar_draw_target());
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:30.cyan/white}] {bytes}/{total_bytes} ({bytes_per_sec}, eta {eta})")
            .expect("static template is valid")
            .progress_chars("=> "),
    );
    bar.set_message(message.into());
    bar
}

pub(crate) use cli::{error, log, verbose_1, warning};

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

pub mod atomic_file;
pub mod cas;
pub mod chain;
pub mod chunker;
pub mod commands;
pub mod config;
pub mod diff;
pub mod error;
pub mod global;
pub mod hashing;
pub mod ignore;
pub mod layout;
pub mod pipeline;
pub mod recompose;
pub mod restorer;
pub mod selector;
pub mod snapshot_meta;
pub mod tidy;
pub mod ui;
pub mod utils;

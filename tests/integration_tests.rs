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

#[path = "integration_tests/test_cmd_init.rs"]
mod test_cmd_init;

#[path = "integration_tests/test_cmd_compact_restore.rs"]
mod test_cmd_compact_restore;

#[path = "integration_tests/test_zip_backend.rs"]
mod test_zip_backend;

#[path = "integration_tests/test_tidy_gc.rs"]
mod test_tidy_gc;

#[path = "integration_tests/test_recompose.rs"]
mod test_recompose;

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

use std::path::PathBuf;

use thiserror::Error;

/// The structured error kinds a caller may want to branch on. Leaf and pipe
/// functions build these and bubble them up via `anyhow`; callers that need
/// to discriminate use `anyhow::Error::downcast_ref::<RinneError>()`.
#[derive(Debug, Error)]
pub enum RinneError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("corrupt data: {0}")]
    Corrupt(String),

    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("unsafe path escapes root: {path}")]
    UnsafePath { path: PathBuf },

    #[error("failed to write to store: {0}")]
    StoreWriteFailed(String),

    #[error("I/O failed: {0}")]
    IoFailed(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("ambiguous selector {selector:?}: matches {matches:?}")]
    AmbiguousSelector {
        selector: String,
        matches: Vec<String>,
    },

    #[error("value out of range: {0}")]
    OutOfRange(String),
}

impl RinneError {
    pub fn exit_code(&self) -> i32 {
        match self {
            RinneError::Cancelled => 130,
            _ => 1,
        }
    }
}

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

use crate::utils::size;

// -- Concurrency --
/// 0 means "use the available core count".
pub const DEFAULT_WORKERS: usize = 0;

// -- Chunking (FastCDC, §4.5) --
pub const MIN_CHUNK_SIZE: u64 = 512 * size::KiB;
pub const AVG_CHUNK_SIZE: u64 = size::MiB;
pub const MAX_CHUNK_SIZE: u64 = 8 * size::MiB;

// -- Hashing --
/// Upper bound on the pooled read buffer used by HashStreams / chunking.
pub const MAX_STREAM_BUFFER_SIZE: usize = 64 * size::MiB as usize;
/// Default pooled buffer size.
pub const DEFAULT_STREAM_BUFFER_SIZE: usize = size::MiB as usize;

// -- CasStore --
pub const DEFAULT_ZSTD_LEVEL: i32 = 3;
pub const MIN_ZSTD_LEVEL: i32 = 1;
pub const MAX_ZSTD_LEVEL: i32 = 22;
/// Number of hex-digit pairs that become nested directories under the blob store.
pub const DEFAULT_DIRECTORY_DEPTH: usize = 2;

// -- FileMetaCache --
/// How many staged rows accumulate before a batched commit during compact.
pub const META_CACHE_COMMIT_BATCH_SIZE: usize = 4096;

// -- Display --
pub const DEFAULT_VERBOSITY: u32 = 1;
pub const SHORT_SNAPSHOT_ID_LEN: usize = 8;

// -- Garbage collection --
pub const DEFAULT_GC_TOLERANCE: f32 = 0.0;

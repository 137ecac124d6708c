/*
 * Copyright (C) 2024 Javier Lancha Vázquez
 *
 * This program is free software: you can redistribute it and/or modify it
 * under the terms of the GNU General Public License as published by the Free
 * Software Foundation, either version 3 of the License, or (at your option)
 * any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of  MERCHANTABILITY or
 * FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
 * more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program.  If not, see <http://www.gnu.org/licenses/>.
 */

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::global::defaults::DEFAULT_STREAM_BUFFER_SIZE;
use crate::utils::CancellationToken;

/// One-shot hash of a byte buffer. Output is upper-case hex, per §4.4.
pub fn hash_bytes(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    hex_upper(&digest)
}

/// Lower-case hex digest, used wherever a hash is a content-addressing key
/// (chunk hash, blob filename, manifest `ChunkHashes`) rather than a
/// HashStreams result surfaced to a caller.
pub fn hash_bytes_lower(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Incremental hasher over an arbitrary byte stream. Wraps `Sha256` so
/// callers needn't depend on `sha2` directly.
pub struct IncrementalHasher {
    inner: Sha256,
}

impl Default for IncrementalHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl IncrementalHasher {
    pub fn new() -> Self {
        Self {
            inner: Sha256::new(),
        }
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.inner.update(chunk);
    }

    pub fn finalize_hex(self) -> String {
        hex_upper(&self.inner.finalize())
    }
}

/// Streams `reader` through SHA-256 using a pooled buffer (default 1 MiB,
/// capped at 64 MiB), checking `cancel` between reads.
pub fn hash_reader(mut reader: impl Read, cancel: &CancellationToken) -> Result<String> {
    let mut hasher = IncrementalHasher::new();
    let mut buf = vec![0u8; DEFAULT_STREAM_BUFFER_SIZE];
    loop {
        cancel.check()?;
        let n = reader
            .read(&mut buf)
            .context("failed reading stream to hash")?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize_hex())
}

pub fn hash_file(path: &Path, cancel: &CancellationToken) -> Result<String> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    hash_reader(file, cancel)
}

/// Ordered-multi-file hash: iterates `paths` (already code-point-ordered by
/// the caller) and appends each file's raw bytes into a single running
/// SHA-256. This is the "root hash" / `OriginalSha256` computation.
pub fn hash_ordered_files<'a>(
    paths: impl IntoIterator<Item = &'a Path>,
    cancel: &CancellationToken,
) -> Result<String> {
    let mut hasher = IncrementalHasher::new();
    let mut buf = vec![0u8; DEFAULT_STREAM_BUFFER_SIZE];
    for path in paths {
        cancel.check()?;
        let mut file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        loop {
            cancel.check()?;
            let n = file
                .read(&mut buf)
                .with_context(|| format!("failed reading {}", path.display()))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
    }
    Ok(hasher.finalize_hex())
}

/// A write-through sink: forwards every byte written to an inner writer
/// while also hashing it. Used so a copy loop can compute a hash without a
/// second pass over the data.
pub struct HashingWriter<W: Write> {
    inner: W,
    hasher: Sha256,
}

impl<W: Write> HashingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
        }
    }

    pub fn finish(self) -> (W, String) {
        let hex = hex_upper(&self.hasher.finalize());
        (self.inner, hex)
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

fn hex_upper(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{b:02X}"));
    }
    s
}

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

use std::io::Read;
use std::sync::OnceLock;

use anyhow::{Context, Result, bail};

use crate::error::RinneError;

const SPLITMIX_GAMMA: u64 = 0x9E3779B97F4A7C15;

/// The 256-entry rolling-hash gear table, derived deterministically from a
/// SplitMix64 expansion of `0x9E3779B97F4A7C15` (every entry forced
/// non-zero). Computed once and cached.
fn gear_table() -> &'static [u64; 256] {
    static TABLE: OnceLock<[u64; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0u64; 256];
        let mut state = SPLITMIX_GAMMA;
        for slot in table.iter_mut() {
            state = state.wrapping_add(SPLITMIX_GAMMA);
            let mut z = state;
            z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
            z ^= z >> 31;
            *slot = if z == 0 { 1 } else { z };
        }
        table
    })
}

/// FastCDC parameters. Invariant: `0 < min_size <= avg_size <= max_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerParams {
    pub avg_size: u64,
    pub min_size: u64,
    pub max_size: u64,
}

impl ChunkerParams {
    pub fn new(avg_size: u64, min_size: u64, max_size: u64) -> Result<Self> {
        if !(0 < min_size && min_size <= avg_size && avg_size <= max_size) {
            bail!(RinneError::InvalidArgument(format!(
                "chunker parameters must satisfy 0 < min({min_size}) <= avg({avg_size}) <= max({max_size})"
            )));
        }
        Ok(Self {
            avg_size,
            min_size,
            max_size,
        })
    }

    fn mask_small(&self) -> u64 {
        mask_for_bits(round_log2(self.avg_size))
    }

    fn mask_large(&self) -> u64 {
        mask_for_bits(round_log2(self.avg_size).saturating_sub(1))
    }
}

fn round_log2(value: u64) -> u32 {
    if value <= 1 {
        return 0;
    }
    (value as f64).log2().round() as u32
}

fn mask_for_bits(k: u32) -> u64 {
    if k == 0 {
        0
    } else {
        (1u64 << k) - 1
    }
}

/// One produced chunk: its index within the stream, and its plaintext bytes.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub index: usize,
    pub bytes: Vec<u8>,
}

/// Streaming content-defined chunker. Reads from an underlying `Read`
/// source and emits variable-size chunks per the FastCDC rolling hash
/// boundary rule (§4.5). Restartable from a fresh source, not resumable
/// mid-stream.
pub struct FastCdcChunker<R: Read> {
    reader: R,
    params: ChunkerParams,
    gear: &'static [u64; 256],
    next_index: usize,
    read_buf: Vec<u8>,
    pending: Vec<u8>,
    pending_pos: usize,
    eof: bool,
}

const READ_CHUNK: usize = 64 * 1024;

impl<R: Read> FastCdcChunker<R> {
    pub fn new(reader: R, params: ChunkerParams) -> Self {
        Self {
            reader,
            params,
            gear: gear_table(),
            next_index: 0,
            read_buf: vec![0u8; READ_CHUNK],
            pending: Vec::new(),
            pending_pos: 0,
            eof: false,
        }
    }

    fn fill_pending(&mut self) -> Result<bool> {
        if self.pending_pos > 0 {
            self.pending.drain(0..self.pending_pos);
            self.pending_pos = 0;
        }
        if self.eof {
            return Ok(!self.pending.is_empty());
        }
        let n = self
            .reader
            .read(&mut self.read_buf)
            .context("failed reading chunker source")?;
        if n == 0 {
            self.eof = true;
        } else {
            self.pending.extend_from_slice(&self.read_buf[..n]);
        }
        Ok(!self.pending.is_empty() || !self.eof)
    }

    /// Produces the next chunk, or `None` at end of stream.
    pub fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        let mask_small = self.params.mask_small();
        let mask_large = self.params.mask_large();
        let min_size = self.params.min_size as usize;
        let avg_size = self.params.avg_size as usize;
        let max_size = self.params.max_size as usize;

        let mut out: Vec<u8> = Vec::new();
        let mut hash: u64 = 0;

        loop {
            if self.pending_pos >= self.pending.len() {
                let more = self.fill_pending()?;
                if !more {
                    break;
                }
                if self.pending_pos >= self.pending.len() {
                    break;
                }
            }

            let byte = self.pending[self.pending_pos];
            self.pending_pos += 1;
            out.push(byte);

            let len = out.len();
            if len >= max_size {
                break;
            }

            hash = (hash << 1).wrapping_add(self.gear[byte as usize]);

            if len >= min_size {
                let mask = if len < avg_size { mask_small } else { mask_large };
                if mask == 0 || (hash & mask) == 0 {
                    break;
                }
            }
        }

        if out.is_empty() {
            return Ok(None);
        }

        let index = self.next_index;
        self.next_index += 1;
        Ok(Some(Chunk { index, bytes: out }))
    }
}

impl<R: Read> Iterator for FastCdcChunker<R> {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_chunk() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

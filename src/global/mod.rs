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

pub mod defaults;

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::{Result, bail};
use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;

use crate::error::RinneError;

static VERBOSITY: AtomicU32 = AtomicU32::new(defaults::DEFAULT_VERBOSITY);

pub fn set_verbosity(level: u32) {
    VERBOSITY.store(level, Ordering::Relaxed);
}

pub fn verbosity() -> u32 {
    VERBOSITY.load(Ordering::Relaxed)
}

/// A source of the current time, injectable so tests can produce
/// deterministic snapshot ids instead of reading the system clock.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}

#[derive(Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that always returns the same instant, for tests.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

const SEQUENCE_TIME_FORMAT: &str = "%Y%m%dT%H%M%S%3f";
const TIME_UUID_TIME_FORMAT: &str = "%Y%m%dT%H%M%S";

/// A snapshot identifier. Two formats coexist (see design notes): the
/// ZIP backend mints zero-padded sequence ids, the CAS backend mints
/// time+UUIDv7 ids. Both parse and compare; ordering within a space is
/// lexicographic on the rendered string, which is sortable in both forms.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SnapshotId {
    Sequence { seq: u32, utc: DateTime<Utc> },
    TimeUuid { utc: DateTime<Utc>, uuid: Uuid },
}

impl SnapshotId {
    pub fn new_sequence(seq: u32, clock: &dyn Clock) -> Self {
        SnapshotId::Sequence {
            seq,
            utc: clock.now_utc(),
        }
    }

    pub fn new_time_uuid(clock: &dyn Clock) -> Self {
        SnapshotId::TimeUuid {
            utc: clock.now_utc(),
            uuid: Uuid::now_v7(),
        }
    }

    pub fn utc(&self) -> DateTime<Utc> {
        match self {
            SnapshotId::Sequence { utc, .. } => *utc,
            SnapshotId::TimeUuid { utc, .. } => *utc,
        }
    }

    pub fn seq(&self) -> Option<u32> {
        match self {
            SnapshotId::Sequence { seq, .. } => Some(*seq),
            SnapshotId::TimeUuid { .. } => None,
        }
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotId::Sequence { seq, utc } => {
                write!(f, "{:08}_{}", seq, utc.format(SEQUENCE_TIME_FORMAT))
            }
            SnapshotId::TimeUuid { utc, uuid } => {
                write!(f, "{}Z_{}", utc.format(TIME_UUID_TIME_FORMAT), uuid)
            }
        }
    }
}

impl FromStr for SnapshotId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || RinneError::InvalidArgument(format!("'{s}' is not a valid snapshot id"));
        let (prefix, rest) = s.split_once('_').ok_or_else(invalid)?;

        if prefix.len() == 8 && prefix.bytes().all(|b| b.is_ascii_digit()) {
            let seq: u32 = prefix.parse().map_err(|_| invalid())?;
            let naive = NaiveDateTime::parse_from_str(rest, SEQUENCE_TIME_FORMAT)
                .map_err(|_| invalid())?;
            return Ok(SnapshotId::Sequence {
                seq,
                utc: naive.and_utc(),
            });
        }

        if let Some(time_part) = prefix.strip_suffix('Z') {
            let naive = NaiveDateTime::parse_from_str(time_part, TIME_UUID_TIME_FORMAT)
                .map_err(|_| invalid())?;
            let uuid = Uuid::parse_str(rest).map_err(|_| invalid())?;
            return Ok(SnapshotId::TimeUuid {
                utc: naive.and_utc(),
                uuid,
            });
        }

        bail!(invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn sequence_id_round_trips() {
        let clock = FixedClock(Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap());
        let id = SnapshotId::new_sequence(7, &clock);
        let rendered = id.to_string();
        assert!(rendered.starts_with("00000007_20250102T030405"));
        let parsed: SnapshotId = rendered.parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn time_uuid_id_round_trips() {
        let clock = FixedClock(Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap());
        let id = SnapshotId::new_time_uuid(&clock);
        let rendered = id.to_string();
        assert!(rendered.starts_with("20250102T030405Z_"));
        let parsed: SnapshotId = rendered.parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn sequence_ids_sort_by_seq() {
        let clock = FixedClock(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        let a = SnapshotId::new_sequence(1, &clock);
        let b = SnapshotId::new_sequence(2, &clock);
        assert!(a.to_string() < b.to_string());
    }

    #[test]
    fn invalid_id_is_rejected() {
        assert!("not-an-id".parse::<SnapshotId>().is_err());
    }
}

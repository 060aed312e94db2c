//! Append-only checkpoint series with point-in-time lookup.
//!
//! A series is strictly increasing in timepoint. Writing at the timepoint of
//! the last entry overwrites its value (several changes inside one block
//! coalesce into one checkpoint); writing earlier than the last entry is an
//! error. Entries are never removed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;

use tally_types::Timepoint;

use crate::error::VotesError;

/// A value recorded at a timepoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub timepoint: Timepoint,
    pub value: u128,
}

/// The history of a single value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckpointSeries {
    checkpoints: Vec<Checkpoint>,
}

impl CheckpointSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a series from stored entries, rejecting unordered input.
    pub fn from_checkpoints(checkpoints: Vec<Checkpoint>) -> Result<Self, VotesError> {
        for pair in checkpoints.windows(2) {
            if pair[1].timepoint <= pair[0].timepoint {
                return Err(VotesError::InvalidTimepoint {
                    timepoint: pair[1].timepoint,
                    last: pair[0].timepoint,
                });
            }
        }
        Ok(Self { checkpoints })
    }

    /// Record `value` at `timepoint`. Returns `(previous, new)`.
    pub fn push(&mut self, timepoint: Timepoint, value: u128) -> Result<(u128, u128), VotesError> {
        let previous = match self.checkpoints.last_mut() {
            Some(last) if last.timepoint > timepoint => {
                return Err(VotesError::InvalidTimepoint {
                    timepoint,
                    last: last.timepoint,
                });
            }
            Some(last) if last.timepoint == timepoint => {
                let previous = last.value;
                last.value = value;
                return Ok((previous, value));
            }
            Some(last) => last.value,
            None => 0,
        };
        self.checkpoints.push(Checkpoint { timepoint, value });
        Ok((previous, value))
    }

    /// Value of the latest entry with `timepoint <= query`, or zero.
    pub fn lookup(&self, timepoint: Timepoint) -> u128 {
        let pos = self
            .checkpoints
            .partition_point(|c| c.timepoint <= timepoint);
        self.value_before(pos)
    }

    /// Same result as [`lookup`](Self::lookup), probing recent history first.
    ///
    /// Governance reads mostly target recent timepoints, so for longer series
    /// the search first checks the entry `sqrt(len)` from the end and only
    /// falls back to the older half when the query precedes it.
    pub fn lookup_recent(&self, timepoint: Timepoint) -> u128 {
        let len = self.checkpoints.len();
        let mut low = 0;
        let mut high = len;

        if len > 5 {
            let mid = len - isqrt(len);
            if timepoint < self.checkpoints[mid].timepoint {
                high = mid;
            } else {
                low = mid + 1;
            }
        }

        let pos = low
            + self.checkpoints[low..high].partition_point(|c| c.timepoint <= timepoint);
        self.value_before(pos)
    }

    /// Most recent value, or zero for an empty series.
    pub fn latest(&self) -> u128 {
        self.checkpoints.last().map_or(0, |c| c.value)
    }

    pub fn latest_checkpoint(&self) -> Option<Checkpoint> {
        self.checkpoints.last().copied()
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    pub fn at(&self, pos: usize) -> Option<Checkpoint> {
        self.checkpoints.get(pos).copied()
    }

    pub fn as_slice(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    fn value_before(&self, pos: usize) -> u128 {
        if pos == 0 {
            0
        } else {
            self.checkpoints[pos - 1].value
        }
    }
}

/// One checkpoint series per key.
#[derive(Clone, Debug)]
pub struct CheckpointStore<K> {
    series: HashMap<K, CheckpointSeries>,
}

impl<K> Default for CheckpointStore<K> {
    fn default() -> Self {
        Self {
            series: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> CheckpointStore<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        key: &K,
        timepoint: Timepoint,
        value: u128,
    ) -> Result<(u128, u128), VotesError> {
        match self.series.get_mut(key) {
            Some(series) => series.push(timepoint, value),
            None => {
                let mut series = CheckpointSeries::new();
                let result = series.push(timepoint, value)?;
                self.series.insert(key.clone(), series);
                Ok(result)
            }
        }
    }

    pub fn lookup(&self, key: &K, timepoint: Timepoint) -> u128 {
        self.series.get(key).map_or(0, |s| s.lookup(timepoint))
    }

    pub fn lookup_recent(&self, key: &K, timepoint: Timepoint) -> u128 {
        self.series.get(key).map_or(0, |s| s.lookup_recent(timepoint))
    }

    pub fn latest(&self, key: &K) -> u128 {
        self.series.get(key).map_or(0, CheckpointSeries::latest)
    }

    pub fn series(&self, key: &K) -> Option<&CheckpointSeries> {
        self.series.get(key)
    }

    pub fn insert_series(&mut self, key: K, series: CheckpointSeries) {
        self.series.insert(key, series);
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.series.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &CheckpointSeries)> {
        self.series.iter()
    }
}

fn isqrt(n: usize) -> usize {
    if n < 2 {
        return n;
    }
    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

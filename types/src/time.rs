//! Timepoints and the clock abstraction.
//!
//! Checkpoints are indexed by an external logical clock: either a block
//! number or a Unix timestamp. The mode is chosen when a ledger is created and
//! stays fixed for its lifetime.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::TypesError;

/// A point on the external logical clock.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timepoint(u64);

impl Timepoint {
    pub const ZERO: Self = Self(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    /// The next timepoint, saturating at `u64::MAX`.
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Timepoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Timepoint {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Which unit the clock counts in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockMode {
    #[default]
    BlockNumber,
    Timestamp,
}

impl ClockMode {
    /// Machine-readable description in the ERC-6372 `CLOCK_MODE` format.
    pub fn description(&self) -> &'static str {
        match self {
            Self::BlockNumber => "mode=blocknumber&from=default",
            Self::Timestamp => "mode=timestamp",
        }
    }
}

impl FromStr for ClockMode {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blocknumber" => Ok(Self::BlockNumber),
            "timestamp" => Ok(Self::Timestamp),
            other => Err(TypesError::UnknownClockMode(other.to_string())),
        }
    }
}

/// Source of the current timepoint.
///
/// Must be monotonic: a ledger rejects any operation whose timepoint is
/// earlier than its last committed write.
pub trait Clock {
    fn timepoint(&self) -> Timepoint;

    fn mode(&self) -> ClockMode;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn timepoint(&self) -> Timepoint {
        (**self).timepoint()
    }

    fn mode(&self) -> ClockMode {
        (**self).mode()
    }
}

impl<T: Clock + ?Sized> Clock for Rc<T> {
    fn timepoint(&self) -> Timepoint {
        (**self).timepoint()
    }

    fn mode(&self) -> ClockMode {
        (**self).mode()
    }
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn timepoint(&self) -> Timepoint {
        (**self).timepoint()
    }

    fn mode(&self) -> ClockMode {
        (**self).mode()
    }
}

/// Wall-clock seconds since the Unix epoch, in [`ClockMode::Timestamp`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn timepoint(&self) -> Timepoint {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Timepoint(secs)
    }

    fn mode(&self) -> ClockMode {
        ClockMode::Timestamp
    }
}

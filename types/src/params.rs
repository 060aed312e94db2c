//! Ledger parameters fixed at instantiation.

use serde::{Deserialize, Serialize};

use crate::time::ClockMode;

/// Parameters of a voting-power ledger.
///
/// These are fixed for the lifetime of a ledger instance: changing the clock
/// mode or supply cap of a populated ledger would reinterpret its history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotesParams {
    /// Unit of the timepoints checkpoints are indexed by.
    pub clock_mode: ClockMode,

    /// Upper bound on the number of secondary delegatees per account.
    pub max_delegatees: usize,

    /// Upper bound on total supply of voting units.
    pub max_supply: u128,
}

impl VotesParams {
    pub const DEFAULT_MAX_DELEGATEES: usize = 32;

    /// Cap equal to the largest value representable in `bits` bits.
    pub fn supply_cap_for_bits(bits: u32) -> u128 {
        if bits >= 128 {
            u128::MAX
        } else {
            (1u128 << bits) - 1
        }
    }
}

impl Default for VotesParams {
    fn default() -> Self {
        Self {
            clock_mode: ClockMode::BlockNumber,
            max_delegatees: Self::DEFAULT_MAX_DELEGATEES,
            max_supply: u128::MAX,
        }
    }
}

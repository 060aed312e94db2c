//! Per-account ledger entity.

use tally_types::Address;

use crate::error::VotesError;
use crate::multi::SecondaryDelegations;

/// Everything the ledger knows about one account.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Account {
    pub(crate) units: u128,
    pub(crate) delegate: Option<Address>,
    pub(crate) nonce: u64,
    pub(crate) secondary: SecondaryDelegations,
}

impl Account {
    /// Raw voting units held.
    pub fn units(&self) -> u128 {
        self.units
    }

    /// Primary delegate, if any.
    pub fn delegate(&self) -> Option<&Address> {
        self.delegate.as_ref()
    }

    /// Next nonce a signed operation from this account must use.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn secondary(&self) -> &SecondaryDelegations {
        &self.secondary
    }

    /// Units not allocated to secondary delegatees; these follow the
    /// primary delegate. Allocations never exceed `units`: the sender lock
    /// and `restore` both reject that state, so the subtraction cannot clamp.
    pub fn free_units(&self) -> u128 {
        debug_assert!(self.secondary.allocated() <= self.units);
        self.units.saturating_sub(self.secondary.allocated())
    }

    pub(crate) fn check_nonce(&self, owner: &Address, nonce: u64) -> Result<(), VotesError> {
        if nonce != self.nonce {
            return Err(VotesError::InvalidNonce {
                account: *owner,
                expected: self.nonce,
            });
        }
        Ok(())
    }

    pub(crate) fn consume_nonce(&mut self) {
        self.nonce += 1;
    }
}

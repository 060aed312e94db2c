//! Voting units ledger and the balance hook.
//!
//! Every change to an account's voting units (mint, burn, transfer) comes in
//! through [`VotesLedger::transfer_voting_units`], which keeps the total
//! supply checkpointed and moves the matching votes between delegates.

use tally_types::{Address, Clock, Timepoint};

use crate::account::Account;
use crate::error::VotesError;
use crate::events::VotesEvent;
use crate::ledger::VotesLedger;

impl<C: Clock> VotesLedger<C> {
    /// Raw voting units held by `account`.
    pub fn get_voting_units(&self, account: &Address) -> u128 {
        self.accounts.get(account).map_or(0, Account::units)
    }

    /// Units not allocated to secondary delegatees.
    pub fn get_free_units(&self, account: &Address) -> u128 {
        self.accounts.get(account).map_or(0, Account::free_units)
    }

    pub fn get_total_supply(&self) -> u128 {
        self.total_supply.latest()
    }

    /// Total supply at a past timepoint.
    pub fn get_past_total_supply(&self, timepoint: Timepoint) -> Result<u128, VotesError> {
        self.ensure_past(timepoint)?;
        Ok(self.total_supply.lookup_recent(timepoint))
    }

    pub fn num_total_supply_checkpoints(&self) -> usize {
        self.total_supply.len()
    }

    /// Move `amount` voting units. `from = None` mints, `to = None` burns;
    /// the zero address is treated as `None` on either side.
    ///
    /// The sender may only move free units: units allocated to secondary
    /// delegatees stay locked until undelegated.
    pub fn transfer_voting_units(
        &mut self,
        from: Option<&Address>,
        to: Option<&Address>,
        amount: u128,
    ) -> Result<(), VotesError> {
        let from = from.copied().and_then(Address::non_zero);
        let to = to.copied().and_then(Address::non_zero);
        if from.is_none() && to.is_none() {
            return Ok(());
        }

        let now = self.begin()?;

        if let Some(sender) = from {
            let available = self.get_free_units(&sender);
            if amount > available {
                return Err(VotesError::ExceededAvailableUnits {
                    requested: amount,
                    available,
                });
            }
        }

        let supply = self.total_supply.latest();
        let new_supply = match (from, to) {
            (None, _) => {
                let cap = self.params().max_supply;
                match supply.checked_add(amount) {
                    Some(increased) if increased <= cap => increased,
                    increased => {
                        return Err(VotesError::ExceededSafeSupply {
                            increased_supply: increased.unwrap_or(u128::MAX),
                            cap,
                        })
                    }
                }
            }
            (_, None) => supply.checked_sub(amount).ok_or_else(|| {
                VotesError::Invariant(format!(
                    "burn of {amount} exceeds total supply {supply}"
                ))
            })?,
            _ => supply,
        };

        if new_supply != supply {
            let (previous, new) = self.total_supply.push(now, new_supply)?;
            tracing::trace!(previous, new, timepoint = %now, "total supply checkpoint");
        }
        if let Some(sender) = from {
            self.account_mut(&sender).units -= amount;
        }
        if let Some(receiver) = to {
            self.account_mut(&receiver).units += amount;
        }

        let from_delegate = from.and_then(|a| self.delegates(&a));
        let to_delegate = to.and_then(|a| self.delegates(&a));
        self.move_votes(from_delegate, to_delegate, amount, now)?;
        self.pending
            .push(VotesEvent::VotingUnitsTransferred { from, to, amount });

        tracing::debug!(from = ?from, to = ?to, amount, "voting units transferred");
        self.commit(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use tally_crypto::Eip712Domain;
    use tally_nullables::NullClock;
    use tally_types::VotesParams;

    fn addr(seed: u8) -> Address {
        Address::new([seed; 32])
    }

    fn ledger(params: VotesParams) -> (VotesLedger<Rc<NullClock>>, Rc<NullClock>) {
        let clock = Rc::new(NullClock::new(1));
        let domain = Eip712Domain {
            name: "Tally".into(),
            version: "1".into(),
            chain_id: 1,
            verifying_contract: Address::new([0xEE; 32]),
        };
        (VotesLedger::new(params, domain, clock.clone()).unwrap(), clock)
    }

    #[test]
    fn mint_burn_track_total_supply() {
        let (mut l, clock) = ledger(VotesParams::default());
        l.transfer_voting_units(None, Some(&addr(1)), 100).unwrap();
        clock.advance(1);
        l.transfer_voting_units(Some(&addr(1)), None, 30).unwrap();
        clock.advance(1);
        assert_eq!(l.get_total_supply(), 70);
        assert_eq!(l.get_past_total_supply(Timepoint::new(1)).unwrap(), 100);
        assert_eq!(l.get_past_total_supply(Timepoint::new(2)).unwrap(), 70);
        assert_eq!(l.get_voting_units(&addr(1)), 70);
    }

    #[test]
    fn mint_beyond_cap_fails() {
        let params = VotesParams {
            max_supply: VotesParams::supply_cap_for_bits(8),
            ..VotesParams::default()
        };
        let (mut l, _) = ledger(params);
        l.transfer_voting_units(None, Some(&addr(1)), 255).unwrap();
        assert!(matches!(
            l.transfer_voting_units(None, Some(&addr(1)), 1),
            Err(VotesError::ExceededSafeSupply { increased_supply: 256, cap: 255 })
        ));
        assert_eq!(l.get_total_supply(), 255);
    }

    #[test]
    fn supply_overflow_reports_saturated_value() {
        let (mut l, _) = ledger(VotesParams::default());
        l.transfer_voting_units(None, Some(&addr(1)), u128::MAX).unwrap();
        assert!(matches!(
            l.transfer_voting_units(None, Some(&addr(2)), 1),
            Err(VotesError::ExceededSafeSupply { increased_supply: u128::MAX, .. })
        ));
    }

    #[test]
    fn transfer_moves_votes_between_delegates() {
        let (mut l, _) = ledger(VotesParams::default());
        l.delegate(&addr(1), Some(&addr(1))).unwrap();
        l.delegate(&addr(2), Some(&addr(3))).unwrap();
        l.transfer_voting_units(None, Some(&addr(1)), 50).unwrap();
        l.transfer_voting_units(Some(&addr(1)), Some(&addr(2)), 20).unwrap();
        assert_eq!(l.get_votes(&addr(1)), 30);
        assert_eq!(l.get_votes(&addr(3)), 20);
    }

    #[test]
    fn allocated_units_are_locked() {
        let (mut l, _) = ledger(VotesParams::default());
        l.transfer_voting_units(None, Some(&addr(1)), 50).unwrap();
        l.multi_delegate(&addr(1), &[addr(9)], &[40]).unwrap();
        assert!(matches!(
            l.transfer_voting_units(Some(&addr(1)), Some(&addr(2)), 11),
            Err(VotesError::ExceededAvailableUnits { requested: 11, available: 10 })
        ));
        l.transfer_voting_units(Some(&addr(1)), Some(&addr(2)), 10).unwrap();
        assert_eq!(l.get_free_units(&addr(1)), 0);
    }

    #[test]
    fn burning_more_than_held_reports_free_units() {
        let (mut l, _) = ledger(VotesParams::default());
        l.transfer_voting_units(None, Some(&addr(1)), 5).unwrap();
        l.transfer_voting_units(None, Some(&addr(2)), 100).unwrap();
        assert!(matches!(
            l.transfer_voting_units(Some(&addr(1)), None, 10),
            Err(VotesError::ExceededAvailableUnits { requested: 10, available: 5 })
        ));
        assert_eq!(l.get_total_supply(), 105);
        assert_eq!(l.num_total_supply_checkpoints(), 1);
    }

    #[test]
    fn zero_address_is_mint_and_burn() {
        let (mut l, _) = ledger(VotesParams::default());
        l.transfer_voting_units(Some(&Address::ZERO), Some(&addr(1)), 5).unwrap();
        assert_eq!(l.get_total_supply(), 5);
        l.transfer_voting_units(Some(&addr(1)), Some(&Address::ZERO), 5).unwrap();
        assert_eq!(l.get_total_supply(), 0);
        l.transfer_voting_units(None, None, 5).unwrap();
        assert_eq!(l.get_total_supply(), 0);
    }
}

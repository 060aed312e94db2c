//! Partial delegation to multiple secondary delegatees.
//!
//! An account may route fixed unit amounts to a bounded list of secondary
//! delegatees. Whatever is left (the free units) keeps following the primary
//! delegate.
//!
//! The active list is an arena: a dense `Vec` plus an index map. Removal is
//! swap-and-pop, so list order changes across mutations and the index map can
//! lag behind the list. Every read goes through [`SecondaryDelegations::contains`],
//! which only trusts an index that points back at the same delegatee.

use std::collections::HashMap;

use tally_crypto::TypedPayload;
use tally_types::{Address, Authorization, Clock, Timepoint};

use crate::account::Account;
use crate::error::VotesError;
use crate::events::VotesEvent;
use crate::ledger::VotesLedger;

/// Active secondary allocations of one account.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SecondaryDelegations {
    list: Vec<Address>,
    index: HashMap<Address, usize>,
    units: HashMap<Address, u128>,
    allocated: u128,
}

impl SecondaryDelegations {
    /// Rebuild from `(delegatee, units)` pairs in list order.
    pub(crate) fn from_entries(entries: &[(Address, u128)]) -> Result<Self, VotesError> {
        let mut delegations = Self::default();
        for &(delegatee, units) in entries {
            if units == 0 || delegatee.is_zero() || delegations.contains(&delegatee) {
                return Err(VotesError::Snapshot(format!(
                    "invalid secondary delegation entry for {delegatee}"
                )));
            }
            if delegations.allocated.checked_add(units).is_none() {
                return Err(VotesError::Snapshot(format!(
                    "secondary allocations overflow at {delegatee}"
                )));
            }
            delegations.set(delegatee, units);
        }
        Ok(delegations)
    }

    /// Whether `delegatee` is active: the index must round-trip through the list.
    pub fn contains(&self, delegatee: &Address) -> bool {
        self.index
            .get(delegatee)
            .and_then(|&i| self.list.get(i))
            .is_some_and(|listed| listed == delegatee)
    }

    /// Units allocated to `delegatee`, zero when inactive.
    pub fn units_of(&self, delegatee: &Address) -> u128 {
        if !self.contains(delegatee) {
            return 0;
        }
        self.units.get(delegatee).copied().unwrap_or(0)
    }

    /// Sum of all active allocations.
    pub fn allocated(&self) -> u128 {
        self.allocated
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Active delegatees in current list order (not stable across mutations).
    pub fn as_slice(&self) -> &[Address] {
        &self.list
    }

    /// `(delegatee, units)` in current list order.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, u128)> + '_ {
        self.list.iter().map(|d| (d, self.units_of(d)))
    }

    /// Set the allocation for `delegatee`, adding, modifying or removing the
    /// entry. Returns the previous allocation.
    pub(crate) fn set(&mut self, delegatee: Address, units: u128) -> u128 {
        let previous = self.units_of(&delegatee);
        match (previous, units) {
            (0, 0) => {}
            (_, 0) => {
                self.remove(&delegatee);
            }
            (0, _) => {
                self.index.insert(delegatee, self.list.len());
                self.list.push(delegatee);
                self.units.insert(delegatee, units);
                self.allocated += units;
            }
            (_, _) => {
                self.units.insert(delegatee, units);
                self.allocated = self.allocated - previous + units;
            }
        }
        previous
    }

    /// Remove `delegatee` by swap-and-pop. Returns the units it held.
    pub(crate) fn remove(&mut self, delegatee: &Address) -> u128 {
        if !self.contains(delegatee) {
            return 0;
        }
        let Some(pos) = self.index.remove(delegatee) else {
            return 0;
        };
        self.list.swap_remove(pos);
        if let Some(moved) = self.list.get(pos) {
            self.index.insert(*moved, pos);
        }
        let units = self.units.remove(delegatee).unwrap_or(0);
        self.allocated -= units;
        units
    }
}

/// One staged allocation change inside a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct UnitChange {
    pub delegatee: Address,
    pub old: u128,
    pub new: u128,
}

/// Net effect of a batch on the account's free units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Settlement {
    /// Units returned to the free pool and the primary delegate.
    Refund(u128),
    /// Units taken from the free pool and the primary delegate.
    Debit(u128),
}

/// A validated-but-unapplied `multi_delegate` batch.
///
/// Built in one pass without touching the account, so increases and
/// decreases inside the same batch net out before capacity is checked.
#[derive(Debug)]
pub(crate) struct SettlementPlan {
    pub changes: Vec<UnitChange>,
    pub given: u128,
    pub removed: u128,
    pub resulting_len: usize,
}

impl SettlementPlan {
    pub fn build(
        current: &SecondaryDelegations,
        delegatees: &[Address],
        units: &[u128],
        available: u128,
    ) -> Result<Self, VotesError> {
        let overflow = || VotesError::ExceededAvailableUnits {
            requested: u128::MAX,
            available,
        };
        let mut staged: HashMap<Address, u128> = HashMap::new();
        let mut changes = Vec::with_capacity(delegatees.len());
        let mut given: u128 = 0;
        let mut removed: u128 = 0;

        for (delegatee, &new) in delegatees.iter().zip(units) {
            let old = staged
                .get(delegatee)
                .copied()
                .unwrap_or_else(|| current.units_of(delegatee));
            if new > old {
                given = given.checked_add(new - old).ok_or_else(overflow)?;
            } else {
                removed = removed
                    .checked_add(old - new)
                    .ok_or_else(overflow)?;
            }
            staged.insert(*delegatee, new);
            changes.push(UnitChange {
                delegatee: *delegatee,
                old,
                new,
            });
        }

        let added = staged
            .iter()
            .filter(|&(d, &u)| u > 0 && !current.contains(d))
            .count();
        let dropped = staged
            .iter()
            .filter(|&(d, &u)| u == 0 && current.contains(d))
            .count();

        Ok(Self {
            changes,
            given,
            removed,
            resulting_len: current.len() - dropped + added,
        })
    }

    /// Decide the net move against `available` free units.
    pub fn settle(&self, available: u128) -> Result<Settlement, VotesError> {
        if self.removed >= self.given {
            return Ok(Settlement::Refund(self.removed - self.given));
        }
        let deficit = self.given - self.removed;
        if deficit > available {
            return Err(VotesError::ExceededAvailableUnits {
                requested: deficit,
                available,
            });
        }
        Ok(Settlement::Debit(deficit))
    }
}

impl<C: Clock> VotesLedger<C> {
    /// Create, modify or remove secondary allocations for `account`.
    ///
    /// `units[i]` is the new total for `delegatees[i]`; zero removes it. The
    /// whole batch settles against free units once, so a batch that frees
    /// units on one delegatee and assigns them to another never fails on a
    /// transient shortfall.
    pub fn multi_delegate(
        &mut self,
        account: &Address,
        delegatees: &[Address],
        units: &[u128],
    ) -> Result<(), VotesError> {
        let now = self.begin()?;
        self.apply_multi_delegate(account, delegatees, units, now)?;
        self.commit(now);
        Ok(())
    }

    /// [`multi_delegate`](Self::multi_delegate) authorized by an off-chain
    /// signature over both lists in submitted order. Returns the signer.
    pub fn multi_delegate_by_sig(
        &mut self,
        delegatees: &[Address],
        units: &[u128],
        nonce: u64,
        expiry: Timepoint,
        authorization: &Authorization,
    ) -> Result<Address, VotesError> {
        let now = self.begin()?;
        let payload = TypedPayload::MultiDelegation {
            delegatees,
            units,
            nonce,
            expiry,
        };
        let signer = self.authenticate(&payload, authorization, now)?;
        self.apply_multi_delegate(&signer, delegatees, units, now)?;
        self.account_mut(&signer).consume_nonce();
        self.commit(now);
        Ok(signer)
    }

    /// Remove secondary allocations, refunding each to the primary delegate.
    /// Delegatees that are not active are skipped.
    pub fn multi_undelegate(
        &mut self,
        account: &Address,
        delegatees: &[Address],
    ) -> Result<(), VotesError> {
        let now = self.begin()?;
        self.apply_multi_undelegate(account, delegatees, now)?;
        self.commit(now);
        Ok(())
    }

    /// [`multi_undelegate`](Self::multi_undelegate) authorized by an off-chain
    /// signature over the delegatee list. Returns the signer.
    pub fn multi_undelegate_by_sig(
        &mut self,
        delegatees: &[Address],
        nonce: u64,
        expiry: Timepoint,
        authorization: &Authorization,
    ) -> Result<Address, VotesError> {
        let now = self.begin()?;
        let payload = TypedPayload::MultiUnDelegation {
            delegatees,
            nonce,
            expiry,
        };
        let signer = self.authenticate(&payload, authorization, now)?;
        self.apply_multi_undelegate(&signer, delegatees, now)?;
        self.account_mut(&signer).consume_nonce();
        self.commit(now);
        Ok(signer)
    }

    /// Page through the active secondary delegatees, `end` inclusive.
    ///
    /// List order changes whenever an entry is removed, so a caller that
    /// needs a complete listing must read all pages without mutations in
    /// between.
    pub fn multi_delegates(
        &self,
        account: &Address,
        start: usize,
        end: usize,
    ) -> Result<Vec<Address>, VotesError> {
        let list = self
            .accounts
            .get(account)
            .map_or(&[][..], |a| a.secondary.as_slice());
        if start > end || start >= list.len() {
            return Err(VotesError::StartIsBiggerThanEnd { start, end });
        }
        let end = end.min(list.len() - 1);
        Ok(list[start..=end].to_vec())
    }

    /// Units `account` has allocated to `delegatee` (zero when inactive).
    pub fn get_delegated_units(&self, account: &Address, delegatee: &Address) -> u128 {
        self.accounts
            .get(account)
            .map_or(0, |a| a.secondary.units_of(delegatee))
    }

    /// Whether `delegatee` is an active secondary delegatee of `account`.
    pub fn account_has_delegate(&self, account: &Address, delegatee: &Address) -> bool {
        self.accounts
            .get(account)
            .is_some_and(|a| a.secondary.contains(delegatee))
    }

    fn apply_multi_delegate(
        &mut self,
        account: &Address,
        delegatees: &[Address],
        units: &[u128],
        now: Timepoint,
    ) -> Result<(), VotesError> {
        if delegatees.len() != units.len() {
            return Err(VotesError::LengthMismatch {
                delegatees: delegatees.len(),
                units: units.len(),
            });
        }
        if delegatees.is_empty() {
            return Err(VotesError::NoDelegatesGiven);
        }
        if delegatees.iter().any(Address::is_zero) {
            return Err(VotesError::ZeroDelegatee);
        }

        let empty = Account::default();
        let current = self.accounts.get(account).unwrap_or(&empty);
        let available = current.free_units();
        let primary = current.delegate;
        let plan = SettlementPlan::build(&current.secondary, delegatees, units, available)?;
        if plan.resulting_len > self.params().max_delegatees {
            return Err(VotesError::TooManyDelegatees {
                max: self.params().max_delegatees,
            });
        }
        let settlement = plan.settle(available)?;

        let entry = self.account_mut(account);
        for change in &plan.changes {
            entry.secondary.set(change.delegatee, change.new);
        }

        for change in &plan.changes {
            if change.old == change.new {
                continue;
            }
            self.pending.push(VotesEvent::SecondaryDelegationChanged {
                delegator: *account,
                delegatee: change.delegatee,
                previous_units: change.old,
                new_units: change.new,
            });
            if change.new > change.old {
                self.move_votes(None, Some(change.delegatee), change.new - change.old, now)?;
            } else {
                self.move_votes(Some(change.delegatee), None, change.old - change.new, now)?;
            }
        }

        match settlement {
            Settlement::Debit(units) => self.move_votes(primary, None, units, now)?,
            Settlement::Refund(units) => self.move_votes(None, primary, units, now)?,
        }

        tracing::debug!(
            account = %account,
            items = plan.changes.len(),
            given = plan.given,
            removed = plan.removed,
            "secondary delegations updated"
        );
        Ok(())
    }

    fn apply_multi_undelegate(
        &mut self,
        account: &Address,
        delegatees: &[Address],
        now: Timepoint,
    ) -> Result<(), VotesError> {
        if delegatees.is_empty() {
            return Err(VotesError::NoDelegatesGiven);
        }
        let primary = self.accounts.get(account).and_then(|a| a.delegate);

        for delegatee in delegatees {
            let refunded = self
                .accounts
                .get_mut(account)
                .map_or(0, |a| a.secondary.remove(delegatee));
            if refunded == 0 {
                continue;
            }
            self.pending.push(VotesEvent::SecondaryDelegationChanged {
                delegator: *account,
                delegatee: *delegatee,
                previous_units: refunded,
                new_units: 0,
            });
            self.move_votes(Some(*delegatee), primary, refunded, now)?;
        }

        tracing::debug!(account = %account, items = delegatees.len(), "secondary delegations removed");
        Ok(())
    }
}

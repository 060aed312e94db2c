//! The voting-power ledger façade.
//!
//! `VotesLedger` owns every account, the vote and supply checkpoints, the
//! signing domain and the event bus. All mutation goes through `&mut self`
//! methods that follow the same shape:
//!
//! 1. [`begin`](VotesLedger::begin) reads the clock and rejects time running
//!    backwards, which is the only way a later checkpoint push could fail;
//! 2. every precondition is checked against staged values;
//! 3. state is written and [`commit`](VotesLedger::commit) dispatches the
//!    buffered events.
//!
//! An error returned from step 1 or 2 leaves the ledger untouched.

use std::collections::HashMap;

use tally_crypto::Eip712Domain;
use tally_types::{Address, Clock, Hash256, Timepoint, VotesParams};

use crate::account::Account;
use crate::checkpoints::{Checkpoint, CheckpointSeries};
use crate::error::VotesError;
use crate::events::{EventBus, VotesEvent};
use crate::projector::VotePowerProjector;

pub struct VotesLedger<C: Clock> {
    params: VotesParams,
    clock: C,
    domain: Eip712Domain,
    domain_separator: Hash256,
    pub(crate) accounts: HashMap<Address, Account>,
    pub(crate) projector: VotePowerProjector,
    pub(crate) total_supply: CheckpointSeries,
    pub(crate) last_write: Timepoint,
    events: EventBus,
    pub(crate) pending: Vec<VotesEvent>,
}

impl<C: Clock> VotesLedger<C> {
    /// Create an empty ledger. The clock must run in the mode `params` names.
    pub fn new(params: VotesParams, domain: Eip712Domain, clock: C) -> Result<Self, VotesError> {
        if clock.mode() != params.clock_mode {
            return Err(VotesError::ClockModeMismatch {
                expected: params.clock_mode,
                actual: clock.mode(),
            });
        }
        let domain_separator = domain.separator();
        tracing::debug!(
            clock_mode = ?params.clock_mode,
            max_delegatees = params.max_delegatees,
            separator = %domain_separator,
            "votes ledger created"
        );
        Ok(Self {
            params,
            clock,
            domain,
            domain_separator,
            accounts: HashMap::new(),
            projector: VotePowerProjector::new(),
            total_supply: CheckpointSeries::new(),
            last_write: Timepoint::ZERO,
            events: EventBus::new(),
            pending: Vec::new(),
        })
    }

    pub fn params(&self) -> &VotesParams {
        &self.params
    }

    pub fn domain(&self) -> &Eip712Domain {
        &self.domain
    }

    /// Separator every signed payload must be hashed under.
    pub fn domain_separator(&self) -> Hash256 {
        self.domain_separator
    }

    /// Current timepoint of the ledger's clock.
    pub fn clock(&self) -> Timepoint {
        self.clock.timepoint()
    }

    /// ERC-6372 style description of the clock.
    pub fn clock_mode(&self) -> &'static str {
        self.params.clock_mode.description()
    }

    /// Register a listener for committed events.
    pub fn subscribe(&mut self, listener: Box<dyn Fn(&VotesEvent) + Send + Sync>) {
        self.events.subscribe(listener);
    }

    pub fn account(&self, account: &Address) -> Option<&Account> {
        self.accounts.get(account)
    }

    /// Next nonce a signed operation from `account` must carry.
    pub fn nonces(&self, account: &Address) -> u64 {
        self.accounts.get(account).map_or(0, Account::nonce)
    }

    /// Current votes of a delegatee.
    pub fn get_votes(&self, account: &Address) -> u128 {
        self.projector.get_votes(account)
    }

    /// Votes of a delegatee at a past timepoint.
    pub fn get_past_votes(&self, account: &Address, timepoint: Timepoint) -> Result<u128, VotesError> {
        self.ensure_past(timepoint)?;
        Ok(self.projector.votes_at(account, timepoint))
    }

    pub fn num_checkpoints(&self, account: &Address) -> usize {
        self.projector.num_checkpoints(account)
    }

    /// The `pos`-th vote checkpoint of a delegatee.
    pub fn checkpoints(&self, account: &Address, pos: usize) -> Option<Checkpoint> {
        self.projector.checkpoint_at(account, pos)
    }

    /// Timepoint of the last committed write.
    pub fn last_write(&self) -> Timepoint {
        self.last_write
    }

    pub(crate) fn ensure_past(&self, timepoint: Timepoint) -> Result<(), VotesError> {
        let current = self.clock.timepoint();
        if timepoint >= current {
            return Err(VotesError::FutureLookup { timepoint, current });
        }
        Ok(())
    }

    /// Open a write: read the clock and reject it if it runs behind the last
    /// committed write.
    pub(crate) fn begin(&mut self) -> Result<Timepoint, VotesError> {
        let now = self.clock.timepoint();
        if now < self.last_write {
            return Err(VotesError::InvalidTimepoint {
                timepoint: now,
                last: self.last_write,
            });
        }
        self.pending.clear();
        Ok(now)
    }

    /// Close a write and hand buffered events to subscribers.
    pub(crate) fn commit(&mut self, now: Timepoint) {
        self.last_write = now;
        tracing::trace!(
            timepoint = %now,
            events = self.pending.len(),
            listeners = self.events.listener_count(),
            "operation committed"
        );
        for event in self.pending.drain(..) {
            self.events.emit(&event);
        }
    }

    pub(crate) fn account_mut(&mut self, account: &Address) -> &mut Account {
        self.accounts.entry(*account).or_default()
    }

    pub(crate) fn move_votes(
        &mut self,
        from: Option<Address>,
        to: Option<Address>,
        amount: u128,
        now: Timepoint,
    ) -> Result<(), VotesError> {
        self.projector
            .move_votes(from.as_ref(), to.as_ref(), amount, now, &mut self.pending)
    }

    /// Swap in restored state wholesale.
    pub(crate) fn replace_state(
        &mut self,
        accounts: HashMap<Address, Account>,
        projector: VotePowerProjector,
        total_supply: CheckpointSeries,
        last_write: Timepoint,
    ) {
        self.accounts = accounts;
        self.projector = projector;
        self.total_supply = total_supply;
        self.last_write = last_write;
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use tally_types::ClockMode;
    use std::sync::{Arc, Mutex};
    use tally_nullables::NullClock;

    fn domain() -> Eip712Domain {
        Eip712Domain {
            name: "Tally".into(),
            version: "1".into(),
            chain_id: 1,
            verifying_contract: Address::new([0xAA; 32]),
        }
    }

    fn addr(seed: u8) -> Address {
        Address::new([seed; 32])
    }

    #[test]
    fn rejects_clock_in_wrong_mode() {
        let clock = NullClock::with_mode(1, ClockMode::Timestamp);
        let err = VotesLedger::new(VotesParams::default(), domain(), clock).err();
        assert!(matches!(err, Some(VotesError::ClockModeMismatch { .. })));
    }

    #[test]
    fn past_reads_require_a_past_timepoint() {
        let clock = Rc::new(NullClock::new(5));
        let ledger = VotesLedger::new(VotesParams::default(), domain(), clock.clone()).unwrap();
        assert!(ledger.get_past_votes(&addr(1), Timepoint::new(4)).is_ok());
        assert!(matches!(
            ledger.get_past_votes(&addr(1), Timepoint::new(5)),
            Err(VotesError::FutureLookup { .. })
        ));
        clock.advance(1);
        assert!(ledger.get_past_votes(&addr(1), Timepoint::new(5)).is_ok());
    }

    #[test]
    fn clock_running_backwards_is_rejected() {
        let clock = Rc::new(NullClock::new(10));
        let mut ledger = VotesLedger::new(VotesParams::default(), domain(), clock.clone()).unwrap();
        ledger.transfer_voting_units(None, Some(&addr(1)), 5).unwrap();
        clock.set(9);
        assert!(matches!(
            ledger.transfer_voting_units(None, Some(&addr(1)), 5),
            Err(VotesError::InvalidTimepoint { .. })
        ));
        assert_eq!(ledger.get_voting_units(&addr(1)), 5);
    }

    #[test]
    fn events_reach_subscribers_after_commit() {
        let clock = Rc::new(NullClock::new(1));
        let mut ledger = VotesLedger::new(VotesParams::default(), domain(), clock).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        ledger.subscribe(Box::new(move |e| sink.lock().unwrap().push(e.clone())));

        ledger.delegate(&addr(1), Some(&addr(2))).unwrap();
        ledger.transfer_voting_units(None, Some(&addr(1)), 7).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            seen.as_slice(),
            &[
                VotesEvent::DelegateChanged {
                    delegator: addr(1),
                    from: None,
                    to: Some(addr(2)),
                },
                VotesEvent::DelegateVotesChanged {
                    delegate: addr(2),
                    previous: 0,
                    new: 7,
                },
                VotesEvent::VotingUnitsTransferred {
                    from: None,
                    to: Some(addr(1)),
                    amount: 7,
                },
            ]
        );
    }

    #[test]
    fn failed_operation_emits_nothing() {
        let clock = Rc::new(NullClock::new(1));
        let mut ledger = VotesLedger::new(VotesParams::default(), domain(), clock).unwrap();
        let seen = Arc::new(Mutex::new(0usize));
        let sink = seen.clone();
        ledger.subscribe(Box::new(move |_| *sink.lock().unwrap() += 1));
        assert!(ledger
            .transfer_voting_units(Some(&addr(1)), Some(&addr(2)), 1)
            .is_err());
        assert_eq!(*seen.lock().unwrap(), 0);
    }

    #[test]
    fn every_subscriber_sees_each_committed_event() {
        let clock = Rc::new(NullClock::new(1));
        let mut ledger = VotesLedger::new(VotesParams::default(), domain(), clock).unwrap();
        let seen = Arc::new(Mutex::new(0usize));
        for _ in 0..2 {
            let sink = seen.clone();
            ledger.subscribe(Box::new(move |_| *sink.lock().unwrap() += 1));
        }
        assert_eq!(ledger.events.listener_count(), 2);

        ledger.transfer_voting_units(None, Some(&addr(1)), 3).unwrap();
        assert_eq!(*seen.lock().unwrap(), 2);
        assert!(ledger.pending.is_empty());
    }
}

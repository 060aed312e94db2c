//! Primary delegation: each account names at most one delegate, which
//! receives all of the account's free units.

use tally_crypto::TypedPayload;
use tally_types::{Address, Authorization, Clock, Timepoint};

use crate::error::VotesError;
use crate::events::VotesEvent;
use crate::ledger::VotesLedger;

impl<C: Clock> VotesLedger<C> {
    /// Primary delegate of `account`. `None` is distinct from self-delegation.
    pub fn delegates(&self, account: &Address) -> Option<Address> {
        self.accounts.get(account).and_then(|a| a.delegate)
    }

    /// Set or clear the primary delegate of `account`, moving its free units'
    /// votes from the old delegate to the new one. The zero address clears
    /// the delegate.
    pub fn delegate(&mut self, account: &Address, delegatee: Option<&Address>) -> Result<(), VotesError> {
        let now = self.begin()?;
        self.apply_delegate(account, delegatee.copied().and_then(Address::non_zero), now)?;
        self.commit(now);
        Ok(())
    }

    /// [`delegate`](Self::delegate) authorized by an off-chain signature.
    /// The zero address in the signed payload clears the delegate. Returns
    /// the signer.
    pub fn delegate_by_sig(
        &mut self,
        delegatee: Option<&Address>,
        nonce: u64,
        expiry: Timepoint,
        authorization: &Authorization,
    ) -> Result<Address, VotesError> {
        let now = self.begin()?;
        let payload = TypedPayload::Delegation {
            delegatee: Address::or_zero(delegatee),
            nonce,
            expiry,
        };
        let signer = self.authenticate(&payload, authorization, now)?;
        self.apply_delegate(&signer, delegatee.copied().and_then(Address::non_zero), now)?;
        self.account_mut(&signer).consume_nonce();
        self.commit(now);
        Ok(signer)
    }

    fn apply_delegate(
        &mut self,
        account: &Address,
        delegatee: Option<Address>,
        now: Timepoint,
    ) -> Result<(), VotesError> {
        let entry = self.account_mut(account);
        let previous = entry.delegate;
        let free = entry.free_units();
        entry.delegate = delegatee;

        self.pending.push(VotesEvent::DelegateChanged {
            delegator: *account,
            from: previous,
            to: delegatee,
        });
        self.move_votes(previous, delegatee, free, now)?;
        tracing::debug!(account = %account, from = ?previous, to = ?delegatee, units = free, "delegate changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use tally_crypto::{authorize, derive_address, keypair_from_seed, Eip712Domain};
    use tally_nullables::NullClock;
    use tally_types::VotesParams;

    fn addr(seed: u8) -> Address {
        Address::new([seed; 32])
    }

    fn ledger() -> (VotesLedger<Rc<NullClock>>, Rc<NullClock>) {
        let clock = Rc::new(NullClock::new(1));
        let domain = Eip712Domain {
            name: "Tally".into(),
            version: "1".into(),
            chain_id: 1,
            verifying_contract: Address::new([0xDD; 32]),
        };
        let ledger = VotesLedger::new(VotesParams::default(), domain, clock.clone()).unwrap();
        (ledger, clock)
    }

    #[test]
    fn redelegation_moves_free_units() {
        let (mut l, clock) = ledger();
        l.transfer_voting_units(None, Some(&addr(1)), 100).unwrap();
        l.delegate(&addr(1), Some(&addr(2))).unwrap();
        assert_eq!(l.get_votes(&addr(2)), 100);
        clock.advance(1);
        l.delegate(&addr(1), Some(&addr(3))).unwrap();
        assert_eq!(l.get_votes(&addr(2)), 0);
        assert_eq!(l.get_votes(&addr(3)), 100);
        assert_eq!(l.delegates(&addr(1)), Some(addr(3)));
        clock.advance(1);
        assert_eq!(l.get_past_votes(&addr(2), Timepoint::new(1)).unwrap(), 100);
    }

    #[test]
    fn clearing_delegate_removes_votes() {
        let (mut l, _) = ledger();
        l.transfer_voting_units(None, Some(&addr(1)), 10).unwrap();
        l.delegate(&addr(1), Some(&addr(1))).unwrap();
        assert_eq!(l.get_votes(&addr(1)), 10);
        l.delegate(&addr(1), None).unwrap();
        assert_eq!(l.get_votes(&addr(1)), 0);
        assert_eq!(l.delegates(&addr(1)), None);
    }

    #[test]
    fn zero_address_clears_delegate() {
        let (mut l, _) = ledger();
        l.transfer_voting_units(None, Some(&addr(1)), 50).unwrap();
        l.delegate(&addr(1), Some(&addr(2))).unwrap();
        l.delegate(&addr(1), Some(&Address::ZERO)).unwrap();
        assert_eq!(l.delegates(&addr(1)), None);
        assert_eq!(l.get_votes(&Address::ZERO), 0);
        assert_eq!(l.get_votes(&addr(2)), 0);
        assert_eq!(l.num_checkpoints(&Address::ZERO), 0);
    }

    #[test]
    fn only_free_units_follow_primary() {
        let (mut l, _) = ledger();
        l.transfer_voting_units(None, Some(&addr(1)), 100).unwrap();
        l.multi_delegate(&addr(1), &[addr(5)], &[40]).unwrap();
        l.delegate(&addr(1), Some(&addr(2))).unwrap();
        assert_eq!(l.get_votes(&addr(2)), 60);
        assert_eq!(l.get_votes(&addr(5)), 40);
    }

    #[test]
    fn by_sig_consumes_nonce_once() {
        let (mut l, _) = ledger();
        let kp = keypair_from_seed(&[4; 32]);
        let signer = derive_address(&kp.public);
        let expiry = Timepoint::new(100);
        let digest = l.signing_digest(&TypedPayload::Delegation {
            delegatee: addr(2),
            nonce: 0,
            expiry,
        });
        let auth = authorize(&digest, &kp);

        assert_eq!(l.delegate_by_sig(Some(&addr(2)), 0, expiry, &auth).unwrap(), signer);
        assert_eq!(l.delegates(&signer), Some(addr(2)));
        assert_eq!(l.nonces(&signer), 1);
        assert!(matches!(
            l.delegate_by_sig(Some(&addr(2)), 0, expiry, &auth),
            Err(VotesError::InvalidNonce { expected: 1, .. })
        ));
        assert_eq!(l.nonces(&signer), 1);
    }
}

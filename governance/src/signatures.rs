//! Authentication of off-chain signed operations.
//!
//! Checks run in a fixed order before anything is mutated: expiry, then
//! signature recovery, then the signer's nonce. The nonce is consumed by the
//! calling operation only after it has applied successfully.

use tally_crypto::{recover_signer, typed_data_digest, TypedPayload};
use tally_types::{Address, Authorization, Clock, Hash256, Timepoint};

use crate::account::Account;
use crate::error::VotesError;
use crate::ledger::VotesLedger;

impl<C: Clock> VotesLedger<C> {
    /// Digest a signer must sign to authorize `payload` on this ledger.
    pub fn signing_digest(&self, payload: &TypedPayload<'_>) -> Hash256 {
        typed_data_digest(&self.domain_separator(), &payload.struct_hash())
    }

    pub(crate) fn authenticate(
        &self,
        payload: &TypedPayload<'_>,
        authorization: &Authorization,
        now: Timepoint,
    ) -> Result<Address, VotesError> {
        let expiry = payload.expiry();
        if now > expiry {
            tracing::warn!(expiry = %expiry, now = %now, "rejected expired signature");
            return Err(VotesError::ExpiredSignature { expiry });
        }

        let digest = self.signing_digest(payload);
        let Some(signer) = recover_signer(&digest, authorization) else {
            tracing::warn!(digest = %digest, "rejected signature that does not verify");
            return Err(VotesError::InvalidSignature);
        };

        let fresh = Account::default();
        let account = self.accounts.get(&signer).unwrap_or(&fresh);
        if let Err(err) = account.check_nonce(&signer, payload.nonce()) {
            tracing::warn!(signer = %signer, nonce = payload.nonce(), "rejected signature with stale nonce");
            return Err(err);
        }
        Ok(signer)
    }
}

//! Cryptographic primitives for the Tally voting-power ledger.
//!
//! - **Ed25519** for signed delegation authorizations
//! - **Keccak-256** for EIP-712 style typed-data digests
//! - **Blake2b** for address derivation and snapshot seals

pub mod hash;
pub mod keys;
pub mod sign;
pub mod typed_data;

pub use hash::{blake2b_256, hash_snapshot, keccak256, keccak256_multi};
pub use keys::{generate_keypair, keypair_from_seed, public_from_private};
pub use sign::{authorize, derive_address, recover_signer, sign_message, verify_signature};
pub use typed_data::{typed_data_digest, Eip712Domain, TypedPayload};

//! Structured-data hashing for signed delegation payloads.
//!
//! Follows the EIP-712 layout so existing off-chain signing tools can build
//! the same digests: every member is a 32-byte word, integers are big-endian
//! and left-padded, dynamic arrays hash to `keccak256(concat(words))`, and the
//! final digest is `keccak256(0x19 0x01 ‖ domainSeparator ‖ structHash)`.
//! Addresses are 32 bytes here and occupy a full word unpadded.
//!
//! Member order is part of the encoding. Reordering the delegatee list of a
//! multi-delegation produces a different digest, so a signature over one
//! ordering never authorizes another.

use serde::{Deserialize, Serialize};
use tally_types::{Address, Hash256, Timepoint};

use crate::hash::{keccak256, keccak256_multi};

pub const EIP712_DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
pub const DELEGATION_TYPE: &str = "Delegation(address delegatee,uint256 nonce,uint256 expiry)";
pub const MULTI_DELEGATION_TYPE: &str =
    "MultiDelegation(address[] delegatees,uint256[] units,uint256 nonce,uint256 expiry)";
pub const MULTI_UNDELEGATION_TYPE: &str =
    "MultiUnDelegation(address[] delegatees,uint256 nonce,uint256 expiry)";

/// The signing domain a ledger instance accepts signatures for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eip712Domain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Eip712Domain {
    /// The domain separator binding signatures to this name/version/chain/contract.
    pub fn separator(&self) -> Hash256 {
        Hash256::new(keccak256_multi(&[
            &keccak256(EIP712_DOMAIN_TYPE.as_bytes()),
            &keccak256(self.name.as_bytes()),
            &keccak256(self.version.as_bytes()),
            &word_u64(self.chain_id),
            self.verifying_contract.as_bytes(),
        ]))
    }
}

/// A payload an account can authorize off-chain.
#[derive(Clone, Copy, Debug)]
pub enum TypedPayload<'a> {
    /// Primary delegation; the zero address clears the delegate.
    Delegation {
        delegatee: Address,
        nonce: u64,
        expiry: Timepoint,
    },
    MultiDelegation {
        delegatees: &'a [Address],
        units: &'a [u128],
        nonce: u64,
        expiry: Timepoint,
    },
    MultiUnDelegation {
        delegatees: &'a [Address],
        nonce: u64,
        expiry: Timepoint,
    },
}

impl TypedPayload<'_> {
    pub fn nonce(&self) -> u64 {
        match *self {
            Self::Delegation { nonce, .. }
            | Self::MultiDelegation { nonce, .. }
            | Self::MultiUnDelegation { nonce, .. } => nonce,
        }
    }

    /// Last timepoint at which the signature is accepted.
    pub fn expiry(&self) -> Timepoint {
        match *self {
            Self::Delegation { expiry, .. }
            | Self::MultiDelegation { expiry, .. }
            | Self::MultiUnDelegation { expiry, .. } => expiry,
        }
    }

    pub fn struct_hash(&self) -> Hash256 {
        let hash = match *self {
            Self::Delegation {
                delegatee,
                nonce,
                expiry,
            } => keccak256_multi(&[
                &keccak256(DELEGATION_TYPE.as_bytes()),
                delegatee.as_bytes(),
                &word_u64(nonce),
                &word_u64(expiry.get()),
            ]),
            Self::MultiDelegation {
                delegatees,
                units,
                nonce,
                expiry,
            } => keccak256_multi(&[
                &keccak256(MULTI_DELEGATION_TYPE.as_bytes()),
                &hash_addresses(delegatees),
                &hash_units(units),
                &word_u64(nonce),
                &word_u64(expiry.get()),
            ]),
            Self::MultiUnDelegation {
                delegatees,
                nonce,
                expiry,
            } => keccak256_multi(&[
                &keccak256(MULTI_UNDELEGATION_TYPE.as_bytes()),
                &hash_addresses(delegatees),
                &word_u64(nonce),
                &word_u64(expiry.get()),
            ]),
        };
        Hash256::new(hash)
    }
}

/// `keccak256(0x19 0x01 ‖ domain_separator ‖ struct_hash)`.
pub fn typed_data_digest(domain_separator: &Hash256, struct_hash: &Hash256) -> Hash256 {
    Hash256::new(keccak256_multi(&[
        b"\x19\x01",
        domain_separator.as_bytes(),
        struct_hash.as_bytes(),
    ]))
}

fn word_u64(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

fn word_u128(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

fn hash_addresses(addresses: &[Address]) -> [u8; 32] {
    let parts: Vec<&[u8]> = addresses.iter().map(|a| a.as_bytes().as_slice()).collect();
    keccak256_multi(&parts)
}

fn hash_units(units: &[u128]) -> [u8; 32] {
    let words: Vec<[u8; 32]> = units.iter().map(|u| word_u128(*u)).collect();
    let parts: Vec<&[u8]> = words.iter().map(|w| w.as_slice()).collect();
    keccak256_multi(&parts)
}

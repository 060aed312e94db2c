//! Fundamental types for the Tally voting-power ledger.
//!
//! Shared by every crate in the workspace: addresses, digests, timepoints and
//! the clock abstraction, key/signature types and ledger parameters.

pub mod address;
pub mod error;
pub mod hash;
pub mod keys;
pub mod params;
pub mod time;

pub use address::Address;
pub use error::TypesError;
pub use hash::Hash256;
pub use keys::{Authorization, KeyPair, PrivateKey, PublicKey, Signature};
pub use params::VotesParams;
pub use time::{Clock, ClockMode, SystemClock, Timepoint};

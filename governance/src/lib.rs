//! Voting-power ledger with historical checkpoints and partial delegation.
//!
//! Each account holds voting units. Its free units follow a single primary
//! delegate; fixed amounts can be carved out to a bounded list of secondary
//! delegatees. Every change to a delegatee's votes or to the total supply is
//! recorded as a checkpoint, so past totals can be read without replay.
//!
//! [`VotesLedger`] is the only writer. Every mutating call either applies
//! completely or returns an error and leaves state untouched.

pub mod account;
pub mod checkpoints;
pub mod config;
pub mod delegation;
pub mod error;
pub mod events;
pub mod ledger;
pub mod multi;
pub mod projector;
pub mod signatures;
pub mod snapshot;
pub mod units;

pub use account::Account;
pub use checkpoints::{Checkpoint, CheckpointSeries, CheckpointStore};
pub use config::VotesConfig;
pub use error::VotesError;
pub use events::{EventBus, VotesEvent};
pub use ledger::VotesLedger;
pub use multi::SecondaryDelegations;
pub use projector::VotePowerProjector;
pub use snapshot::{AccountSnapshot, SeriesSnapshot, VotesSnapshot, SNAPSHOT_VERSION};

//! Abstract storage traits for the Tally ledger.
//!
//! Storage backends (embedded databases, in-memory for testing) implement
//! these traits. The ledger depends only on the traits.

pub mod error;
pub mod snapshot;

pub use error::StoreError;
pub use snapshot::SnapshotStore;

//! Nullable infrastructure for deterministic testing.
//!
//! External dependencies of the ledger (clock, snapshot storage) sit behind
//! traits. This crate provides test-friendly implementations that return
//! deterministic values, can be driven programmatically and never touch the
//! filesystem.

pub mod clock;
pub mod store;

pub use clock::NullClock;
pub use store::NullSnapshotStore;

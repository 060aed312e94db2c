//! Sealed ledger snapshots.
//!
//! A snapshot captures every account, every delegatee's vote history and the
//! total-supply history. The seal is Blake2b-256 over the bincode encoding of
//! everything except the seal itself, so any modification of the stored bytes
//! is detected on load.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tally_crypto::hash_snapshot;
use tally_store::SnapshotStore;
use tally_types::{Address, Clock, ClockMode, Hash256, Timepoint};

use crate::account::Account;
use crate::checkpoints::{Checkpoint, CheckpointSeries, CheckpointStore};
use crate::error::VotesError;
use crate::ledger::VotesLedger;
use crate::multi::SecondaryDelegations;
use crate::projector::VotePowerProjector;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotesSnapshot {
    /// Blake2b-256 over the encoded body.
    pub hash: Hash256,
    pub version: u32,
    pub clock_mode: ClockMode,
    /// Timepoint of the last committed write.
    pub last_write: Timepoint,
    /// Sorted by address.
    pub accounts: Vec<AccountSnapshot>,
    /// Sorted by delegatee.
    pub votes: Vec<SeriesSnapshot>,
    pub total_supply: Vec<Checkpoint>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub address: Address,
    pub units: u128,
    pub delegate: Option<Address>,
    pub nonce: u64,
    /// Secondary allocations in list order.
    pub secondary: Vec<(Address, u128)>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesSnapshot {
    pub delegatee: Address,
    pub checkpoints: Vec<Checkpoint>,
}

impl VotesSnapshot {
    fn body_bytes(&self) -> Result<Vec<u8>, VotesError> {
        bincode::serialize(&(
            self.version,
            self.clock_mode,
            self.last_write,
            &self.accounts,
            &self.votes,
            &self.total_supply,
        ))
        .map_err(|e| VotesError::Snapshot(e.to_string()))
    }

    fn seal(mut self) -> Result<Self, VotesError> {
        self.hash = hash_snapshot(&self.body_bytes()?);
        Ok(self)
    }

    /// Whether the seal matches the contents.
    pub fn verify(&self) -> bool {
        self.body_bytes()
            .map(|body| hash_snapshot(&body) == self.hash)
            .unwrap_or(false)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, VotesError> {
        bincode::serialize(self).map_err(|e| VotesError::Snapshot(e.to_string()))
    }

    /// Decode and verify the seal.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VotesError> {
        let snapshot: Self =
            bincode::deserialize(bytes).map_err(|e| VotesError::Snapshot(e.to_string()))?;
        if !snapshot.verify() {
            return Err(VotesError::Snapshot("seal does not match contents".into()));
        }
        Ok(snapshot)
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }
}

impl<C: Clock> VotesLedger<C> {
    /// Capture the full ledger state.
    pub fn snapshot(&self) -> Result<VotesSnapshot, VotesError> {
        let mut accounts: Vec<AccountSnapshot> = self
            .accounts
            .iter()
            .map(|(address, account)| AccountSnapshot {
                address: *address,
                units: account.units,
                delegate: account.delegate,
                nonce: account.nonce,
                secondary: account
                    .secondary
                    .iter()
                    .map(|(d, units)| (*d, units))
                    .collect(),
            })
            .collect();
        accounts.sort_by(|a, b| a.address.cmp(&b.address));

        let mut votes: Vec<SeriesSnapshot> = self
            .projector
            .store()
            .iter()
            .map(|(delegatee, series)| SeriesSnapshot {
                delegatee: *delegatee,
                checkpoints: series.as_slice().to_vec(),
            })
            .collect();
        votes.sort_by(|a, b| a.delegatee.cmp(&b.delegatee));

        VotesSnapshot {
            hash: Hash256::ZERO,
            version: SNAPSHOT_VERSION,
            clock_mode: self.params().clock_mode,
            last_write: self.last_write,
            accounts,
            votes,
            total_supply: self.total_supply.as_slice().to_vec(),
        }
        .seal()
    }

    /// Replace the ledger state with a verified snapshot.
    ///
    /// Everything is rebuilt and validated before the current state is
    /// touched; on error the ledger is unchanged.
    pub fn restore(&mut self, snapshot: &VotesSnapshot) -> Result<(), VotesError> {
        if !snapshot.verify() {
            return Err(VotesError::Snapshot("seal does not match contents".into()));
        }
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(VotesError::Snapshot(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        if snapshot.clock_mode != self.params().clock_mode {
            return Err(VotesError::ClockModeMismatch {
                expected: self.params().clock_mode,
                actual: snapshot.clock_mode,
            });
        }

        let mut accounts = HashMap::with_capacity(snapshot.accounts.len());
        for entry in &snapshot.accounts {
            let secondary = SecondaryDelegations::from_entries(&entry.secondary)?;
            if secondary.allocated() > entry.units {
                return Err(VotesError::Snapshot(format!(
                    "account {} allocates more units than it holds",
                    entry.address
                )));
            }
            if secondary.len() > self.params().max_delegatees {
                return Err(VotesError::Snapshot(format!(
                    "account {} exceeds the secondary delegatee limit",
                    entry.address
                )));
            }
            let account = Account {
                units: entry.units,
                delegate: entry.delegate,
                nonce: entry.nonce,
                secondary,
            };
            if accounts.insert(entry.address, account).is_some() {
                return Err(VotesError::Snapshot(format!(
                    "duplicate account {}",
                    entry.address
                )));
            }
        }

        let mut votes = CheckpointStore::new();
        for entry in &snapshot.votes {
            let series = CheckpointSeries::from_checkpoints(entry.checkpoints.clone())?;
            ensure_not_after(&series, snapshot.last_write, &entry.delegatee.to_string())?;
            votes.insert_series(entry.delegatee, series);
        }
        let total_supply = CheckpointSeries::from_checkpoints(snapshot.total_supply.clone())?;
        ensure_not_after(&total_supply, snapshot.last_write, "total supply")?;

        self.replace_state(
            accounts,
            VotePowerProjector::from_store(votes),
            total_supply,
            snapshot.last_write,
        );
        tracing::info!(
            accounts = snapshot.accounts.len(),
            delegatees = snapshot.votes.len(),
            last_write = %snapshot.last_write,
            "ledger restored from snapshot"
        );
        Ok(())
    }

    /// Seal the current state and write it under `key`. Returns the seal.
    pub fn save_to(&self, store: &impl SnapshotStore, key: &str) -> Result<Hash256, VotesError> {
        let snapshot = self.snapshot()?;
        store.put_snapshot(key, &snapshot.to_bytes()?)?;
        tracing::debug!(key, hash = %snapshot.hash, "snapshot saved");
        Ok(snapshot.hash)
    }

    /// Load, verify and restore the snapshot stored under `key`.
    pub fn load_from(&mut self, store: &impl SnapshotStore, key: &str) -> Result<(), VotesError> {
        let bytes = store.get_snapshot(key)?;
        let snapshot = VotesSnapshot::from_bytes(&bytes)?;
        self.restore(&snapshot)
    }
}

/// Every write is stamped no later than the last committed write; a series
/// reaching past it would make the next checkpoint push fail mid-operation.
fn ensure_not_after(
    series: &CheckpointSeries,
    last_write: Timepoint,
    what: &str,
) -> Result<(), VotesError> {
    match series.latest_checkpoint() {
        Some(last) if last.timepoint > last_write => Err(VotesError::Snapshot(format!(
            "{what} has a checkpoint at {} after the last write {last_write}",
            last.timepoint
        ))),
        _ => Ok(()),
    }
}

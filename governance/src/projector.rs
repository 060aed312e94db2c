//! Vote-power checkpoint projector.
//!
//! Turns unit moves into per-delegatee checkpoint writes. Both sides of a
//! move are written at the same timepoint inside the same operation, so the
//! sum of all delegatee votes is never observed mid-move.

use tally_types::{Address, Timepoint};

use crate::checkpoints::{Checkpoint, CheckpointSeries, CheckpointStore};
use crate::error::VotesError;
use crate::events::VotesEvent;

/// Checkpointed vote totals per delegatee.
#[derive(Clone, Debug, Default)]
pub struct VotePowerProjector {
    votes: CheckpointStore<Address>,
}

impl VotePowerProjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_store(votes: CheckpointStore<Address>) -> Self {
        Self { votes }
    }

    /// Current votes of a delegatee.
    pub fn get_votes(&self, delegatee: &Address) -> u128 {
        self.votes.latest(delegatee)
    }

    /// Votes of a delegatee as of `timepoint`. No past-only check here; the
    /// ledger's read surface enforces that.
    pub fn votes_at(&self, delegatee: &Address, timepoint: Timepoint) -> u128 {
        self.votes.lookup_recent(delegatee, timepoint)
    }

    pub fn num_checkpoints(&self, delegatee: &Address) -> usize {
        self.votes.series(delegatee).map_or(0, CheckpointSeries::len)
    }

    pub fn checkpoint_at(&self, delegatee: &Address, pos: usize) -> Option<Checkpoint> {
        self.votes.series(delegatee).and_then(|s| s.at(pos))
    }

    pub fn store(&self) -> &CheckpointStore<Address> {
        &self.votes
    }

    /// Move `amount` votes from one delegatee to another.
    ///
    /// `None` on either side means the votes leave or enter circulation (no
    /// delegate, mint, burn). A move onto itself or of zero votes writes
    /// nothing. Both new totals are computed before either side is written,
    /// so an underflow or overflow leaves the projector untouched.
    pub fn move_votes(
        &mut self,
        from: Option<&Address>,
        to: Option<&Address>,
        amount: u128,
        now: Timepoint,
        events: &mut Vec<VotesEvent>,
    ) -> Result<(), VotesError> {
        if from == to || amount == 0 {
            return Ok(());
        }

        let decreased = match from {
            Some(from) => {
                let current = self.votes.latest(from);
                let Some(value) = current.checked_sub(amount) else {
                    return Err(VotesError::Invariant(format!(
                        "votes of {from} would drop below zero ({current} - {amount})"
                    )));
                };
                Some((from, value))
            }
            None => None,
        };
        let increased = match to {
            Some(to) => {
                let current = self.votes.latest(to);
                let Some(value) = current.checked_add(amount) else {
                    return Err(VotesError::Invariant(format!(
                        "votes of {to} would overflow ({current} + {amount})"
                    )));
                };
                Some((to, value))
            }
            None => None,
        };

        if let Some((from, value)) = decreased {
            let (previous, new) = self.votes.push(from, now, value)?;
            tracing::trace!(delegate = %from, previous, new, timepoint = %now, "votes decreased");
            events.push(VotesEvent::DelegateVotesChanged {
                delegate: *from,
                previous,
                new,
            });
        }

        if let Some((to, value)) = increased {
            let (previous, new) = self.votes.push(to, now, value)?;
            tracing::trace!(delegate = %to, previous, new, timepoint = %now, "votes increased");
            events.push(VotesEvent::DelegateVotesChanged {
                delegate: *to,
                previous,
                new,
            });
        }

        Ok(())
    }
}

//! Events emitted by ledger operations.
//!
//! Events are buffered while an operation mutates state and handed to
//! subscribers only after the operation has committed. Listeners only see
//! `&VotesEvent`, never the ledger, so they cannot observe or re-enter a
//! half-applied operation.

use serde::{Deserialize, Serialize};
use tally_types::Address;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VotesEvent {
    /// An account's primary delegate changed.
    DelegateChanged {
        delegator: Address,
        from: Option<Address>,
        to: Option<Address>,
    },
    /// A delegatee's vote total changed.
    DelegateVotesChanged {
        delegate: Address,
        previous: u128,
        new: u128,
    },
    /// A secondary allocation was created, modified or removed (`new_units == 0`).
    SecondaryDelegationChanged {
        delegator: Address,
        delegatee: Address,
        previous_units: u128,
        new_units: u128,
    },
    /// Voting units moved between holders (`None` is mint or burn).
    VotingUnitsTransferred {
        from: Option<Address>,
        to: Option<Address>,
        amount: u128,
    },
}

type Listener = Box<dyn Fn(&VotesEvent) + Send + Sync>;

/// Synchronous fan-out of committed events.
///
/// Listeners run inline on the committing thread; keep them fast.
pub struct EventBus {
    listeners: Vec<Listener>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &VotesEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

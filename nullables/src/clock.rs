//! Nullable clock: deterministic timepoints for testing.

use std::cell::Cell;

use tally_types::{Clock, ClockMode, Timepoint};

/// A deterministic clock for testing.
///
/// Time only advances when you tell it to. Share it with a ledger through
/// `Rc<NullClock>` so the test keeps a handle to drive it.
pub struct NullClock {
    current: Cell<u64>,
    mode: ClockMode,
}

impl NullClock {
    /// A block-number clock starting at `initial`.
    pub fn new(initial: u64) -> Self {
        Self::with_mode(initial, ClockMode::BlockNumber)
    }

    pub fn with_mode(initial: u64, mode: ClockMode) -> Self {
        Self {
            current: Cell::new(initial),
            mode,
        }
    }

    /// Get the current timepoint.
    pub fn now(&self) -> Timepoint {
        Timepoint::new(self.current.get())
    }

    /// Advance by `n` ticks.
    pub fn advance(&self, n: u64) {
        self.current.set(self.current.get() + n);
    }

    /// Set the clock to a specific value (may move backwards).
    pub fn set(&self, value: u64) {
        self.current.set(value);
    }
}

impl Clock for NullClock {
    fn timepoint(&self) -> Timepoint {
        self.now()
    }

    fn mode(&self) -> ClockMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn advances_only_on_request() {
        let clock = NullClock::new(10);
        assert_eq!(clock.timepoint(), Timepoint::new(10));
        clock.advance(5);
        assert_eq!(clock.timepoint(), Timepoint::new(15));
        clock.set(3);
        assert_eq!(clock.now(), Timepoint::new(3));
    }

    #[test]
    fn shared_handle_sees_updates() {
        let clock = Rc::new(NullClock::with_mode(0, ClockMode::Timestamp));
        let held: Rc<NullClock> = Rc::clone(&clock);
        clock.advance(7);
        assert_eq!(held.timepoint(), Timepoint::new(7));
        assert_eq!(Clock::mode(&held), ClockMode::Timestamp);
    }
}

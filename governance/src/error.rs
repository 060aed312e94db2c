use tally_store::StoreError;
use tally_types::{Address, ClockMode, Timepoint};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VotesError {
    #[error("checkpoint write at {timepoint} precedes last recorded timepoint {last}")]
    InvalidTimepoint { timepoint: Timepoint, last: Timepoint },

    #[error("lookup at timepoint {timepoint} is not in the past (current {current})")]
    FutureLookup { timepoint: Timepoint, current: Timepoint },

    #[error("signature expired at {expiry}")]
    ExpiredSignature { expiry: Timepoint },

    #[error("invalid nonce for {account}: expected {expected}")]
    InvalidNonce { account: Address, expected: u64 },

    #[error("signature does not verify for the embedded signer")]
    InvalidSignature,

    #[error("delegatee and unit lists differ in length: {delegatees} != {units}")]
    LengthMismatch { delegatees: usize, units: usize },

    #[error("no delegatees given")]
    NoDelegatesGiven,

    #[error("the zero address cannot be a secondary delegatee")]
    ZeroDelegatee,

    #[error("page start {start} is after end {end} or past the list")]
    StartIsBiggerThanEnd { start: usize, end: usize },

    #[error("requested {requested} units but only {available} are available")]
    ExceededAvailableUnits { requested: u128, available: u128 },

    #[error("too many secondary delegatees: at most {max}")]
    TooManyDelegatees { max: usize },

    #[error("total supply {increased_supply} exceeds cap {cap}")]
    ExceededSafeSupply { increased_supply: u128, cap: u128 },

    #[error("clock runs in {actual:?} mode but the ledger expects {expected:?}")]
    ClockModeMismatch { expected: ClockMode, actual: ClockMode },

    #[error("ledger invariant violated: {0}")]
    Invariant(String),

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("config error: {0}")]
    Config(String),
}

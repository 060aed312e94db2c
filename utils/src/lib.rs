//! Shared utilities for the Tally workspace.

pub mod logging;

pub use logging::{init_logging, try_init_logging, LogFormat};

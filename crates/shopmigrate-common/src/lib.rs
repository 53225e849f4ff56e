pub mod error;

pub use error::{Error, Result};

/// Ledger table used when the config does not name one.
pub const DEFAULT_LEDGER_TABLE: &str = "_migrations";

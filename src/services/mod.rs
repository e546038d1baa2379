//! External collaborators module
//! 
//! This module contains the reward ledger the timer credits claims against.

pub mod ledger;

// Re-export main types
pub use ledger::{InMemoryLedger, LedgerError, RewardLedger};

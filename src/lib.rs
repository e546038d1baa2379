//! Reward Timer - a countdown timer that gates a reward claim
//! 
//! This library provides a deadline-based countdown state machine, a
//! coordinator that guards the reward claim against duplicate requests, and
//! a controller that publishes every state change to observers.

pub mod config;
pub mod state;
pub mod api;
pub mod services;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::{Config, TimerConfig};
pub use state::{Phase, TimerController, TimerState};
pub use services::{InMemoryLedger, LedgerError, RewardLedger};
pub use api::{create_router, ApiState};
pub use utils::signals::shutdown_signal;

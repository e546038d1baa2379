//! State management module
//! 
//! This module contains the timer snapshot, the countdown state machine,
//! the claim coordinator and the controller that composes them.

pub mod claim;
pub mod controller;
pub mod engine;
pub mod timer_state;

// Re-export main types
pub use claim::{ClaimContinuation, ClaimCoordinator, ClaimSettlement, ClaimTicket};
pub use controller::TimerController;
pub use engine::{TickOutcome, TimerEngine};
pub use timer_state::{minutes_to_ms, Phase, TimerState, MINUTE_MS};

//! Utility functions module
//! 
//! Clock sources, display formatting and signal handling shared by the
//! engine and the daemon.

pub mod clock;
pub mod format;
pub mod signals;

// Re-export main items
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use format::format_ms_as_mm_ss;
pub use signals::shutdown_signal;

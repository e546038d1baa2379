//! Timer state snapshot published to observers

use serde::{Deserialize, Serialize};

use crate::utils::format_ms_as_mm_ss;

/// Milliseconds in one minute
pub const MINUTE_MS: u64 = 60_000;

/// Convert a duration in minutes to milliseconds
pub fn minutes_to_ms(minutes: u64) -> u64 {
    minutes.saturating_mul(MINUTE_MS)
}

/// Lifecycle stage of the countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Not started (or reset); remaining time is the full interval
    Idle,
    Running,
    Paused,
    /// Countdown reached zero; the reward may be claimed once
    Finished,
}

/// Immutable snapshot of the timer, replaced wholesale on every transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    /// Duration selected for the current cycle
    pub total_duration_ms: u64,
    /// Time left, never more than `total_duration_ms`
    pub remaining_ms: u64,
    pub phase: Phase,
    /// Reward amount bound to the next claim
    pub selected_reward: u64,
    /// One-shot eligibility, only ever set while `phase == Finished`
    pub can_claim: bool,
    /// A ledger request is in flight
    pub is_claiming: bool,
    /// Message of the last failed claim
    pub last_error: Option<String>,
}

impl TimerState {
    /// Create an idle timer with the full duration remaining
    pub fn new(total_duration_ms: u64, selected_reward: u64) -> Self {
        Self {
            total_duration_ms,
            remaining_ms: total_duration_ms,
            phase: Phase::Idle,
            selected_reward,
            can_claim: false,
            is_claiming: false,
            last_error: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn is_paused(&self) -> bool {
        self.phase == Phase::Paused
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Fraction of the interval already elapsed, from 0.0 to 1.0
    pub fn progress(&self) -> f64 {
        if self.total_duration_ms == 0 {
            return 0.0;
        }
        let elapsed = self.total_duration_ms.saturating_sub(self.remaining_ms);
        (elapsed as f64 / self.total_duration_ms as f64).clamp(0.0, 1.0)
    }

    /// Remaining time as `MM:SS`
    pub fn remaining_display(&self) -> String {
        format_ms_as_mm_ss(self.remaining_ms)
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new(minutes_to_ms(25), 10)
    }
}

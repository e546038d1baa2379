//! Countdown state machine
//!
//! The engine is deadline based: `start` and `resume` capture an absolute
//! monotonic deadline and every tick recomputes `deadline - now`, clamped
//! to zero. Late or coarse ticks only affect display granularity, never
//! when the countdown ends.
//!
//! ```text
//! Idle -> Running -> Paused -> Running -> Finished
//!   ^________________ reset / change duration ___|
//! ```
//!
//! The engine performs no I/O and owns no clock; callers pass the current
//! monotonic time in milliseconds. Commands whose precondition does not hold
//! are ignored and return `false`.
//!
//! `start` only leaves `Idle`. A finished timer is run again with `restart`
//! (or `reset` followed by `start`).

use tracing::debug;

use super::timer_state::{Phase, TimerState};

/// Result of a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The timer is not running; the tick loop should stop
    Stopped,
    /// Still counting down with this many milliseconds left
    Counting(u64),
    /// The deadline was reached on this tick
    Finished,
}

#[derive(Debug, Clone)]
pub struct TimerEngine {
    state: TimerState,
    /// Absolute monotonic time the countdown reaches zero; only set while running
    deadline_ms: Option<u64>,
}

impl TimerEngine {
    pub fn new(total_duration_ms: u64, selected_reward: u64) -> Self {
        Self {
            state: TimerState::new(total_duration_ms, selected_reward),
            deadline_ms: None,
        }
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut TimerState {
        &mut self.state
    }

    pub fn deadline_ms(&self) -> Option<u64> {
        self.deadline_ms
    }

    pub fn start(&mut self, now: u64) -> bool {
        if self.state.phase != Phase::Idle {
            debug!("Ignoring start in phase {:?}", self.state.phase);
            return false;
        }
        if self.state.remaining_ms == 0 {
            self.state.remaining_ms = self.state.total_duration_ms;
        }
        self.run_from(now);
        true
    }

    pub fn pause(&mut self, now: u64) -> bool {
        if self.state.phase != Phase::Running {
            debug!("Ignoring pause in phase {:?}", self.state.phase);
            return false;
        }
        let left = self.left_at(now);
        self.state.last_error = None;
        if left == 0 {
            // Deadline passed before the tick loop noticed
            self.finish();
            return true;
        }
        self.deadline_ms = None;
        self.state.remaining_ms = left;
        self.state.phase = Phase::Paused;
        true
    }

    pub fn resume(&mut self, now: u64) -> bool {
        if self.state.phase != Phase::Paused {
            debug!("Ignoring resume in phase {:?}", self.state.phase);
            return false;
        }
        self.run_from(now);
        true
    }

    /// Return to `Idle` with the full interval, dropping claim eligibility
    pub fn reset(&mut self) {
        self.deadline_ms = None;
        self.state.remaining_ms = self.state.total_duration_ms;
        self.state.phase = Phase::Idle;
        self.clear_claim_flags();
    }

    pub fn restart(&mut self, now: u64) {
        self.reset();
        self.start(now);
    }

    /// Select a new interval length; not allowed while running
    pub fn set_duration_ms(&mut self, total_duration_ms: u64) -> bool {
        if self.state.phase == Phase::Running {
            debug!("Ignoring duration change while running");
            return false;
        }
        self.state.total_duration_ms = total_duration_ms;
        self.reset();
        true
    }

    /// Select the reward for the next claim; not allowed while a claim is in flight
    pub fn set_reward(&mut self, amount: u64) -> bool {
        if self.state.is_claiming {
            debug!("Ignoring reward change while a claim is in flight");
            return false;
        }
        self.state.selected_reward = amount;
        self.state.last_error = None;
        true
    }

    pub fn tick(&mut self, now: u64) -> TickOutcome {
        if self.state.phase != Phase::Running {
            return TickOutcome::Stopped;
        }
        let left = self.left_at(now);
        if left == 0 {
            self.finish();
            return TickOutcome::Finished;
        }
        self.state.remaining_ms = left;
        TickOutcome::Counting(left)
    }

    fn run_from(&mut self, now: u64) {
        self.deadline_ms = Some(now.saturating_add(self.state.remaining_ms));
        self.state.phase = Phase::Running;
        self.state.last_error = None;
    }

    fn left_at(&self, now: u64) -> u64 {
        match self.deadline_ms {
            Some(deadline) => deadline.saturating_sub(now),
            None => self.state.remaining_ms,
        }
    }

    fn finish(&mut self) {
        self.deadline_ms = None;
        self.state.remaining_ms = 0;
        self.state.phase = Phase::Finished;
        self.state.can_claim = true;
    }

    fn clear_claim_flags(&mut self) {
        self.state.can_claim = false;
        self.state.is_claiming = false;
        self.state.last_error = None;
    }
}

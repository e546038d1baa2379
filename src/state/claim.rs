//! Reward claim coordination
//!
//! Guarantees at most one ledger request in flight and that a successful
//! claim consumes eligibility exactly once. The coordinator never awaits;
//! the controller performs the ledger call between `begin` and `settle`.

use tracing::{debug, info, warn};

use super::engine::TimerEngine;
use crate::services::LedgerError;

/// What to do with the timer once a claim succeeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClaimContinuation {
    /// Leave the timer finished with eligibility consumed
    #[default]
    None,
    /// Start a fresh interval right away
    Restart,
    /// Go back to an idle, full-length timer
    ResetToIdle,
}

/// Snapshot taken when a claim starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimTicket {
    id: u64,
    amount: u64,
    continuation: ClaimContinuation,
}

impl ClaimTicket {
    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn continuation(&self) -> ClaimContinuation {
        self.continuation
    }
}

/// How a ledger answer was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimSettlement {
    /// Eligibility consumed; the caller runs the continuation
    Credited(ClaimContinuation),
    /// Eligibility kept so the user may retry
    Failed,
    /// The claim was abandoned (reset, duration change) before the answer came
    Stale,
}

#[derive(Debug, Default)]
pub struct ClaimCoordinator {
    next_id: u64,
    in_flight: Option<u64>,
}

impl ClaimCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Mark a claim as started, or return `None` when not eligible or busy
    pub fn begin(
        &mut self,
        engine: &mut TimerEngine,
        continuation: ClaimContinuation,
    ) -> Option<ClaimTicket> {
        let state = engine.state_mut();
        if !state.can_claim || state.is_claiming || self.in_flight.is_some() {
            debug!(
                "Ignoring claim: can_claim={}, is_claiming={}",
                state.can_claim, state.is_claiming
            );
            return None;
        }

        self.next_id += 1;
        let ticket = ClaimTicket {
            id: self.next_id,
            amount: state.selected_reward,
            continuation,
        };
        self.in_flight = Some(ticket.id);
        state.is_claiming = true;
        state.last_error = None;

        info!("Claim {} started for reward {}", ticket.id, ticket.amount);
        Some(ticket)
    }

    /// Apply the ledger answer for `ticket`
    pub fn settle(
        &mut self,
        ticket: &ClaimTicket,
        result: Result<(), LedgerError>,
        engine: &mut TimerEngine,
    ) -> ClaimSettlement {
        if self.in_flight != Some(ticket.id) {
            debug!("Claim {} answered after it was abandoned", ticket.id);
            return ClaimSettlement::Stale;
        }
        self.in_flight = None;

        let state = engine.state_mut();
        state.is_claiming = false;
        match result {
            Ok(()) => {
                state.can_claim = false;
                state.last_error = None;
                info!("Claim {} credited {}", ticket.id, ticket.amount);
                ClaimSettlement::Credited(ticket.continuation)
            }
            Err(e) => {
                warn!("Claim {} failed: {}", ticket.id, e);
                state.last_error = Some(format!("Could not grant the reward: {}", e));
                ClaimSettlement::Failed
            }
        }
    }

    /// Forget the claim in flight; its answer will be treated as stale
    pub fn abandon(&mut self) {
        if let Some(id) = self.in_flight.take() {
            debug!("Claim {} abandoned", id);
        }
    }
}

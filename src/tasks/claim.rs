//! Detached reward claim

use std::sync::{Arc, Weak};
use tracing::debug;

use crate::{
    services::RewardLedger,
    state::{controller::Shared, ClaimTicket, TimerState},
};

/// Ask the ledger for the credit and settle the claim against the controller.
///
/// Runs as its own task, so the claim settles even when the caller stops
/// waiting. Returns `None` once the controller has been dropped.
pub(crate) async fn claim_task(
    shared: Weak<Shared>,
    ledger: Arc<dyn RewardLedger>,
    ticket: ClaimTicket,
) -> Option<TimerState> {
    let result = ledger.request_credit(ticket.amount()).await;

    let Some(strong) = shared.upgrade() else {
        debug!("Claim answered after the controller was dropped");
        return None;
    };
    Some(strong.settle_claim(&ticket, result))
}

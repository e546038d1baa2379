//! Countdown tick loop

use std::sync::Weak;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

use crate::state::controller::Shared;

/// Periodically recompute the remaining time until the timer stops.
///
/// The loop only holds a weak handle, so it ends when the controller is
/// dropped, when its run id is superseded (pause, reset, dispose) or once
/// the countdown finishes.
pub(crate) async fn tick_loop(shared: Weak<Shared>, run_id: u64) {
    let period = match shared.upgrade() {
        Some(shared) => shared.tick_interval(),
        None => return,
    };
    debug!("Tick loop {} started ({:?})", run_id, period);

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let Some(strong) = shared.upgrade() else {
            break;
        };
        if !strong.tick(run_id) {
            break;
        }
    }

    debug!("Tick loop {} stopped", run_id);
}

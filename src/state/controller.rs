//! Timer controller facade
//!
//! Composes the engine and the claim coordinator behind the command surface
//! used by the presentation layer. All command handlers and the tick loop
//! mutate state under one mutex, and every transition publishes a fresh
//! snapshot on a watch channel.

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{
    claim::{ClaimContinuation, ClaimCoordinator, ClaimSettlement, ClaimTicket},
    engine::{TickOutcome, TimerEngine},
    timer_state::{minutes_to_ms, TimerState},
};
use crate::{
    config::TimerConfig,
    services::{LedgerError, RewardLedger},
    tasks::{claim_task, tick_loop},
    utils::{Clock, MonotonicClock},
};

/// Mutable core guarded by the controller's mutex
#[derive(Debug)]
struct Core {
    engine: TimerEngine,
    coordinator: ClaimCoordinator,
    /// Identifies the only tick loop allowed to run; bumped to cancel it
    run_id: u64,
    disposed: bool,
}

impl Core {
    fn cancel_ticker(&mut self) {
        self.run_id += 1;
    }
}

/// State shared between the controller and its tick loop
pub(crate) struct Shared {
    core: Mutex<Core>,
    clock: Arc<dyn Clock>,
    state_tx: watch::Sender<TimerState>,
    tick_interval: Duration,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Core> {
        // Every transition is written in one step, so a poisoned lock still
        // holds a consistent state
        self.core.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, core: &Core) {
        self.state_tx.send_replace(core.engine.state().clone());
    }

    /// Run one tick for loop `run_id`; returns whether the loop should continue
    pub(crate) fn tick(&self, run_id: u64) -> bool {
        let mut core = self.lock();
        if core.disposed || core.run_id != run_id {
            debug!("Tick loop {} cancelled", run_id);
            return false;
        }

        let outcome = core.engine.tick(self.clock.now_ms());
        match outcome {
            TickOutcome::Counting(_) => {
                self.publish(&core);
                true
            }
            TickOutcome::Finished => {
                info!("Timer finished, reward can be claimed");
                self.publish(&core);
                false
            }
            TickOutcome::Stopped => false,
        }
    }

    pub(crate) fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Apply a ledger answer and run the claim's continuation
    pub(crate) fn settle_claim(
        self: &Arc<Self>,
        ticket: &ClaimTicket,
        result: Result<(), LedgerError>,
    ) -> TimerState {
        let mut guard = self.lock();
        if guard.disposed {
            debug!("Ignoring claim answer for disposed controller");
            return guard.engine.state().clone();
        }
        let core = &mut *guard;
        match core.coordinator.settle(ticket, result, &mut core.engine) {
            ClaimSettlement::Credited(ClaimContinuation::None) => {}
            ClaimSettlement::Credited(ClaimContinuation::Restart) => {
                core.engine.restart(self.clock.now_ms());
                self.spawn_ticker(core);
            }
            ClaimSettlement::Credited(ClaimContinuation::ResetToIdle) => {
                core.engine.reset();
                core.cancel_ticker();
            }
            ClaimSettlement::Failed => {}
            ClaimSettlement::Stale => return core.engine.state().clone(),
        }
        self.publish(core);
        core.engine.state().clone()
    }

    fn spawn_ticker(self: &Arc<Self>, core: &mut Core) {
        core.run_id += 1;
        tokio::spawn(tick_loop(Arc::downgrade(self), core.run_id));
    }
}

/// Command surface and observable state of one timer
pub struct TimerController {
    shared: Arc<Shared>,
    ledger: Arc<dyn RewardLedger>,
}

impl TimerController {
    /// Create an idle controller driven by the real monotonic clock.
    ///
    /// Commands that start the countdown spawn a task and must be called
    /// from within a Tokio runtime.
    pub fn new(config: TimerConfig, ledger: Arc<dyn RewardLedger>) -> Self {
        Self::with_clock(config, ledger, Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(
        config: TimerConfig,
        ledger: Arc<dyn RewardLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let engine = TimerEngine::new(config.initial_duration_ms(), config.initial_reward);
        let (state_tx, _) = watch::channel(engine.state().clone());

        info!(
            "Timer created: {}min, reward {}, tick {}ms",
            config.initial_minutes, config.initial_reward, config.tick_ms
        );

        Self {
            shared: Arc::new(Shared {
                core: Mutex::new(Core {
                    engine,
                    coordinator: ClaimCoordinator::new(),
                    run_id: 0,
                    disposed: false,
                }),
                clock,
                state_tx,
                tick_interval: config.tick_interval(),
            }),
            ledger,
        }
    }

    /// Latest snapshot
    pub fn state(&self) -> TimerState {
        self.shared.state_tx.borrow().clone()
    }

    /// Snapshot stream; a new receiver sees the latest state immediately
    pub fn subscribe(&self) -> watch::Receiver<TimerState> {
        self.shared.state_tx.subscribe()
    }

    /// Pass-through of the ledger balance stream
    pub fn balance(&self) -> watch::Receiver<u64> {
        self.ledger.balance()
    }

    pub fn start(&self) -> TimerState {
        self.command("start", |shared, core, now| {
            let started = core.engine.start(now);
            if started {
                shared.spawn_ticker(core);
            }
            started
        })
    }

    pub fn pause(&self) -> TimerState {
        self.command("pause", |_, core, now| {
            let paused = core.engine.pause(now);
            if paused {
                core.cancel_ticker();
            }
            paused
        })
    }

    pub fn resume(&self) -> TimerState {
        self.command("resume", |shared, core, now| {
            let resumed = core.engine.resume(now);
            if resumed {
                shared.spawn_ticker(core);
            }
            resumed
        })
    }

    pub fn reset(&self) -> TimerState {
        self.command("reset", |_, core, _| {
            core.engine.reset();
            core.coordinator.abandon();
            core.cancel_ticker();
            true
        })
    }

    pub fn restart(&self) -> TimerState {
        self.command("restart", |shared, core, now| {
            core.engine.restart(now);
            core.coordinator.abandon();
            shared.spawn_ticker(core);
            true
        })
    }

    /// Change the interval length; ignored while running
    pub fn set_duration_minutes(&self, minutes: u64) -> TimerState {
        self.command("set_duration", |_, core, _| {
            let changed = core.engine.set_duration_ms(minutes_to_ms(minutes));
            if changed {
                core.coordinator.abandon();
                core.cancel_ticker();
            }
            changed
        })
    }

    /// Change the reward for the next claim; ignored while a claim is in flight
    pub fn set_reward(&self, amount: u64) -> TimerState {
        self.command("set_reward", |_, core, _| core.engine.set_reward(amount))
    }

    /// Claim the reward and leave the timer finished
    pub async fn claim(&self) -> TimerState {
        self.claim_with(ClaimContinuation::None).await
    }

    /// Claim the reward, then start a fresh interval
    pub async fn claim_and_restart(&self) -> TimerState {
        self.claim_with(ClaimContinuation::Restart).await
    }

    /// Claim the reward, then return to an idle full-length timer
    pub async fn claim_and_reset(&self) -> TimerState {
        self.claim_with(ClaimContinuation::ResetToIdle).await
    }

    /// Stop the tick loop and turn every later command or claim answer into a no-op
    pub fn dispose(&self) {
        let mut core = self.shared.lock();
        if core.disposed {
            return;
        }
        core.disposed = true;
        core.cancel_ticker();
        core.coordinator.abandon();
        info!("Timer controller disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.lock().disposed
    }

    async fn claim_with(&self, continuation: ClaimContinuation) -> TimerState {
        let ticket = {
            let mut guard = self.shared.lock();
            if guard.disposed {
                debug!("Ignoring claim on disposed controller");
                return guard.engine.state().clone();
            }
            let core = &mut *guard;
            let ticket = core.coordinator.begin(&mut core.engine, continuation);
            if ticket.is_some() {
                self.shared.publish(core);
            }
            ticket
        };
        let Some(ticket) = ticket else {
            return self.state();
        };

        // The ledger call runs in its own task so that dropping this future
        // (client gone, timeout) never strands the claim in flight
        let claim = tokio::spawn(claim_task(
            Arc::downgrade(&self.shared),
            Arc::clone(&self.ledger),
            ticket,
        ));
        match claim.await {
            Ok(Some(state)) => state,
            Ok(None) => self.state(),
            Err(e) => {
                warn!("Claim task did not complete: {}", e);
                self.state()
            }
        }
    }

    /// Run a synchronous command under the lock and publish if it changed anything
    fn command<F>(&self, action: &str, apply: F) -> TimerState
    where
        F: FnOnce(&Arc<Shared>, &mut Core, u64) -> bool,
    {
        let mut core = self.shared.lock();
        if core.disposed {
            debug!("Ignoring {} on disposed controller", action);
            return core.engine.state().clone();
        }

        let now = self.shared.clock.now_ms();
        if apply(&self.shared, &mut *core, now) {
            let state = core.engine.state();
            info!(
                "{}: phase={:?}, remaining={}ms",
                action, state.phase, state.remaining_ms
            );
            self.shared.publish(&core);
        } else {
            debug!("{} ignored in phase {:?}", action, core.engine.state().phase);
        }
        core.engine.state().clone()
    }
}

impl Drop for TimerController {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        services::{InMemoryLedger, LedgerError},
        state::Phase,
        utils::ManualClock,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::{sync::Notify, time::sleep};

    fn config(minutes: u64) -> TimerConfig {
        TimerConfig {
            initial_minutes: minutes,
            initial_reward: 10,
            tick_ms: 100,
        }
    }

    fn controller(minutes: u64) -> (TimerController, Arc<InMemoryLedger>) {
        let ledger = Arc::new(InMemoryLedger::new(0));
        (TimerController::new(config(minutes), ledger.clone()), ledger)
    }

    async fn run_to_finish(controller: &TimerController, minutes: u64) {
        controller.start();
        sleep(Duration::from_millis(minutes_to_ms(minutes) + 200)).await;
        assert_eq!(controller.state().phase, Phase::Finished);
    }

    /// Ledger that holds every request until released
    struct GatedLedger {
        gate: Notify,
        calls: AtomicUsize,
        inner: InMemoryLedger,
    }

    impl GatedLedger {
        fn new() -> Self {
            Self {
                gate: Notify::new(),
                calls: AtomicUsize::new(0),
                inner: InMemoryLedger::new(0),
            }
        }
    }

    #[async_trait]
    impl RewardLedger for GatedLedger {
        async fn request_credit(&self, amount: u64) -> Result<(), LedgerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            self.inner.request_credit(amount).await
        }

        fn balance(&self) -> watch::Receiver<u64> {
            self.inner.balance()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn one_minute_timer_finishes_with_claim_available() {
        let (controller, _) = controller(1);
        controller.start();
        assert_eq!(controller.state().phase, Phase::Running);

        sleep(Duration::from_millis(59_800)).await;
        let state = controller.state();
        assert_eq!(state.phase, Phase::Running);
        assert!(!state.can_claim);

        sleep(Duration::from_millis(300)).await;
        let state = controller.state();
        assert_eq!(state.phase, Phase::Finished);
        assert_eq!(state.remaining_ms, 0);
        assert!(state.can_claim);
    }

    #[tokio::test(start_paused = true)]
    async fn finishes_within_one_tick_of_the_deadline() {
        let (controller, _) = controller(1);
        let mut rx = controller.subscribe();
        let started = tokio::time::Instant::now();
        controller.start();

        loop {
            rx.changed().await.unwrap();
            if rx.borrow_and_update().is_finished() {
                break;
            }
        }
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(60_000));
        assert!(elapsed <= Duration::from_millis(60_100));
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_start_is_idempotent() {
        let (controller, _) = controller(1);
        let first = controller.start();
        let second = controller.start();
        assert_eq!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_and_resume_preserve_remaining_time() {
        let (controller, _) = controller(25);
        controller.start();

        sleep(Duration::from_secs(10)).await;
        let paused = controller.pause();
        assert_eq!(paused.phase, Phase::Paused);
        assert_eq!(paused.remaining_ms, 1_490_000);

        sleep(Duration::from_secs(20)).await;
        assert_eq!(controller.state().remaining_ms, 1_490_000);

        let resumed = controller.resume();
        assert_eq!(resumed.phase, Phase::Running);
        assert_eq!(resumed.remaining_ms, 1_490_000);

        sleep(Duration::from_millis(1_489_800)).await;
        assert_eq!(controller.state().phase, Phase::Running);
        sleep(Duration::from_millis(300)).await;
        assert_eq!(controller.state().phase, Phase::Finished);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_stops_publishing_ticks() {
        let (controller, _) = controller(1);
        controller.start();
        sleep(Duration::from_millis(500)).await;
        controller.pause();

        let mut rx = controller.subscribe();
        rx.borrow_and_update();
        sleep(Duration::from_secs(5)).await;
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn set_duration_ignored_while_running() {
        let (controller, _) = controller(1);
        controller.start();
        sleep(Duration::from_millis(1_000)).await;

        let before = controller.state();
        let after = controller.set_duration_minutes(5);
        assert_eq!(after, before);

        controller.pause();
        let changed = controller.set_duration_minutes(5);
        assert_eq!(changed.phase, Phase::Idle);
        assert_eq!(changed.total_duration_ms, 300_000);
        assert_eq!(changed.remaining_ms, 300_000);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_claim_consumes_eligibility_and_credits_balance() {
        let (controller, ledger) = controller(1);
        run_to_finish(&controller, 1).await;

        let state = controller.claim().await;
        assert!(!state.can_claim);
        assert!(!state.is_claiming);
        assert_eq!(state.phase, Phase::Finished);
        assert_eq!(*controller.balance().borrow(), 10);

        // Eligibility is one-shot
        controller.claim().await;
        assert_eq!(ledger.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_claim_keeps_eligibility_for_retry() {
        let (controller, ledger) = controller(1);
        run_to_finish(&controller, 1).await;

        ledger.set_failing(true);
        let state = controller.claim().await;
        assert!(state.can_claim);
        assert!(!state.is_claiming);
        assert!(state.last_error.as_deref().is_some_and(|e| !e.is_empty()));

        ledger.set_failing(false);
        let state = controller.claim().await;
        assert!(!state.can_claim);
        assert!(state.last_error.is_none());
        assert_eq!(ledger.current_balance(), 10);
        assert_eq!(ledger.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_claims_call_the_ledger_once() {
        let ledger = Arc::new(InMemoryLedger::new(0).with_latency(Duration::from_millis(200)));
        let controller = TimerController::new(config(1), ledger.clone());
        run_to_finish(&controller, 1).await;

        let (a, b) = tokio::join!(controller.claim(), controller.claim());
        assert_eq!(ledger.call_count(), 1);
        assert!(!a.can_claim || !b.can_claim);
        assert!(!controller.state().can_claim);
        assert_eq!(ledger.current_balance(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn reward_snapshot_survives_changes_during_claim() {
        let ledger = Arc::new(GatedLedger::new());
        let controller = Arc::new(TimerController::new(config(1), ledger.clone()));
        run_to_finish(&controller, 1).await;

        let claiming = tokio::spawn({
            let controller = controller.clone();
            async move { controller.claim().await }
        });
        sleep(Duration::from_millis(10)).await;
        assert!(controller.state().is_claiming);

        // Ignored while in flight
        let state = controller.set_reward(100);
        assert_eq!(state.selected_reward, 10);

        ledger.gate.notify_one();
        let state = claiming.await.unwrap();
        assert!(!state.is_claiming);
        assert_eq!(*ledger.balance().borrow(), 10);
        assert_eq!(ledger.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn claim_and_restart_starts_a_new_interval() {
        let (controller, _) = controller(1);
        run_to_finish(&controller, 1).await;

        let state = controller.claim_and_restart().await;
        assert_eq!(state.phase, Phase::Running);
        assert!(!state.can_claim);
        assert_eq!(state.remaining_ms, 60_000);

        sleep(Duration::from_millis(60_200)).await;
        assert!(controller.state().can_claim);
    }

    #[tokio::test(start_paused = true)]
    async fn claim_and_reset_returns_to_idle_without_eligibility() {
        let (controller, _) = controller(1);
        run_to_finish(&controller, 1).await;

        let state = controller.claim_and_reset().await;
        assert_eq!(state.phase, Phase::Idle);
        assert_eq!(state.remaining_ms, 60_000);
        assert!(!state.can_claim);
        assert!(!state.is_claiming);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_during_claim_discards_the_continuation() {
        let ledger = Arc::new(GatedLedger::new());
        let controller = Arc::new(TimerController::new(config(1), ledger.clone()));
        run_to_finish(&controller, 1).await;

        let claiming = tokio::spawn({
            let controller = controller.clone();
            async move { controller.claim_and_restart().await }
        });
        sleep(Duration::from_millis(10)).await;

        let reset = controller.reset();
        assert_eq!(reset.phase, Phase::Idle);
        assert!(!reset.is_claiming);

        ledger.gate.notify_one();
        let state = claiming.await.unwrap();
        assert_eq!(state.phase, Phase::Idle);
        assert!(!state.can_claim);
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_stops_ticks_and_ignores_claim_answer() {
        let ledger = Arc::new(GatedLedger::new());
        let controller = Arc::new(TimerController::new(config(1), ledger.clone()));
        run_to_finish(&controller, 1).await;

        let claiming = tokio::spawn({
            let controller = controller.clone();
            async move { controller.claim_and_restart().await }
        });
        sleep(Duration::from_millis(10)).await;

        controller.dispose();
        assert!(controller.is_disposed());

        ledger.gate.notify_one();
        let state = claiming.await.unwrap();
        // The credit still lands, but the timer does not restart
        assert_eq!(state.phase, Phase::Finished);
        assert_eq!(*ledger.balance().borrow(), 10);

        assert_eq!(controller.start().phase, Phase::Finished);
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_cancels_running_tick_loop() {
        let (controller, _) = controller(1);
        controller.start();
        sleep(Duration::from_millis(500)).await;
        controller.dispose();

        let mut rx = controller.subscribe();
        rx.borrow_and_update();
        sleep(Duration::from_secs(120)).await;
        assert!(!rx.has_changed().unwrap());
        assert_eq!(controller.state().phase, Phase::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn commands_clear_previous_claim_error() {
        let (controller, ledger) = controller(1);
        run_to_finish(&controller, 1).await;

        ledger.set_failing(true);
        assert!(controller.claim().await.last_error.is_some());

        let state = controller.set_reward(25);
        assert!(state.last_error.is_none());
        assert!(state.can_claim);
    }

    #[tokio::test(start_paused = true)]
    async fn remaining_time_comes_from_the_clock_not_tick_count() {
        let clock = ManualClock::new(0);
        let controller = TimerController::with_clock(
            config(1),
            Arc::new(InMemoryLedger::new(0)),
            Arc::new(clock.clone()),
        );
        controller.start();

        // Ticks keep firing but the clock has not moved
        sleep(Duration::from_millis(1_000)).await;
        assert_eq!(controller.state().remaining_ms, 60_000);

        // A single jump is picked up by the next tick
        clock.advance(45_000);
        sleep(Duration::from_millis(150)).await;
        assert_eq!(controller.state().remaining_ms, 15_000);

        clock.advance(20_000);
        sleep(Duration::from_millis(150)).await;
        let state = controller.state();
        assert_eq!(state.phase, Phase::Finished);
        assert!(state.can_claim);
    }

    #[tokio::test(start_paused = true)]
    async fn claim_settles_after_caller_stops_waiting() {
        let ledger = Arc::new(InMemoryLedger::new(0).with_latency(Duration::from_millis(500)));
        let controller = TimerController::new(config(1), ledger.clone());
        run_to_finish(&controller, 1).await;

        let waited = tokio::time::timeout(Duration::from_millis(100), controller.claim()).await;
        assert!(waited.is_err());
        assert!(controller.state().is_claiming);

        sleep(Duration::from_secs(10)).await;
        let state = controller.state();
        assert!(!state.is_claiming);
        assert!(!state.can_claim);
        assert_eq!(ledger.current_balance(), 10);
        assert_eq!(ledger.call_count(), 1);

        // Nothing is left in flight
        assert_eq!(controller.set_reward(20).selected_reward, 20);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_failing_claim_can_be_retried() {
        let ledger = Arc::new(InMemoryLedger::new(0).with_latency(Duration::from_millis(500)));
        let controller = TimerController::new(config(1), ledger.clone());
        run_to_finish(&controller, 1).await;

        ledger.set_failing(true);
        let waited = tokio::time::timeout(Duration::from_millis(100), controller.claim()).await;
        assert!(waited.is_err());

        sleep(Duration::from_secs(1)).await;
        let state = controller.state();
        assert!(!state.is_claiming);
        assert!(state.can_claim);
        assert!(state.last_error.is_some());

        ledger.set_failing(false);
        let state = controller.claim().await;
        assert!(!state.can_claim);
        assert_eq!(ledger.current_balance(), 10);
        assert_eq!(ledger.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_receive_latest_snapshot() {
        let (controller, _) = controller(1);
        controller.set_reward(42);
        let rx = controller.subscribe();
        assert_eq!(rx.borrow().selected_reward, 42);
    }
}

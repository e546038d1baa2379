//! Reward ledger collaborator
//!
//! The ledger owns the reward balance. The timer only asks it to credit an
//! amount and observes the resulting balance.

use std::{
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::{sync::watch, time::sleep};
use tracing::{debug, info};

/// Reasons a credit request can fail
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("the ledger rejected the credit")]
    Rejected,
    #[error("the ledger is unavailable: {0}")]
    Unavailable(String),
}

/// External store of reward balance
#[async_trait]
pub trait RewardLedger: Send + Sync {
    /// Credit `amount` to the balance
    async fn request_credit(&self, amount: u64) -> Result<(), LedgerError>;

    /// Balance stream; new subscribers see the latest value immediately
    fn balance(&self) -> watch::Receiver<u64>;
}

/// Process-local ledger used by the daemon and tests
#[derive(Debug)]
pub struct InMemoryLedger {
    balance_tx: watch::Sender<u64>,
    latency: Duration,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl InMemoryLedger {
    pub fn new(initial_balance: u64) -> Self {
        let (balance_tx, _) = watch::channel(initial_balance);
        Self {
            balance_tx,
            latency: Duration::ZERO,
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// Delay every credit request by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make subsequent credit requests fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of credit requests received so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn current_balance(&self) -> u64 {
        *self.balance_tx.borrow()
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new(0)
    }
}

#[async_trait]
impl RewardLedger for InMemoryLedger {
    async fn request_credit(&self, amount: u64) -> Result<(), LedgerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        debug!("Ledger credit requested: {}", amount);

        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("ledger is in failure mode".to_string()));
        }

        self.balance_tx.send_modify(|balance| *balance = balance.saturating_add(amount));
        info!("Ledger credited {}, balance is now {}", amount, self.current_balance());
        Ok(())
    }

    fn balance(&self) -> watch::Receiver<u64> {
        self.balance_tx.subscribe()
    }
}

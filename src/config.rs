//! Configuration and CLI argument handling

use std::time::Duration;

use clap::Parser;

use crate::state::minutes_to_ms;

/// Recommended tick period; only affects display granularity
pub const DEFAULT_TICK_MS: u64 = 100;

/// CLI argument parsing structure
#[derive(Parser, Debug)]
#[command(name = "reward-timer")]
#[command(about = "A countdown timer that grants a reward once the interval finishes")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Initial timer duration in minutes
    #[arg(short, long, default_value = "25", value_parser = clap::value_parser!(u64).range(1..))]
    pub minutes: u64,

    /// Initial reward granted by a claim
    #[arg(short, long, default_value = "10", value_parser = clap::value_parser!(u64).range(1..))]
    pub reward: u64,

    /// Tick interval in milliseconds
    #[arg(long, default_value_t = DEFAULT_TICK_MS, value_parser = clap::value_parser!(u64).range(1..))]
    pub tick_ms: u64,

    /// Starting balance of the in-memory ledger
    #[arg(long, default_value = "0")]
    pub balance: u64,

    /// Simulated latency of ledger credit requests in milliseconds
    #[arg(long, default_value = "0")]
    pub ledger_latency_ms: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Timer settings for the controller
    pub fn timer(&self) -> TimerConfig {
        TimerConfig {
            initial_minutes: self.minutes,
            initial_reward: self.reward,
            tick_ms: self.tick_ms,
        }
    }

    pub fn ledger_latency(&self) -> Duration {
        Duration::from_millis(self.ledger_latency_ms)
    }
}

/// Construction-time settings of a timer controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    pub initial_minutes: u64,
    pub initial_reward: u64,
    pub tick_ms: u64,
}

impl TimerConfig {
    pub fn initial_duration_ms(&self) -> u64 {
        minutes_to_ms(self.initial_minutes)
    }

    /// Tick period, never shorter than one millisecond
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            initial_minutes: 25,
            initial_reward: 10,
            tick_ms: DEFAULT_TICK_MS,
        }
    }
}

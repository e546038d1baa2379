//! API response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::TimerState;

/// Response returned by every command endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub state: TimerState,
}

impl ApiResponse {
    /// Create a new API response
    pub fn new(status: String, message: String, state: TimerState) -> Self {
        Self {
            status,
            message,
            timestamp: Utc::now(),
            state,
        }
    }

    /// Report the state after a command; ignored commands are not errors
    pub fn ok(message: String, state: TimerState) -> Self {
        Self::new("ok".to_string(), message, state)
    }

    /// Report the state after a claim, flagging the claim's own failure
    pub fn from_claim(message: String, state: TimerState) -> Self {
        match state.last_error.clone() {
            Some(error) => Self::new("error".to_string(), error, state),
            None => Self::ok(message, state),
        }
    }
}

/// Body of POST /duration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurationRequest {
    pub minutes: u64,
}

/// Body of POST /reward
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardRequest {
    pub amount: u64,
}

/// Snapshot plus the derived fields a display needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub state: TimerState,
    pub remaining_display: String,
    pub progress: f64,
    pub balance: u64,
    pub uptime: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Current reward balance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub balance: u64,
    pub timestamp: DateTime<Utc>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

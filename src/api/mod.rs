//! HTTP API module
//! 
//! This module exposes the timer commands and state streams over HTTP.

pub mod handlers;
pub mod responses;

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};
use axum::{
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::TimerController;
use handlers::*;

/// Router state: the controller plus server metadata
pub struct ApiState {
    pub controller: Arc<TimerController>,
    pub start_time: Instant,
    last_action: Mutex<Option<(String, DateTime<Utc>)>>,
}

impl ApiState {
    pub fn new(controller: Arc<TimerController>) -> Self {
        Self {
            controller,
            start_time: Instant::now(),
            last_action: Mutex::new(None),
        }
    }

    /// Remember the latest command for the status endpoint
    pub fn record_action(&self, action: &str) {
        if let Ok(mut last) = self.last_action.lock() {
            *last = Some((action.to_string(), Utc::now()));
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        match self.last_action.lock().ok().and_then(|a| a.clone()) {
            Some((action, time)) => (Some(action), Some(time)),
            None => (None, None),
        }
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;
        
        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/start", post(start_handler))
        .route("/pause", post(pause_handler))
        .route("/resume", post(resume_handler))
        .route("/reset", post(reset_handler))
        .route("/restart", post(restart_handler))
        .route("/claim", post(claim_handler))
        .route("/claim-and-restart", post(claim_and_restart_handler))
        .route("/claim-and-reset", post(claim_and_reset_handler))
        .route("/duration", post(duration_handler))
        .route("/reward", post(reward_handler))
        .route("/state", get(status_handler))
        .route("/balance", get(balance_handler))
        .route("/events", get(events_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

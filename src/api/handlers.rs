//! HTTP endpoint handlers

use std::{convert::Infallible, sync::Arc};
use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
};
use chrono::Utc;
use futures::stream::{self, Stream};
use tracing::{info, warn};

use crate::state::TimerState;
use super::{
    responses::{
        ApiResponse, BalanceResponse, DurationRequest, HealthResponse, RewardRequest,
        StatusResponse,
    },
    ApiState,
};

fn respond(app: &ApiState, action: &str, state: TimerState) -> Json<ApiResponse> {
    app.record_action(action);
    info!("{} endpoint called - phase {:?}", action, state.phase);
    Json(ApiResponse::ok(format!("{} handled", action), state))
}

fn respond_claim(app: &ApiState, action: &str, state: TimerState) -> Json<ApiResponse> {
    app.record_action(action);
    info!("{} endpoint called - can_claim={}", action, state.can_claim);
    Json(ApiResponse::from_claim(format!("{} handled", action), state))
}

/// Handle POST /start
pub async fn start_handler(State(app): State<Arc<ApiState>>) -> Json<ApiResponse> {
    let state = app.controller.start();
    respond(&app, "start", state)
}

/// Handle POST /pause
pub async fn pause_handler(State(app): State<Arc<ApiState>>) -> Json<ApiResponse> {
    let state = app.controller.pause();
    respond(&app, "pause", state)
}

/// Handle POST /resume
pub async fn resume_handler(State(app): State<Arc<ApiState>>) -> Json<ApiResponse> {
    let state = app.controller.resume();
    respond(&app, "resume", state)
}

/// Handle POST /reset
pub async fn reset_handler(State(app): State<Arc<ApiState>>) -> Json<ApiResponse> {
    let state = app.controller.reset();
    respond(&app, "reset", state)
}

/// Handle POST /restart
pub async fn restart_handler(State(app): State<Arc<ApiState>>) -> Json<ApiResponse> {
    let state = app.controller.restart();
    respond(&app, "restart", state)
}

/// Handle POST /claim
pub async fn claim_handler(State(app): State<Arc<ApiState>>) -> Json<ApiResponse> {
    let state = app.controller.claim().await;
    respond_claim(&app, "claim", state)
}

/// Handle POST /claim-and-restart
pub async fn claim_and_restart_handler(State(app): State<Arc<ApiState>>) -> Json<ApiResponse> {
    let state = app.controller.claim_and_restart().await;
    respond_claim(&app, "claim-and-restart", state)
}

/// Handle POST /claim-and-reset
pub async fn claim_and_reset_handler(State(app): State<Arc<ApiState>>) -> Json<ApiResponse> {
    let state = app.controller.claim_and_reset().await;
    respond_claim(&app, "claim-and-reset", state)
}

/// Handle POST /duration - change the interval length in minutes
pub async fn duration_handler(
    State(app): State<Arc<ApiState>>,
    Json(request): Json<DurationRequest>,
) -> Result<Json<ApiResponse>, StatusCode> {
    if request.minutes == 0 {
        warn!("Rejected duration of zero minutes");
        return Err(StatusCode::BAD_REQUEST);
    }
    let state = app.controller.set_duration_minutes(request.minutes);
    Ok(respond(&app, "duration", state))
}

/// Handle POST /reward - change the reward for the next claim
pub async fn reward_handler(
    State(app): State<Arc<ApiState>>,
    Json(request): Json<RewardRequest>,
) -> Result<Json<ApiResponse>, StatusCode> {
    if request.amount == 0 {
        warn!("Rejected reward of zero");
        return Err(StatusCode::BAD_REQUEST);
    }
    let state = app.controller.set_reward(request.amount);
    Ok(respond(&app, "reward", state))
}

/// Handle GET /state - snapshot with display fields
pub async fn status_handler(State(app): State<Arc<ApiState>>) -> Json<StatusResponse> {
    let state = app.controller.state();
    let balance = *app.controller.balance().borrow();
    let (last_action, last_action_time) = app.get_last_action();

    Json(StatusResponse {
        remaining_display: state.remaining_display(),
        progress: state.progress(),
        state,
        balance,
        uptime: app.get_uptime(),
        last_action,
        last_action_time,
    })
}

/// Handle GET /balance
pub async fn balance_handler(State(app): State<Arc<ApiState>>) -> Json<BalanceResponse> {
    let balance = *app.controller.balance().borrow();
    Json(BalanceResponse {
        balance,
        timestamp: Utc::now(),
    })
}

/// Handle GET /events - stream every snapshot as a server-sent event
pub async fn events_handler(
    State(app): State<Arc<ApiState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = app.controller.subscribe();

    let events = stream::unfold((rx, true), |(mut rx, first)| async move {
        if !first && rx.changed().await.is_err() {
            return None;
        }
        let state = rx.borrow_and_update().clone();
        let event = match Event::default().event("state").json_data(&state) {
            Ok(event) => event,
            Err(e) => {
                warn!("Failed to encode state event: {}", e);
                Event::default().event("error").data(e.to_string())
            }
        };
        Some((Ok::<_, Infallible>(event), (rx, false)))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

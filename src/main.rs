//! Reward Timer - a countdown timer that gates a reward claim
//! 
//! This is the main entry point for the reward-timer daemon.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use reward_timer::{
    api::{create_router, ApiState},
    config::Config,
    services::InMemoryLedger,
    state::TimerController,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("reward_timer={},tower_http=info", config.log_level()))
        .init();

    info!("Starting reward-timer server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, timer={}min, reward={}, tick={}ms",
          config.host, config.port, config.minutes, config.reward, config.tick_ms);

    // The ledger lives in-process; the timer only credits it and observes its balance
    let ledger = Arc::new(
        InMemoryLedger::new(config.balance).with_latency(config.ledger_latency()),
    );
    let controller = Arc::new(TimerController::new(config.timer(), ledger));

    // Create HTTP router with all endpoints
    let app = create_router(Arc::new(ApiState::new(Arc::clone(&controller))));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;
    
    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /start | /pause | /resume | /reset | /restart");
    info!("  POST /claim | /claim-and-restart | /claim-and-reset");
    info!("  POST /duration {{\"minutes\": n}}, POST /reward {{\"amount\": n}}");
    info!("  GET  /state, /balance, /events, /health");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);
    
    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    controller.dispose();
    info!("Server shutdown complete");
    Ok(())
}

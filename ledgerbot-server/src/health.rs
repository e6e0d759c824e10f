// File: ledgerbot-server/src/health.rs

use std::net::SocketAddr;
use std::sync::Arc;
use axum::{extract::State, routing::get, Json, Router};
use axum_server::Handle;
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use ledgerbot_core::LedgerBot;

#[derive(Clone)]
struct HealthState {
    bot: Arc<LedgerBot>,
}

async fn index() -> &'static str {
    "LedgerBot is running"
}

async fn health(State(state): State<HealthState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "open_dialogs": state.bot.sessions().len(),
    }))
}

/// Serves `/` and `/health` until `handle` is told to shut down.
pub fn spawn_health_server(addr: SocketAddr, bot: Arc<LedgerBot>, handle: Handle) -> tokio::task::JoinHandle<()> {
    let app = Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .with_state(HealthState { bot })
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    info!("Health endpoint listening on http://{}", addr);
    tokio::spawn(async move {
        let server = axum_server::bind(addr)
            .handle(handle)
            .serve(app.into_make_service());
        if let Err(e) = server.await {
            error!("Health server error: {}", e);
        }
        info!("Health server shut down.");
    })
}

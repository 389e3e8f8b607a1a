use axum::{extract::State, Json};
use chrono::Utc;

use crate::handlers::AppState;
use crate::models::{HealthStatus, NetworkHealth};
use crate::networks::NetworkId;

pub async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    let networks = NetworkId::variants()
        .iter()
        .map(|&network| NetworkHealth {
            network,
            name: network.descriptor().name.to_string(),
            wallet_configured: state.registry.receiving_wallet(network).is_some(),
        })
        .collect();

    let subscriptions = state.ledger.list().await.map(|r| r.len() as u64).unwrap_or(0);

    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        networks,
        subscriptions,
        timestamp: Utc::now(),
    })
}

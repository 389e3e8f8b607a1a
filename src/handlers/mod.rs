pub mod health;
pub mod subscriptions;

pub use health::*;
pub use subscriptions::*;

use axum::{
    routing::{get, post},
    Router,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/subscriptions", post(create_subscription))
        .route("/api/subscriptions/verify", post(verify_subscription))
        .route("/api/admin/subscriptions", get(list_subscriptions))
        .with_state(state)
}

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use subgate::{
    amount::Tolerance,
    config::Config,
    handlers::{self, AppState, PollPolicy},
    networks::NetworkRegistry,
    services::{Ledger, MemoryLedger, PaymentVerificationService},
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    tracing::info!("Starting subgate v{}", env!("CARGO_PKG_VERSION"));

    // Initialize services
    let registry = Arc::new(NetworkRegistry::from_config(&config));
    let verification = Arc::new(PaymentVerificationService::new(
        registry.clone(),
        Duration::from_secs(config.chain_timeout_secs),
        Tolerance::from_bps(config.amount_tolerance_bps),
    )?);
    let ledger: Arc<dyn Ledger> = Arc::new(MemoryLedger::new());

    let state = AppState {
        ledger,
        verification,
        registry,
        poll: PollPolicy {
            attempts: config.verify_poll_attempts,
            interval: Duration::from_secs(config.verify_poll_interval_secs),
        },
        admin_token: config.admin_token.clone(),
    };

    // Build router
    let app = handlers::router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for ctrl+c");
    tracing::info!("Shutting down gracefully...");
}

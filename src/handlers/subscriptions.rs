use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    error::SubgateError,
    models::{
        CreateSubscriptionRequest, CreateSubscriptionResponse, SubscriptionRecord,
        SubscriptionSummary, VerifyDetails, VerifyRequest, VerifyResponse,
    },
    networks::NetworkRegistry,
    services::{Ledger, PaymentVerificationService},
};

/// Bounded fixed-interval retry schedule for background verification.
/// Covers the gap between checkout submission and chain finality.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn Ledger>,
    pub verification: Arc<PaymentVerificationService>,
    pub registry: Arc<NetworkRegistry>,
    pub poll: PollPolicy,
    pub admin_token: Option<String>,
}

pub async fn create_subscription(
    State(state): State<AppState>,
    Json(request): Json<CreateSubscriptionRequest>,
) -> Result<(StatusCode, Json<CreateSubscriptionResponse>), SubgateError> {
    let new = request.validate()?;

    // Refuse before any funds can be sent to an unverifiable network.
    if state.registry.receiving_wallet(new.network).is_none() {
        return Err(SubgateError::ReceivingWalletNotConfigured(new.network));
    }

    let record = state.ledger.insert_unverified(new).await?;
    tracing::info!(
        id = %record.id,
        network = %record.network,
        tx = %record.tx_hash,
        "subscription recorded, verification scheduled"
    );

    // The record is persisted before this is spawned; the response does not
    // wait for the chain.
    tokio::spawn(verify_in_background(
        state.ledger.clone(),
        state.verification.clone(),
        record.clone(),
        state.poll,
    ));

    Ok((
        StatusCode::CREATED,
        Json(CreateSubscriptionResponse {
            success: true,
            subscription: SubscriptionSummary {
                id: record.id,
                tx_hash: record.tx_hash,
                created_at: record.created_at,
            },
        }),
    ))
}

pub async fn verify_subscription(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, SubgateError> {
    let record = match (request.subscription_id, request.tx_hash.as_deref()) {
        (Some(id), _) => state.ledger.find_by_id(id).await?,
        (None, Some(tx_hash)) => state.ledger.find_by_tx_hash(tx_hash).await?,
        (None, None) => {
            return Err(SubgateError::InvalidRequest(
                "Either subscriptionId or txHash is required".to_string(),
            ))
        }
    };
    let record = record.ok_or(SubgateError::SubscriptionNotFound)?;

    // Verified is the only terminal state; answer from the ledger without
    // touching the chain again.
    if record.tx_verified {
        return Ok(Json(VerifyResponse {
            verified: true,
            message: Some("Transaction already verified".to_string()),
            verified_at: record.verified_at,
            details: None,
            error: None,
        }));
    }

    let outcome = state
        .verification
        .verify(record.network, &record.tx_hash, &record.amount)
        .await?;

    if outcome.verified {
        let verified_at = Utc::now();
        state.ledger.mark_verified(record.id, verified_at).await?;
        Ok(Json(VerifyResponse {
            verified: true,
            message: Some("Transaction verified successfully".to_string()),
            verified_at: Some(verified_at),
            details: Some(VerifyDetails::from(&outcome)),
            error: None,
        }))
    } else {
        Ok(Json(VerifyResponse {
            verified: false,
            message: None,
            verified_at: None,
            details: Some(VerifyDetails::from(&outcome)),
            error: outcome.reason.map(|reason| reason.to_string()),
        }))
    }
}

pub async fn list_subscriptions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<SubscriptionRecord>>, SubgateError> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Err(SubgateError::Unauthorized);
    };
    let provided = headers
        .get("x-admin-token")
        .and_then(|value| value.to_str().ok());
    if provided != Some(expected) {
        return Err(SubgateError::Unauthorized);
    }

    Ok(Json(state.ledger.list().await?))
}

/// Retries until the transaction verifies, the failure becomes terminal, or
/// the attempt limit runs out. The record simply stays unverified on give
/// up; a later explicit verify call can still succeed.
async fn verify_in_background(
    ledger: Arc<dyn Ledger>,
    verification: Arc<PaymentVerificationService>,
    record: SubscriptionRecord,
    poll: PollPolicy,
) {
    for attempt in 1..=poll.attempts {
        match verification
            .verify(record.network, &record.tx_hash, &record.amount)
            .await
        {
            Ok(outcome) if outcome.verified => {
                if let Err(err) = ledger.mark_verified(record.id, Utc::now()).await {
                    tracing::error!(id = %record.id, error = %err, "failed to mark verified");
                } else {
                    tracing::info!(
                        id = %record.id,
                        explorer = %record
                            .network
                            .descriptor()
                            .tx_explorer_url(&record.tx_hash),
                        "payment verified"
                    );
                }
                return;
            }
            Ok(outcome) => match outcome.reason {
                Some(reason) if reason.is_retryable() => {
                    tracing::debug!(
                        id = %record.id,
                        attempt,
                        "transaction not yet confirmed, will retry"
                    );
                }
                reason => {
                    tracing::warn!(id = %record.id, ?reason, "verification rejected");
                    return;
                }
            },
            Err(err) if err.is_retryable() => {
                tracing::warn!(id = %record.id, attempt, error = %err, "chain query failed, will retry");
            }
            Err(err) => {
                tracing::error!(id = %record.id, error = %err, "verification aborted");
                return;
            }
        }
        tokio::time::sleep(poll.interval).await;
    }
    tracing::warn!(
        id = %record.id,
        attempts = poll.attempts,
        "verification attempts exhausted; record left unverified"
    );
}

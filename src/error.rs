use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::networks::NetworkId;

#[derive(Error, Debug)]
pub enum SubgateError {
    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(String),

    #[error("Receiving wallet not configured for {0}")]
    ReceivingWalletNotConfigured(NetworkId),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Transaction already recorded: {0}")]
    DuplicateTransaction(String),

    #[error("Subscription not found")]
    SubscriptionNotFound,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Chain query failed: {0}")]
    ChainUnavailable(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl From<ethers::providers::ProviderError> for SubgateError {
    fn from(err: ethers::providers::ProviderError) -> Self {
        SubgateError::ChainUnavailable(err.to_string())
    }
}

impl From<reqwest::Error> for SubgateError {
    fn from(err: reqwest::Error) -> Self {
        SubgateError::ChainUnavailable(err.to_string())
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub timestamp: chrono::DateTime<Utc>,
    pub request_id: String,
}

impl SubgateError {
    /// Infrastructure failures are safe to retry with backoff; everything
    /// else is terminal for the current request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubgateError::ChainUnavailable(_))
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            SubgateError::UnsupportedNetwork(_) => {
                (StatusCode::BAD_REQUEST, "UNSUPPORTED_NETWORK")
            }
            SubgateError::ReceivingWalletNotConfigured(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "RECEIVING_WALLET_NOT_CONFIGURED",
            ),
            SubgateError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            SubgateError::DuplicateTransaction(_) => {
                (StatusCode::CONFLICT, "DUPLICATE_TRANSACTION")
            }
            SubgateError::SubscriptionNotFound => {
                (StatusCode::NOT_FOUND, "SUBSCRIPTION_NOT_FOUND")
            }
            SubgateError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            SubgateError::ChainUnavailable(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            SubgateError::InternalError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }
}

impl IntoResponse for SubgateError {
    fn into_response(self) -> Response {
        let request_id = Uuid::new_v4().to_string();
        let (status, error_code) = self.status_and_code();

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            error_code: error_code.to_string(),
            timestamp: Utc::now(),
            request_id,
        };

        tracing::error!(
            error = ?self,
            error_code = error_code,
            "Request failed"
        );

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_errors_to_http_statuses() {
        let cases = [
            (
                SubgateError::UnsupportedNetwork("SOL".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                SubgateError::ReceivingWalletNotConfigured(NetworkId::Trx),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                SubgateError::DuplicateTransaction("0xabc".to_string()),
                StatusCode::CONFLICT,
            ),
            (SubgateError::SubscriptionNotFound, StatusCode::NOT_FOUND),
            (
                SubgateError::ChainUnavailable("timeout".to_string()),
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status_and_code().0, expected);
        }
    }

    #[test]
    fn only_infrastructure_errors_are_retryable() {
        assert!(SubgateError::ChainUnavailable("timeout".to_string()).is_retryable());
        assert!(!SubgateError::UnsupportedNetwork("SOL".to_string()).is_retryable());
        assert!(!SubgateError::DuplicateTransaction("0xabc".to_string()).is_retryable());
    }
}

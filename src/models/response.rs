use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::VerificationOutcome;
use crate::networks::NetworkId;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    #[serde(default)]
    pub subscription_id: Option<Uuid>,
    #[serde(default)]
    pub tx_hash: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VerifyDetails {
    pub from: Option<String>,
    pub to: Option<String>,
    pub amount: Option<String>,
    pub block_number: Option<u64>,
    pub timestamp: Option<u64>,
}

impl From<&VerificationOutcome> for VerifyDetails {
    fn from(outcome: &VerificationOutcome) -> Self {
        Self {
            from: outcome.from.clone(),
            to: outcome.to.clone(),
            amount: outcome.amount.clone(),
            block_number: outcome.block_number,
            timestamp: outcome.timestamp,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<VerifyDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSummary {
    pub id: Uuid,
    pub tx_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct CreateSubscriptionResponse {
    pub success: bool,
    pub subscription: SubscriptionSummary,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NetworkHealth {
    pub network: NetworkId,
    pub name: String,
    pub wallet_configured: bool,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub networks: Vec<NetworkHealth>,
    pub subscriptions: u64,
    pub timestamp: DateTime<Utc>,
}

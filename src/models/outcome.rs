use serde::{Deserialize, Serialize};
use std::fmt;

use crate::networks::NetworkId;

/// One verification attempt's input, built at the single point where the
/// receiving wallet is resolved.
#[derive(Debug, Clone)]
pub struct VerificationRequest {
    pub network: NetworkId,
    pub tx_hash: String,
    pub expected_recipient: String,
    /// Claimed amount in the token's human units, as a decimal string.
    pub expected_amount: String,
}

/// On-chain reasons a transaction does not verify. Terminal for the hash as
/// currently observed, except `NotFound` which may flip once the transaction
/// is mined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    NotFound,
    TransactionFailed,
    NoTransferFound,
    RecipientMismatch,
    AmountMismatch,
}

impl FailureReason {
    pub fn is_retryable(self) -> bool {
        matches!(self, FailureReason::NotFound)
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            FailureReason::NotFound => "Transaction not found or not confirmed",
            FailureReason::TransactionFailed => "Transaction failed",
            FailureReason::NoTransferFound => "No USDT transfer found in transaction",
            FailureReason::RecipientMismatch => "Recipient mismatch",
            FailureReason::AmountMismatch => "Amount mismatch",
        };
        f.write_str(message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Observed amount in human units, as an exact decimal string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// Block time in seconds since the epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
}

impl VerificationOutcome {
    pub fn success(
        from: String,
        to: String,
        amount: String,
        block_number: Option<u64>,
        timestamp: Option<u64>,
    ) -> Self {
        Self {
            verified: true,
            from: Some(from),
            to: Some(to),
            amount: Some(amount),
            block_number,
            timestamp,
            reason: None,
        }
    }

    pub fn failure(reason: FailureReason) -> Self {
        Self {
            verified: false,
            from: None,
            to: None,
            amount: None,
            block_number: None,
            timestamp: None,
            reason: Some(reason),
        }
    }

    /// Failed check that still carries what the chain actually recorded, so
    /// a mismatched payment stays auditable.
    pub fn failure_observed(reason: FailureReason, from: String, to: String, amount: String) -> Self {
        Self {
            verified: false,
            from: Some(from),
            to: Some(to),
            amount: Some(amount),
            block_number: None,
            timestamp: None,
            reason: Some(reason),
        }
    }
}

use ethers::types::U256;
use serde::Deserialize;
use std::time::Duration;

use crate::amount::{self, Tolerance};
use crate::error::SubgateError;
use crate::models::{FailureReason, VerificationOutcome};
use crate::networks::NetworkDescriptor;

/// Read-only verifier for TRC20 USDT transfers, backed by the Tron
/// event-indexing HTTP API rather than raw log topics.
pub struct TronVerifier {
    http: reqwest::Client,
    api_url: String,
    token_contract: String,
    token_decimals: u32,
    tolerance: Tolerance,
}

#[derive(Debug, Deserialize)]
struct TronTransactionResponse {
    #[serde(default)]
    data: Vec<TronTransaction>,
}

#[derive(Debug, Deserialize)]
struct TronTransaction {
    #[serde(default)]
    ret: Vec<TronRet>,
    #[serde(rename = "blockNumber", default)]
    block_number: Option<u64>,
    /// Milliseconds since the epoch.
    #[serde(default)]
    block_timestamp: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TronRet {
    #[serde(rename = "contractRet", default)]
    contract_ret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TronEventsResponse {
    #[serde(default)]
    data: Vec<TronEvent>,
}

#[derive(Debug, Deserialize)]
struct TronEvent {
    #[serde(default)]
    contract_address: String,
    #[serde(default)]
    event_name: String,
    #[serde(default)]
    block_number: Option<u64>,
    #[serde(default)]
    result: TronTransferResult,
}

/// The event API decodes Transfer results under two naming conventions
/// depending on how the contract ABI was registered; both mean the same
/// thing.
#[derive(Debug, Default, Deserialize)]
struct TronTransferResult {
    #[serde(default, alias = "_from")]
    from: Option<String>,
    #[serde(default, alias = "_to")]
    to: Option<String>,
    #[serde(default, alias = "_value")]
    value: Option<String>,
}

impl TronVerifier {
    pub fn new(
        descriptor: &NetworkDescriptor,
        endpoint: &str,
        call_timeout: Duration,
        tolerance: Tolerance,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(call_timeout).build()?;

        Ok(Self {
            http,
            api_url: endpoint.trim_end_matches('/').to_string(),
            token_contract: descriptor.token_contract.to_string(),
            token_decimals: descriptor.token_decimals,
            tolerance,
        })
    }

    pub async fn verify(
        &self,
        tx_hash: &str,
        expected_recipient: &str,
        expected_units: U256,
    ) -> Result<VerificationOutcome, SubgateError> {
        let Some(transaction) = self.fetch_transaction(tx_hash).await? else {
            return Ok(VerificationOutcome::failure(FailureReason::NotFound));
        };

        if let Some(ret) = transaction
            .ret
            .first()
            .and_then(|r| r.contract_ret.as_deref())
        {
            if ret != "SUCCESS" {
                tracing::warn!(tx = tx_hash, result = ret, "tron transaction did not succeed");
                return Ok(VerificationOutcome::failure(FailureReason::TransactionFailed));
            }
        }

        let events = self.fetch_events(tx_hash).await?;
        let Some(event) = events.into_iter().find(|event| {
            event.contract_address == self.token_contract && event.event_name == "Transfer"
        }) else {
            return Ok(VerificationOutcome::failure(FailureReason::NoTransferFound));
        };

        let (Some(from), Some(to), Some(value)) =
            (event.result.from, event.result.to, event.result.value)
        else {
            return Err(SubgateError::ChainUnavailable(
                "transfer event is missing decoded fields".to_string(),
            ));
        };

        let raw_amount = U256::from_dec_str(&value).map_err(|err| {
            SubgateError::ChainUnavailable(format!("bad transfer event value {value:?}: {err}"))
        })?;
        let amount = amount::from_base_units(raw_amount, self.token_decimals);

        // Base58 addresses are case sensitive, so the comparison is exact.
        if to != expected_recipient {
            tracing::warn!(
                tx = tx_hash,
                expected = expected_recipient,
                observed = %to,
                "transfer recipient mismatch"
            );
            return Ok(VerificationOutcome::failure_observed(
                FailureReason::RecipientMismatch,
                from,
                to,
                amount,
            ));
        }

        if !self.tolerance.within(expected_units, raw_amount) {
            tracing::warn!(tx = tx_hash, observed = %amount, "transfer amount outside tolerance");
            return Ok(VerificationOutcome::failure_observed(
                FailureReason::AmountMismatch,
                from,
                to,
                amount,
            ));
        }

        let block_number = event.block_number.or(transaction.block_number);
        // The API reports block time in milliseconds; outcomes carry seconds.
        let timestamp = transaction.block_timestamp.map(|ms| ms / 1000);

        tracing::info!(tx = tx_hash, amount = %amount, "payment verified");

        Ok(VerificationOutcome::success(
            from,
            to,
            amount,
            block_number,
            timestamp,
        ))
    }

    async fn fetch_transaction(
        &self,
        tx_hash: &str,
    ) -> Result<Option<TronTransaction>, SubgateError> {
        let url = format!("{}/v1/transactions/{}", self.api_url, tx_hash);
        let response = self.http.get(&url).send().await.map_err(|err| {
            SubgateError::ChainUnavailable(format!("tron transaction query failed: {err}"))
        })?;

        if !response.status().is_success() {
            return Ok(None);
        }

        let body: TronTransactionResponse = response.json().await.map_err(|err| {
            SubgateError::ChainUnavailable(format!("bad tron transaction response: {err}"))
        })?;
        Ok(body.data.into_iter().next())
    }

    async fn fetch_events(&self, tx_hash: &str) -> Result<Vec<TronEvent>, SubgateError> {
        let url = format!("{}/v1/transactions/{}/events", self.api_url, tx_hash);
        let response = self.http.get(&url).send().await.map_err(|err| {
            SubgateError::ChainUnavailable(format!("tron events query failed: {err}"))
        })?;

        if !response.status().is_success() {
            return Err(SubgateError::ChainUnavailable(format!(
                "tron events query returned {}",
                response.status()
            )));
        }

        let body: TronEventsResponse = response.json().await.map_err(|err| {
            SubgateError::ChainUnavailable(format!("bad tron events response: {err}"))
        })?;
        Ok(body.data)
    }
}

use ethers::{
    providers::{Http, Middleware, Provider},
    types::{Address, Block, TransactionReceipt, H256, U256, U64},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::amount::{self, Tolerance};
use crate::error::SubgateError;
use crate::models::{FailureReason, VerificationOutcome};
use crate::networks::{NetworkDescriptor, NetworkId};

/// keccak256("Transfer(address,address,uint256)")
const TRANSFER_EVENT_TOPIC: H256 = H256([
    0xdd, 0xf2, 0x52, 0xad, 0x1b, 0xe2, 0xc8, 0x9b, 0x69, 0xc2, 0xb0, 0x68, 0xfc, 0x37, 0x8d,
    0xaa, 0x95, 0x2b, 0xa7, 0xf1, 0x63, 0xc4, 0xa1, 0x16, 0x28, 0xf5, 0x5a, 0x4d, 0xf5, 0x23,
    0xb3, 0xef,
]);

/// Read-only verifier for USDT transfers on the EVM networks (ETH, BNB).
/// Reconstructs what actually happened from the transaction receipt's event
/// log rather than trusting anything the checkout claimed.
pub struct EvmVerifier {
    provider: Arc<Provider<Http>>,
    network: NetworkId,
    token_contract: Address,
    token_decimals: u32,
    call_timeout: Duration,
    tolerance: Tolerance,
}

impl EvmVerifier {
    pub fn new(
        descriptor: &NetworkDescriptor,
        endpoint: &str,
        call_timeout: Duration,
        tolerance: Tolerance,
    ) -> anyhow::Result<Self> {
        let provider = Arc::new(Provider::<Http>::try_from(endpoint)?);
        let token_contract: Address = descriptor.token_contract.parse()?;

        Ok(Self {
            provider,
            network: descriptor.id,
            token_contract,
            token_decimals: descriptor.token_decimals,
            call_timeout,
            tolerance,
        })
    }

    pub async fn verify(
        &self,
        tx_hash: H256,
        expected_recipient: Address,
        expected_units: U256,
    ) -> Result<VerificationOutcome, SubgateError> {
        let Some(receipt) = self.fetch_receipt(tx_hash).await? else {
            return Ok(VerificationOutcome::failure(FailureReason::NotFound));
        };

        if receipt.status != Some(U64::from(1)) {
            tracing::warn!(network = %self.network, tx = ?tx_hash, "transaction reverted");
            return Ok(VerificationOutcome::failure(FailureReason::TransactionFailed));
        }

        // Address equality on parsed values is case-insensitive by
        // construction; checksummed and lowercase forms compare equal.
        let Some(log) = receipt.logs.iter().find(|log| {
            log.address == self.token_contract
                && log.topics.first() == Some(&TRANSFER_EVENT_TOPIC)
                && log.topics.len() >= 3
        }) else {
            return Ok(VerificationOutcome::failure(FailureReason::NoTransferFound));
        };

        if log.data.len() > 32 {
            return Err(SubgateError::ChainUnavailable(format!(
                "unexpected transfer event payload of {} bytes",
                log.data.len()
            )));
        }

        let from = Address::from(log.topics[1]);
        let to = Address::from(log.topics[2]);
        let raw_amount = U256::from_big_endian(&log.data);
        let amount = amount::from_base_units(raw_amount, self.token_decimals);

        if to != expected_recipient {
            tracing::warn!(
                network = %self.network,
                tx = ?tx_hash,
                expected = ?expected_recipient,
                observed = ?to,
                "transfer recipient mismatch"
            );
            return Ok(VerificationOutcome::failure_observed(
                FailureReason::RecipientMismatch,
                format_address(from),
                format_address(to),
                amount,
            ));
        }

        if !self.tolerance.within(expected_units, raw_amount) {
            tracing::warn!(
                network = %self.network,
                tx = ?tx_hash,
                observed = %amount,
                "transfer amount outside tolerance"
            );
            return Ok(VerificationOutcome::failure_observed(
                FailureReason::AmountMismatch,
                format_address(from),
                format_address(to),
                amount,
            ));
        }

        // The receipt proved the block exists, so a missing block here is an
        // upstream problem, not a semantic one.
        let block_number = receipt.block_number.ok_or_else(|| {
            SubgateError::ChainUnavailable("receipt is missing a block number".to_string())
        })?;
        let block = self.fetch_block(block_number).await?;

        tracing::info!(
            network = %self.network,
            tx = ?tx_hash,
            amount = %amount,
            block = block_number.as_u64(),
            "payment verified"
        );

        Ok(VerificationOutcome::success(
            format_address(from),
            format_address(to),
            amount,
            Some(block_number.as_u64()),
            Some(block.timestamp.as_u64()),
        ))
    }

    async fn fetch_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<TransactionReceipt>, SubgateError> {
        match timeout(
            self.call_timeout,
            self.provider.get_transaction_receipt(tx_hash),
        )
        .await
        {
            Ok(Ok(receipt)) => Ok(receipt),
            Ok(Err(err)) => Err(SubgateError::ChainUnavailable(format!(
                "receipt fetch failed: {err}"
            ))),
            Err(_) => Err(SubgateError::ChainUnavailable(format!(
                "receipt fetch timed out after {:?}",
                self.call_timeout
            ))),
        }
    }

    async fn fetch_block(&self, number: U64) -> Result<Block<H256>, SubgateError> {
        match timeout(self.call_timeout, self.provider.get_block(number.as_u64())).await {
            Ok(Ok(Some(block))) => Ok(block),
            Ok(Ok(None)) => Err(SubgateError::ChainUnavailable(format!(
                "block {number} not available"
            ))),
            Ok(Err(err)) => Err(SubgateError::ChainUnavailable(format!(
                "block fetch failed: {err}"
            ))),
            Err(_) => Err(SubgateError::ChainUnavailable(format!(
                "block fetch timed out after {:?}",
                self.call_timeout
            ))),
        }
    }
}

fn format_address(address: Address) -> String {
    format!("{address:?}")
}

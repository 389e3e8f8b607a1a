use ethers::types::{Address, H256};
use std::sync::Arc;
use std::time::Duration;

use crate::amount::{self, Tolerance};
use crate::error::SubgateError;
use crate::models::{VerificationOutcome, VerificationRequest};
use crate::networks::{NetworkId, NetworkRegistry};
use crate::services::{EvmVerifier, TronVerifier};

/// Dispatches a claimed payment to the right chain verifier. This is the
/// single place the operator's receiving wallet is resolved, so an
/// unconfigured network is refused before any chain query is spent.
///
/// Verification holds no mutable state: any number of calls for any mix of
/// hashes and networks may run concurrently, and re-verifying a finalized
/// hash deterministically reproduces the same outcome.
pub struct PaymentVerificationService {
    registry: Arc<NetworkRegistry>,
    eth: EvmVerifier,
    bnb: EvmVerifier,
    tron: TronVerifier,
}

impl PaymentVerificationService {
    pub fn new(
        registry: Arc<NetworkRegistry>,
        chain_timeout: Duration,
        tolerance: Tolerance,
    ) -> anyhow::Result<Self> {
        let eth = EvmVerifier::new(
            NetworkId::Eth.descriptor(),
            registry.endpoint(NetworkId::Eth),
            chain_timeout,
            tolerance,
        )?;
        let bnb = EvmVerifier::new(
            NetworkId::Bnb.descriptor(),
            registry.endpoint(NetworkId::Bnb),
            chain_timeout,
            tolerance,
        )?;
        let tron = TronVerifier::new(
            NetworkId::Trx.descriptor(),
            registry.endpoint(NetworkId::Trx),
            chain_timeout,
            tolerance,
        )?;

        Ok(Self {
            registry,
            eth,
            bnb,
            tron,
        })
    }

    pub async fn verify(
        &self,
        network: NetworkId,
        tx_hash: &str,
        claimed_amount: &str,
    ) -> Result<VerificationOutcome, SubgateError> {
        let wallet = self
            .registry
            .receiving_wallet(network)
            .ok_or(SubgateError::ReceivingWalletNotConfigured(network))?;

        let request = VerificationRequest {
            network,
            tx_hash: tx_hash.to_string(),
            expected_recipient: wallet.to_string(),
            expected_amount: claimed_amount.to_string(),
        };
        self.dispatch(&request).await
    }

    async fn dispatch(
        &self,
        request: &VerificationRequest,
    ) -> Result<VerificationOutcome, SubgateError> {
        let descriptor = self.registry.describe(request.network);
        let expected_units =
            amount::to_base_units(&request.expected_amount, descriptor.token_decimals)?;

        match request.network {
            NetworkId::Eth | NetworkId::Bnb => {
                let tx_hash: H256 = request.tx_hash.parse().map_err(|_| {
                    SubgateError::InvalidRequest(format!(
                        "invalid transaction hash: {}",
                        request.tx_hash
                    ))
                })?;
                let recipient: Address = request.expected_recipient.parse().map_err(|_| {
                    SubgateError::InvalidRequest(format!(
                        "invalid receiving wallet: {}",
                        request.expected_recipient
                    ))
                })?;
                let verifier = match request.network {
                    NetworkId::Eth => &self.eth,
                    _ => &self.bnb,
                };
                verifier.verify(tx_hash, recipient, expected_units).await
            }
            NetworkId::Trx => {
                self.tron
                    .verify(&request.tx_hash, &request.expected_recipient, expected_units)
                    .await
            }
        }
    }
}

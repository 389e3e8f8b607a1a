use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::Config;
use crate::error::SubgateError;

/// Closed set of networks the storefront accepts USDT on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkId {
    #[serde(rename = "ETH")]
    Eth,
    #[serde(rename = "BNB")]
    Bnb,
    #[serde(rename = "TRX")]
    Trx,
}

impl NetworkId {
    pub fn variants() -> &'static [NetworkId] {
        &[NetworkId::Eth, NetworkId::Bnb, NetworkId::Trx]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkId::Eth => "ETH",
            NetworkId::Bnb => "BNB",
            NetworkId::Trx => "TRX",
        }
    }

    pub fn descriptor(&self) -> &'static NetworkDescriptor {
        match self {
            NetworkId::Eth => &ETHEREUM,
            NetworkId::Bnb => &BNB_CHAIN,
            NetworkId::Trx => &TRON,
        }
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkId {
    type Err = SubgateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ETH" => Ok(NetworkId::Eth),
            "BNB" => Ok(NetworkId::Bnb),
            "TRX" => Ok(NetworkId::Trx),
            other => Err(SubgateError::UnsupportedNetwork(other.to_string())),
        }
    }
}

/// Address encoding a network's wallets use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletFormat {
    /// 0x-prefixed 40-hex-character addresses.
    Evm,
    /// 34-character base58 addresses starting with "T".
    Tron,
}

#[derive(Debug, Clone)]
pub struct NetworkDescriptor {
    pub id: NetworkId,
    pub name: &'static str,
    pub chain_id: Option<u64>,
    pub token_contract: &'static str,
    pub token_decimals: u32,
    pub default_endpoint: &'static str,
    pub explorer_url: &'static str,
    pub wallet_format: WalletFormat,
}

impl NetworkDescriptor {
    pub fn tx_explorer_url(&self, tx_hash: &str) -> String {
        match self.wallet_format {
            WalletFormat::Evm => format!("{}/tx/{}", self.explorer_url, tx_hash),
            WalletFormat::Tron => format!("{}/#/transaction/{}", self.explorer_url, tx_hash),
        }
    }

    pub fn address_explorer_url(&self, address: &str) -> String {
        match self.wallet_format {
            WalletFormat::Evm => format!("{}/address/{}", self.explorer_url, address),
            WalletFormat::Tron => format!("{}/#/address/{}", self.explorer_url, address),
        }
    }
}

static ETHEREUM: NetworkDescriptor = NetworkDescriptor {
    id: NetworkId::Eth,
    name: "Ethereum",
    chain_id: Some(1),
    token_contract: "0xdAC17F958D2ee523a2206206994597C13D831ec7",
    token_decimals: 6,
    default_endpoint: "https://eth.llamarpc.com",
    explorer_url: "https://etherscan.io",
    wallet_format: WalletFormat::Evm,
};

static BNB_CHAIN: NetworkDescriptor = NetworkDescriptor {
    id: NetworkId::Bnb,
    name: "BNB Smart Chain",
    chain_id: Some(56),
    token_contract: "0x55d398326f99059fF775485246999027B3197955",
    token_decimals: 18,
    default_endpoint: "https://bsc-dataseed.binance.org",
    explorer_url: "https://bscscan.com",
    wallet_format: WalletFormat::Evm,
};

static TRON: NetworkDescriptor = NetworkDescriptor {
    id: NetworkId::Trx,
    name: "Tron",
    chain_id: None,
    token_contract: "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t",
    token_decimals: 6,
    default_endpoint: "https://api.trongrid.io",
    explorer_url: "https://tronscan.org",
    wallet_format: WalletFormat::Tron,
};

/// Read-only catalogue of supported networks plus the operator's
/// configured endpoints and receiving wallets. Built once at startup.
#[derive(Debug, Clone)]
pub struct NetworkRegistry {
    eth_endpoint: String,
    bnb_endpoint: String,
    tron_endpoint: String,
    evm_wallet: Option<String>,
    tron_wallet: Option<String>,
}

impl NetworkRegistry {
    pub fn from_config(config: &Config) -> Self {
        Self {
            eth_endpoint: config
                .eth_rpc_url
                .clone()
                .unwrap_or_else(|| ETHEREUM.default_endpoint.to_string()),
            bnb_endpoint: config
                .bnb_rpc_url
                .clone()
                .unwrap_or_else(|| BNB_CHAIN.default_endpoint.to_string()),
            tron_endpoint: config
                .tron_api_url
                .clone()
                .unwrap_or_else(|| TRON.default_endpoint.to_string()),
            evm_wallet: config.receiving_wallet_evm.clone(),
            tron_wallet: config.receiving_wallet_tron.clone(),
        }
    }

    pub fn describe(&self, id: NetworkId) -> &'static NetworkDescriptor {
        id.descriptor()
    }

    pub fn endpoint(&self, id: NetworkId) -> &str {
        match id {
            NetworkId::Eth => &self.eth_endpoint,
            NetworkId::Bnb => &self.bnb_endpoint,
            NetworkId::Trx => &self.tron_endpoint,
        }
    }

    /// The operator wallet payments on this network must arrive at.
    /// `None` means the network is not configured and checkout must refuse
    /// to initiate a payment that could never be verified.
    pub fn receiving_wallet(&self, id: NetworkId) -> Option<&str> {
        match id {
            NetworkId::Eth | NetworkId::Bnb => self.evm_wallet.as_deref(),
            NetworkId::Trx => self.tron_wallet.as_deref(),
        }
    }
}

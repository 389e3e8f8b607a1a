use anyhow::{bail, Context, Result};

use crate::models::{is_evm_address, is_tron_address};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,

    // Chain endpoints; the registry falls back to public defaults.
    pub eth_rpc_url: Option<String>,
    pub bnb_rpc_url: Option<String>,
    pub tron_api_url: Option<String>,

    // Operator receiving wallets. One EVM address serves both ETH and BNB.
    pub receiving_wallet_evm: Option<String>,
    pub receiving_wallet_tron: Option<String>,

    // Verification policy
    pub chain_timeout_secs: u64,
    pub amount_tolerance_bps: u32,
    pub verify_poll_attempts: u32,
    pub verify_poll_interval_secs: u64,

    // Admin view
    pub admin_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            eth_rpc_url: None,
            bnb_rpc_url: None,
            tron_api_url: None,
            receiving_wallet_evm: None,
            receiving_wallet_tron: None,
            chain_timeout_secs: 15,
            amount_tolerance_bps: 10,
            verify_poll_attempts: 20,
            verify_poll_interval_secs: 3,
            admin_token: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();
        let config = Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| defaults.port.to_string())
                .parse()
                .context("Invalid PORT")?,

            eth_rpc_url: std::env::var("ETH_RPC_URL").ok(),
            bnb_rpc_url: std::env::var("BNB_RPC_URL").ok(),
            tron_api_url: std::env::var("TRON_API_URL").ok(),

            receiving_wallet_evm: std::env::var("RECEIVING_WALLET_EVM").ok(),
            receiving_wallet_tron: std::env::var("RECEIVING_WALLET_TRON").ok(),

            chain_timeout_secs: std::env::var("CHAIN_TIMEOUT_SECS")
                .unwrap_or_else(|_| defaults.chain_timeout_secs.to_string())
                .parse()
                .context("Invalid CHAIN_TIMEOUT_SECS")?,
            amount_tolerance_bps: std::env::var("AMOUNT_TOLERANCE_BPS")
                .unwrap_or_else(|_| defaults.amount_tolerance_bps.to_string())
                .parse()
                .context("Invalid AMOUNT_TOLERANCE_BPS")?,
            verify_poll_attempts: std::env::var("VERIFY_POLL_ATTEMPTS")
                .unwrap_or_else(|_| defaults.verify_poll_attempts.to_string())
                .parse()
                .context("Invalid VERIFY_POLL_ATTEMPTS")?,
            verify_poll_interval_secs: std::env::var("VERIFY_POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| defaults.verify_poll_interval_secs.to_string())
                .parse()
                .context("Invalid VERIFY_POLL_INTERVAL_SECS")?,

            admin_token: std::env::var("ADMIN_TOKEN").ok(),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("ETH_RPC_URL", &self.eth_rpc_url),
            ("BNB_RPC_URL", &self.bnb_rpc_url),
            ("TRON_API_URL", &self.tron_api_url),
        ] {
            if let Some(url) = url {
                if !url.starts_with("http") {
                    bail!("{} must be an HTTP(S) URL", name);
                }
            }
        }

        if let Some(wallet) = &self.receiving_wallet_evm {
            if !is_evm_address(wallet) {
                bail!("RECEIVING_WALLET_EVM is not a valid 0x address");
            }
        }
        if let Some(wallet) = &self.receiving_wallet_tron {
            if !is_tron_address(wallet) {
                bail!("RECEIVING_WALLET_TRON is not a valid base58 address");
            }
        }
        if self.receiving_wallet_evm.is_none() && self.receiving_wallet_tron.is_none() {
            tracing::warn!("no receiving wallets configured; checkout will refuse every network");
        }

        if self.chain_timeout_secs == 0 || self.chain_timeout_secs > 60 {
            bail!("CHAIN_TIMEOUT_SECS must be between 1 and 60");
        }
        if self.amount_tolerance_bps >= 10_000 {
            bail!("AMOUNT_TOLERANCE_BPS must be below 10000");
        }

        tracing::info!(
            timeout_secs = self.chain_timeout_secs,
            tolerance_bps = self.amount_tolerance_bps,
            "Configuration validated"
        );

        Ok(())
    }
}

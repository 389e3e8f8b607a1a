use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::amount;
use crate::error::SubgateError;
use crate::networks::{NetworkId, WalletFormat};

/// Ledger row for one claimed payment. `tx_verified` and `verified_at` are
/// written exactly once, unverified to verified, by the verification core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    pub id: Uuid,
    pub user_address: String,
    pub user_name: String,
    pub user_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_phone: Option<String>,
    pub package_name: String,
    /// Claimed amount in token human units, decimal string.
    pub amount: String,
    pub network: NetworkId,
    pub tx_hash: String,
    pub tx_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Validated checkout submission ready for ledger insertion.
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub user_address: String,
    pub user_name: String,
    pub user_email: String,
    pub user_phone: Option<String>,
    pub package_name: String,
    pub amount: String,
    pub network: NetworkId,
    pub tx_hash: String,
}

/// Decimal amount as submitted by the checkout UI, which sends either a
/// JSON number or a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmountField {
    Text(String),
    Number(f64),
}

impl AmountField {
    pub fn as_decimal_string(&self) -> String {
        match self {
            AmountField::Text(s) => s.trim().to_string(),
            AmountField::Number(n) => format!("{}", n),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    pub user_address: String,
    pub user_name: String,
    pub user_email: String,
    #[serde(default)]
    pub user_phone: Option<String>,
    pub package_name: String,
    pub amount: AmountField,
    pub network: String,
    pub tx_hash: String,
}

impl CreateSubscriptionRequest {
    pub fn validate(&self) -> Result<NewSubscription, SubgateError> {
        let network: NetworkId = self.network.parse()?;
        let descriptor = network.descriptor();

        let user_address = match descriptor.wallet_format {
            WalletFormat::Evm => {
                if !is_evm_address(&self.user_address) {
                    return Err(SubgateError::InvalidRequest(
                        "Invalid EVM address format".to_string(),
                    ));
                }
                self.user_address.to_lowercase()
            }
            WalletFormat::Tron => {
                if !is_tron_address(&self.user_address) {
                    return Err(SubgateError::InvalidRequest(
                        "Invalid Tron address format".to_string(),
                    ));
                }
                // Base58 is case sensitive; stored verbatim.
                self.user_address.clone()
            }
        };

        let tx_hash = match descriptor.wallet_format {
            WalletFormat::Evm => {
                if !is_evm_tx_hash(&self.tx_hash) {
                    return Err(SubgateError::InvalidRequest(
                        "Invalid EVM transaction hash format".to_string(),
                    ));
                }
                self.tx_hash.to_lowercase()
            }
            WalletFormat::Tron => {
                if !is_tron_tx_hash(&self.tx_hash) {
                    return Err(SubgateError::InvalidRequest(
                        "Invalid Tron transaction hash format".to_string(),
                    ));
                }
                self.tx_hash.to_lowercase()
            }
        };

        let user_name = truncated(&self.user_name, 100);
        if user_name.is_empty() {
            return Err(SubgateError::InvalidRequest(
                "Missing required field: userName".to_string(),
            ));
        }
        let package_name = truncated(&self.package_name, 100);
        if package_name.is_empty() {
            return Err(SubgateError::InvalidRequest(
                "Missing required field: packageName".to_string(),
            ));
        }

        if !is_plausible_email(&self.user_email) {
            return Err(SubgateError::InvalidRequest(
                "Invalid email format".to_string(),
            ));
        }

        let amount = self.amount.as_decimal_string();
        let units = amount::to_base_units(&amount, descriptor.token_decimals)?;
        if units.is_zero() {
            return Err(SubgateError::InvalidRequest("Invalid amount".to_string()));
        }

        Ok(NewSubscription {
            user_address,
            user_name,
            user_email: self.user_email.trim().to_string(),
            user_phone: self
                .user_phone
                .as_deref()
                .filter(|p| !p.trim().is_empty())
                .map(|p| truncated(p, 50)),
            package_name,
            amount,
            network,
            tx_hash,
        })
    }
}

fn truncated(value: &str, max_chars: usize) -> String {
    value.trim().chars().take(max_chars).collect()
}

pub fn is_evm_address(value: &str) -> bool {
    value.len() == 42
        && value.starts_with("0x")
        && value[2..].chars().all(|c| c.is_ascii_hexdigit())
}

pub fn is_tron_address(value: &str) -> bool {
    value.len() == 34
        && value.starts_with('T')
        && value.chars().all(|c| c.is_ascii_alphanumeric())
}

pub fn is_evm_tx_hash(value: &str) -> bool {
    value.len() == 66
        && value.starts_with("0x")
        && value[2..].chars().all(|c| c.is_ascii_hexdigit())
}

pub fn is_tron_tx_hash(value: &str) -> bool {
    value.len() == 64 && value.chars().all(|c| c.is_ascii_hexdigit())
}

fn is_plausible_email(value: &str) -> bool {
    let value = value.trim();
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

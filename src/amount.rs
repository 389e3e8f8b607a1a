use ethers::types::U256;

use crate::error::SubgateError;

fn scale_for(decimals: u32) -> U256 {
    U256::from(10u64).pow(U256::from(decimals))
}

/// Convert a human-readable decimal amount into the token's integer base
/// units. Excess fractional digits are truncated toward zero so a claimed
/// payment is never rounded up past what was actually transferred.
pub fn to_base_units(amount: &str, decimals: u32) -> Result<U256, SubgateError> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(SubgateError::InvalidRequest("amount is empty".to_string()));
    }

    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (trimmed, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(SubgateError::InvalidRequest(format!(
            "invalid amount: {amount}"
        )));
    }
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(SubgateError::InvalidRequest(format!(
            "invalid amount: {amount}"
        )));
    }

    let int_units = if int_part.is_empty() {
        U256::zero()
    } else {
        U256::from_dec_str(int_part)
            .map_err(|_| SubgateError::InvalidRequest(format!("invalid amount: {amount}")))?
    };
    let int_units = int_units
        .checked_mul(scale_for(decimals))
        .ok_or_else(|| SubgateError::InvalidRequest(format!("amount out of range: {amount}")))?;

    // Truncate, never round: crediting more than was transferred is worse
    // than crediting slightly less.
    let mut frac = frac_part.to_string();
    frac.truncate(decimals as usize);
    while frac.len() < decimals as usize {
        frac.push('0');
    }
    let frac_units = if frac.is_empty() {
        U256::zero()
    } else {
        U256::from_dec_str(&frac)
            .map_err(|_| SubgateError::InvalidRequest(format!("invalid amount: {amount}")))?
    };

    int_units
        .checked_add(frac_units)
        .ok_or_else(|| SubgateError::InvalidRequest(format!("amount out of range: {amount}")))
}

/// Exact inverse of [`to_base_units`] for integral base units. Trailing
/// fractional zeros are trimmed so `5000000` at 6 decimals renders as `"5"`.
pub fn from_base_units(units: U256, decimals: u32) -> String {
    if decimals == 0 {
        return units.to_string();
    }
    let scale = scale_for(decimals);
    let int = units / scale;
    let frac = units % scale;
    if frac.is_zero() {
        return int.to_string();
    }
    let padded = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
    format!("{}.{}", int, padded.trim_end_matches('0'))
}

/// Allowed deviation between a claimed and an observed amount, absorbing
/// decimal-rounding artifacts from the checkout UI. Expressed in basis
/// points over the expected amount and compared in base units.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    bps: u32,
}

impl Tolerance {
    /// 0.1% of the expected amount.
    pub const DEFAULT_BPS: u32 = 10;

    pub fn from_bps(bps: u32) -> Self {
        Self { bps }
    }

    pub fn within(&self, expected: U256, observed: U256) -> bool {
        let diff = if observed > expected {
            observed - expected
        } else {
            expected - observed
        };
        diff * U256::from(10_000u64) <= expected * U256::from(self.bps)
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::from_bps(Self::DEFAULT_BPS)
    }
}

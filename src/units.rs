use crate::types::parse_u256;
use alloy_primitives::U256;
use anyhow::{anyhow, Result};

/// Parse a human-readable decimal token amount into base units.
///
/// Enforces that fractional digits do not exceed the token decimals.
pub fn parse_decimal_amount(amount: &str, decimals: u32) -> Result<U256> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        anyhow::bail!("empty amount");
    }
    if trimmed.starts_with('-') {
        anyhow::bail!("negative amount {amount}");
    }
    let trimmed = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let mut parts = trimmed.split('.');
    let whole_part = parts.next().unwrap_or("0");
    let fraction_part = parts.next();
    if parts.next().is_some() {
        anyhow::bail!("invalid amount {amount}");
    }
    if !whole_part.chars().all(|c| c.is_ascii_digit())
        || !fraction_part.unwrap_or("").chars().all(|c| c.is_ascii_digit())
    {
        anyhow::bail!("invalid amount {amount}");
    }

    let whole = if whole_part.is_empty() {
        U256::ZERO
    } else {
        parse_u256(whole_part)?
    };
    let base = pow10(decimals)?;
    let mut value = whole
        .checked_mul(base)
        .ok_or_else(|| anyhow!("amount overflow"))?;

    if let Some(fraction_part) = fraction_part {
        let fraction_part = fraction_part.trim_end_matches('0');
        if fraction_part.len() > decimals as usize {
            anyhow::bail!("amount has too many decimal places (max {decimals})");
        }
        if !fraction_part.is_empty() {
            let fraction = parse_u256(fraction_part)?;
            let scale = pow10(decimals - fraction_part.len() as u32)?;
            value = fraction
                .checked_mul(scale)
                .and_then(|fraction| value.checked_add(fraction))
                .ok_or_else(|| anyhow!("amount overflow"))?;
        }
    }

    Ok(value)
}

/// Compute 10^exp with overflow protection.
fn pow10(exp: u32) -> Result<U256> {
    let mut value = U256::from(1u64);
    for _ in 0..exp {
        value = value
            .checked_mul(U256::from(10u64))
            .ok_or_else(|| anyhow!("amount overflow"))?;
    }
    Ok(value)
}

/// Format a token value with the given decimals.
pub fn format_units(value: U256, decimals: u32) -> String {
    if decimals == 0 {
        return value.to_string();
    }
    let mut digits = value.to_string();
    if digits.len() <= decimals as usize {
        let zeros = "0".repeat(decimals as usize + 1 - digits.len());
        digits = format!("{zeros}{digits}");
    }
    let split = digits.len() - decimals as usize;
    let mut out = format!("{}.{}", &digits[..split], &digits[split..]);
    while out.ends_with('0') {
        out.pop();
    }
    if out.ends_with('.') {
        out.pop();
    }
    out
}

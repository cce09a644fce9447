use crate::error::CompileError;
use alloy_primitives::{Address, Bytes, B256, U256};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator used by the wire form of a swap step's `asset` field.
pub const SWAP_ASSET_SEPARATOR: &str = "->";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Chain {
    #[serde(rename = "ETH")]
    Eth,
    #[serde(rename = "BSC")]
    Bsc,
    Solana,
    ZetaChain,
}

impl Chain {
    pub const ALL: [Chain; 4] = [Chain::Eth, Chain::Bsc, Chain::Solana, Chain::ZetaChain];

    pub fn tag(self) -> &'static str {
        match self {
            Chain::Eth => "ETH",
            Chain::Bsc => "BSC",
            Chain::Solana => "Solana",
            Chain::ZetaChain => "ZetaChain",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Chain {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        Chain::ALL
            .into_iter()
            .find(|chain| chain.tag().eq_ignore_ascii_case(value))
            .ok_or_else(|| anyhow!("unknown chain tag {value}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Bridge,
    Swap,
    Deposit,
    Withdraw,
    Stake,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepKind::Bridge => "bridge",
            StepKind::Swap => "swap",
            StepKind::Deposit => "deposit",
            StepKind::Withdraw => "withdraw",
            StepKind::Stake => "stake",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Signed,
    Broadcasted,
    Success,
    Failed,
}

/// A human-unit decimal quantity, kept as its decimal text.
///
/// Accepts either a JSON number or a JSON string so that strategy files
/// produced upstream (which emit numbers) round-trip without float noise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Amount(String);

impl Amount {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawAmount {
            Number(serde_json::Number),
            Text(String),
        }

        Ok(match RawAmount::deserialize(deserializer)? {
            RawAmount::Number(number) => Amount(expand_exponent(&number.to_string())),
            RawAmount::Text(text) => Amount(text.trim().to_string()),
        })
    }
}

/// Rewrite float notation such as `1e-7` or `1.5e21` as a plain decimal.
/// Text that is not in that form comes back unchanged.
fn expand_exponent(text: &str) -> String {
    let Some((mantissa, exponent)) = text.split_once(['e', 'E']) else {
        return text.to_string();
    };
    let Ok(exponent) = exponent.parse::<i64>() else {
        return text.to_string();
    };
    if exponent.abs() > 1_000 {
        return text.to_string();
    }
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = format!("{whole}{fraction}");
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return text.to_string();
    }

    let point = whole.len() as i64 + exponent;
    let plain = if point <= 0 {
        format!("0.{}{digits}", "0".repeat(point.unsigned_abs() as usize))
    } else if point as usize >= digits.len() {
        format!("{digits}{}", "0".repeat(point as usize - digits.len()))
    } else {
        let (head, tail) = digits.split_at(point as usize);
        format!("{head}.{tail}")
    };
    format!("{sign}{plain}")
}

/// A strategy step in the shape the strategy generator emits it.
///
/// The `asset` field stays in its overloaded string form here; call
/// [`StrategyStep::action`] to get the typed variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyStep {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: StepKind,
    pub from_chain: Chain,
    pub to_chain: Chain,
    pub asset: String,
    pub amount: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default = "default_step_status")]
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

fn default_step_status() -> StepStatus {
    StepStatus::Pending
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    Bridge { asset: String },
    Swap { from_asset: String, to_asset: String },
    Deposit { asset: String },
    Withdraw { asset: String },
    Stake { asset: String },
}

impl StrategyStep {
    pub fn action(&self) -> Result<StepAction, CompileError> {
        let asset = self.asset.trim().to_string();
        Ok(match self.kind {
            StepKind::Bridge => StepAction::Bridge { asset },
            StepKind::Deposit => StepAction::Deposit { asset },
            StepKind::Withdraw => StepAction::Withdraw { asset },
            StepKind::Stake => StepAction::Stake { asset },
            StepKind::Swap => {
                let (from, to) = asset.split_once(SWAP_ASSET_SEPARATOR).ok_or_else(|| {
                    CompileError::MalformedStep {
                        step_id: self.id.clone(),
                        reason: format!(
                            "swap asset {asset:?} must look like <from>{SWAP_ASSET_SEPARATOR}<to>"
                        ),
                    }
                })?;
                let (from, to) = (from.trim(), to.trim());
                if from.is_empty() || to.is_empty() || to.contains(SWAP_ASSET_SEPARATOR) {
                    return Err(CompileError::MalformedStep {
                        step_id: self.id.clone(),
                        reason: format!("swap asset {asset:?} has an empty or repeated leg"),
                    });
                }
                StepAction::Swap {
                    from_asset: from.to_string(),
                    to_asset: to.to_string(),
                }
            }
        })
    }
}

/// Accepts a bare step array or a strategy option object carrying `steps`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum StrategyFile {
    Steps(Vec<StrategyStep>),
    Option { steps: Vec<StrategyStep> },
}

impl StrategyFile {
    pub fn into_steps(self) -> Vec<StrategyStep> {
        match self {
            StrategyFile::Steps(steps) => steps,
            StrategyFile::Option { steps } => steps,
        }
    }
}

/// A wallet-ready transaction descriptor. Never signed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedTransaction {
    pub chain_id: u64,
    pub to: Address,
    pub data: Bytes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    pub description: String,
}

impl UnsignedTransaction {
    pub fn is_bridge_leg(&self) -> bool {
        self.description.to_ascii_lowercase().contains("bridge")
    }
}

pub fn parse_address(value: &str) -> Result<Address> {
    Address::from_str(value.trim()).map_err(|err| anyhow!("invalid address {value}: {err}"))
}

pub fn parse_b256(value: &str) -> Result<B256> {
    B256::from_str(value.trim()).map_err(|err| anyhow!("invalid bytes32 {value}: {err}"))
}

pub fn parse_u256(value: &str) -> Result<U256> {
    U256::from_str(value).map_err(|err| anyhow!("invalid uint256 {value}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(kind: StepKind, asset: &str) -> StrategyStep {
        StrategyStep {
            id: "s1".to_string(),
            kind,
            from_chain: Chain::ZetaChain,
            to_chain: Chain::ZetaChain,
            asset: asset.to_string(),
            amount: Amount::new("1"),
            protocol: None,
            status: StepStatus::Pending,
            tx_hash: None,
        }
    }

    #[test]
    fn parses_generator_output() {
        let json = r#"{
            "id": "a",
            "type": "swap",
            "fromChain": "ZetaChain",
            "toChain": "ZetaChain",
            "asset": "ZRC20-ETH->ZRC20-BNB",
            "amount": 0.01,
            "protocol": "ZetaSwap",
            "status": "pending"
        }"#;
        let step: StrategyStep = serde_json::from_str(json).unwrap();
        assert_eq!(step.kind, StepKind::Swap);
        assert_eq!(step.amount.as_str(), "0.01");
        assert_eq!(
            step.action().unwrap(),
            StepAction::Swap {
                from_asset: "ZRC20-ETH".to_string(),
                to_asset: "ZRC20-BNB".to_string()
            }
        );
    }

    #[test]
    fn string_amounts_and_missing_status_are_accepted() {
        let json = r#"{"id":"b","type":"bridge","fromChain":"ETH","toChain":"ZetaChain","asset":"ETH","amount":" 0.5 "}"#;
        let step: StrategyStep = serde_json::from_str(json).unwrap();
        assert_eq!(step.amount.as_str(), "0.5");
        assert_eq!(step.status, StepStatus::Pending);
    }

    #[test]
    fn float_amounts_in_exponent_form_become_decimals() {
        let parsed: Amount = serde_json::from_str("1e-7").unwrap();
        assert_eq!(parsed.as_str(), "0.0000001");
        assert_eq!(expand_exponent("1.5e3"), "1500");
        assert_eq!(expand_exponent("2.5E-1"), "0.25");
        assert_eq!(expand_exponent("12.34e1"), "123.4");
        assert_eq!(expand_exponent("0.01"), "0.01");
        assert_eq!(expand_exponent("1ez"), "1ez");

        let text: Amount = serde_json::from_str("\"1e-7\"").unwrap();
        assert_eq!(text.as_str(), "1e-7");
    }

    #[test]
    fn swap_without_separator_is_malformed() {
        let err = step(StepKind::Swap, "ZRC20-ETH").action().unwrap_err();
        assert!(matches!(err, CompileError::MalformedStep { .. }));
        let err = step(StepKind::Swap, "ZRC20-ETH->").action().unwrap_err();
        assert!(matches!(err, CompileError::MalformedStep { .. }));
        let err = step(StepKind::Swap, "A->B->C").action().unwrap_err();
        assert!(matches!(err, CompileError::MalformedStep { .. }));
    }

    #[test]
    fn strategy_file_accepts_both_shapes() {
        let array = r#"[{"id":"a","type":"stake","fromChain":"BSC","toChain":"BSC","asset":"BNB","amount":1}]"#;
        let option = r#"{"id":"opt","label":"x","steps":[{"id":"a","type":"stake","fromChain":"BSC","toChain":"BSC","asset":"BNB","amount":1}]}"#;
        let a: StrategyFile = serde_json::from_str(array).unwrap();
        let b: StrategyFile = serde_json::from_str(option).unwrap();
        assert_eq!(a.into_steps().len(), 1);
        assert_eq!(b.into_steps()[0].from_chain, Chain::Bsc);
    }

    #[test]
    fn chain_tags_parse_case_insensitively() {
        assert_eq!("zetachain".parse::<Chain>().unwrap(), Chain::ZetaChain);
        assert_eq!("ETH".parse::<Chain>().unwrap(), Chain::Eth);
        assert!("Polygon".parse::<Chain>().is_err());
    }

    #[test]
    fn bridge_leg_detection_ignores_case() {
        let tx = UnsignedTransaction {
            chain_id: 1,
            to: Address::ZERO,
            data: Bytes::new(),
            value: None,
            description: "BRIDGE 1 ETH".to_string(),
        };
        assert!(tx.is_bridge_leg());
    }
}

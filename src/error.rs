use crate::types::{Chain, StepKind};
use alloy_primitives::{Address, B256};
use thiserror::Error;

/// Failures that abort a whole compilation pass. No partial plan is returned.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("unsupported chain for tx preparation: {chain}")]
    UnsupportedChain { chain: Chain },

    #[error("malformed step {step_id}: {reason}")]
    MalformedStep { step_id: String, reason: String },

    #[error("step {step_id}: unknown asset {symbol}")]
    UnknownAsset { step_id: String, symbol: String },

    #[error("step {step_id}: no encoding for {kind} {from} -> {to} ({reason})")]
    UnsupportedStep {
        step_id: String,
        kind: StepKind,
        from: Chain,
        to: Chain,
        reason: String,
    },

    #[error("withdraw gas fee lookup on {token:#x} failed: {message}")]
    RpcReadFailure { token: Address, message: String },
}

/// Errors reported by an external wallet/signer.
#[derive(Debug, Clone, Error)]
pub enum SignerError {
    #[error("request rejected by wallet: {0}")]
    Rejected(String),

    #[error("wallet not available: {0}")]
    Unavailable(String),

    /// EIP-1193 code 4902: the wallet has no configuration for this chain.
    #[error("wallet does not recognise chain {0}")]
    UnrecognizedChain(u64),

    #[error("wallet rpc error: {0}")]
    Rpc(String),
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("no transactions to execute")]
    EmptyPlan,

    #[error("signer rejected the request: {0}")]
    SignerRejected(String),

    #[error("signer unavailable: {0}")]
    SignerUnavailable(String),

    #[error("invalid wallet address {0}; reconnect the wallet and retry")]
    InvalidAddress(String),

    #[error("transaction {hash:#x} ({description}) reverted; check balances or minimum amounts before retrying")]
    TransactionReverted { hash: B256, description: String },

    #[error("bridge transaction {hash:#x} failed on ZetaChain")]
    BridgeFailed { hash: B256 },

    #[error("previous transaction \"{description}\" on chain {chain_id} is still being confirmed; try again later")]
    InFlight { description: String, chain_id: u64 },

    #[error("cross-chain tracking failed for {hash:#x}: {message}")]
    Tracking { hash: B256, message: String },

    #[error("execution history: {0}")]
    History(String),
}

impl From<SignerError> for ExecutionError {
    fn from(err: SignerError) -> Self {
        match err {
            SignerError::Rejected(message) => ExecutionError::SignerRejected(message),
            SignerError::Unavailable(message) => ExecutionError::SignerUnavailable(message),
            SignerError::UnrecognizedChain(chain_id) => {
                ExecutionError::SignerRejected(format!("chain {chain_id} could not be added"))
            }
            SignerError::Rpc(message) => ExecutionError::SignerUnavailable(message),
        }
    }
}

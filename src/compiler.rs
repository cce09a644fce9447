//! Step compiler: turns one strategy step into wallet-ready transactions.
//!
//! Every amount is converted to base units with the decimals registered for
//! the asset. Swap legs pass a zero minimum output; callers moving real funds
//! should not rely on these encodings for slippage protection.

use crate::abi::{
    encode_approve_call, encode_deposit_call, encode_swap_and_withdraw_call,
    encode_swap_exact_tokens_call, encode_withdraw_call, receiver_bytes, revert_options,
};
use crate::error::CompileError;
use crate::planner::FusionPlan;
use crate::registry::{chain_id_for, chain_info, zrc20_by_symbol, Zrc20Token};
use crate::types::{Chain, StepAction, StrategyStep, UnsignedTransaction};
use crate::units::parse_decimal_amount;
use alloy_primitives::{Address, U256};
use async_trait::async_trait;

/// Swap deadlines are set this many seconds after the compilation time.
pub const SWAP_DEADLINE_SECS: u64 = 20 * 60;

/// On-chain read of a ZRC20's withdraw gas fee (`withdrawGasFee()`).
#[async_trait]
pub trait GasFeeSource: Send + Sync {
    /// Returns the token the fee is paid in and the fee in its base units.
    async fn withdraw_gas_fee(&self, zrc20: Address) -> anyhow::Result<(Address, U256)>;
}

#[derive(Debug, Clone, Copy)]
pub struct CompileContext {
    /// Signer address: receiver of bridged funds and refund target on revert.
    pub sender: Address,
    pub batch_executor: Option<Address>,
    /// Unix seconds; the only time input baked into calldata.
    pub now: u64,
}

impl CompileContext {
    fn deadline(&self) -> U256 {
        U256::from(self.now.saturating_add(SWAP_DEADLINE_SECS))
    }
}

pub async fn compile_step(
    step: &StrategyStep,
    fusion: &FusionPlan,
    ctx: &CompileContext,
    gas: &dyn GasFeeSource,
) -> Result<Vec<UnsignedTransaction>, CompileError> {
    chain_info(step.from_chain)?;
    chain_info(step.to_chain)?;

    match step.action()? {
        StepAction::Bridge { asset } => compile_bridge(step, &asset, ctx),
        StepAction::Swap {
            from_asset,
            to_asset,
        } => compile_swap(step, &from_asset, &to_asset, fusion, ctx),
        StepAction::Withdraw { asset } => {
            if fusion.is_consumed(&step.id) {
                tracing::debug!(step = %step.id, "withdraw fused into batched swap");
                return Ok(Vec::new());
            }
            compile_withdraw(step, &asset, ctx, gas).await
        }
        StepAction::Deposit { asset } | StepAction::Stake { asset } => Err(unsupported(
            step,
            &format!("no on-chain target is registered for {} of {asset}", step.kind),
        )),
    }
}

fn compile_bridge(
    step: &StrategyStep,
    asset: &str,
    ctx: &CompileContext,
) -> Result<Vec<UnsignedTransaction>, CompileError> {
    if step.to_chain != Chain::ZetaChain || step.from_chain == Chain::ZetaChain {
        return Err(unsupported(
            step,
            "bridging is only encoded from a connected chain into ZetaChain",
        ));
    }
    let source = chain_info(step.from_chain)?;
    let native = source.native;
    if !asset.is_empty() && !asset.eq_ignore_ascii_case(native.symbol) {
        return Err(unsupported(
            step,
            &format!("only the native asset {} can be bridged", native.symbol),
        ));
    }

    let value = amount_in_base_units(step, native.decimals)?;
    let data = encode_deposit_call(ctx.sender, revert_options(ctx.sender));
    tracing::debug!(step = %step.id, gateway = %source.gateway, %value, "encoded native deposit");

    Ok(vec![UnsignedTransaction {
        chain_id: source.chain_id,
        to: source.gateway,
        data,
        value: Some(value),
        description: format!("Bridge {} {} to ZetaChain", step.amount, native.symbol),
    }])
}

fn compile_swap(
    step: &StrategyStep,
    from_asset: &str,
    to_asset: &str,
    fusion: &FusionPlan,
    ctx: &CompileContext,
) -> Result<Vec<UnsignedTransaction>, CompileError> {
    if step.from_chain != Chain::ZetaChain {
        return Err(unsupported(step, "swaps are only encoded on ZetaChain"));
    }
    let token_in = resolve_token(step, from_asset)?;
    let token_out = resolve_token(step, to_asset)?;
    if token_in.address == token_out.address {
        return Err(CompileError::MalformedStep {
            step_id: step.id.clone(),
            reason: format!("swap input and output are both {}", token_in.label),
        });
    }

    let chain_id = chain_id_for(Chain::ZetaChain)?;
    let amount_in = amount_in_base_units(step, token_in.decimals)?;
    let deadline = ctx.deadline();

    if let (Some(executor), Some(withdraw_id)) =
        (ctx.batch_executor, fusion.fused_withdraw(&step.id))
    {
        tracing::info!(step = %step.id, withdraw = %withdraw_id, %executor, "fusing swap with withdraw");
        let approve = UnsignedTransaction {
            chain_id,
            to: token_in.address,
            data: encode_approve_call(executor, amount_in),
            value: None,
            description: format!(
                "Approve batch executor to spend {} {}",
                step.amount, token_in.label
            ),
        };
        let batched = UnsignedTransaction {
            chain_id,
            to: executor,
            data: encode_swap_and_withdraw_call(
                token_in.address,
                token_out.address,
                amount_in,
                U256::ZERO,
                receiver_bytes(ctx.sender),
                deadline,
            ),
            value: None,
            description: format!(
                "Batch swap+withdraw {} {} to {} via executor",
                step.amount, token_in.label, token_out.label
            ),
        };
        return Ok(vec![approve, batched]);
    }

    let router = chain_info(Chain::ZetaChain)?
        .router
        .ok_or(CompileError::UnsupportedChain {
            chain: Chain::ZetaChain,
        })?;
    let approve = UnsignedTransaction {
        chain_id,
        to: token_in.address,
        data: encode_approve_call(router, amount_in),
        value: None,
        description: format!("Approve ZetaSwap to spend {} {}", step.amount, token_in.label),
    };
    let swap = UnsignedTransaction {
        chain_id,
        to: router,
        data: encode_swap_exact_tokens_call(
            amount_in,
            U256::ZERO,
            vec![token_in.address, token_out.address],
            ctx.sender,
            deadline,
        ),
        value: None,
        description: format!(
            "Swap {} {} to {} on ZetaSwap",
            step.amount, token_in.label, token_out.label
        ),
    };
    Ok(vec![approve, swap])
}

async fn compile_withdraw(
    step: &StrategyStep,
    asset: &str,
    ctx: &CompileContext,
    gas: &dyn GasFeeSource,
) -> Result<Vec<UnsignedTransaction>, CompileError> {
    if step.from_chain != Chain::ZetaChain || step.to_chain == Chain::ZetaChain {
        return Err(unsupported(
            step,
            "withdrawals are only encoded from ZetaChain to a connected chain",
        ));
    }
    let token = resolve_token(step, asset)?;
    if token.origin != step.to_chain {
        return Err(unsupported(
            step,
            &format!("{} can only be withdrawn to {}", token.label, token.origin),
        ));
    }

    let hub = chain_info(Chain::ZetaChain)?;
    let destination = chain_info(step.to_chain)?;
    let amount = amount_in_base_units(step, token.decimals)?;

    let (gas_token, gas_fee) = gas.withdraw_gas_fee(token.address).await.map_err(|err| {
        CompileError::RpcReadFailure {
            token: token.address,
            message: format!("{err:#}"),
        }
    })?;
    tracing::debug!(step = %step.id, %gas_token, %gas_fee, "withdraw gas fee");

    let mut txs = Vec::with_capacity(3);
    let withdraw_allowance = if gas_token == token.address {
        amount.saturating_add(gas_fee)
    } else {
        txs.push(UnsignedTransaction {
            chain_id: hub.chain_id,
            to: gas_token,
            data: encode_approve_call(hub.gateway, gas_fee),
            value: None,
            description: format!(
                "Approve gas fee token for withdraw of {} {}",
                step.amount, token.label
            ),
        });
        amount
    };

    txs.push(UnsignedTransaction {
        chain_id: hub.chain_id,
        to: token.address,
        data: encode_approve_call(hub.gateway, withdraw_allowance),
        value: None,
        description: format!("Approve {} {} for withdraw", step.amount, token.label),
    });
    txs.push(UnsignedTransaction {
        chain_id: hub.chain_id,
        to: hub.gateway,
        data: encode_withdraw_call(
            receiver_bytes(ctx.sender),
            amount,
            token.address,
            revert_options(ctx.sender),
        ),
        value: None,
        description: format!("Withdraw {} {} to {}", step.amount, token.label, destination.name),
    });
    Ok(txs)
}

fn resolve_token(step: &StrategyStep, symbol: &str) -> Result<&'static Zrc20Token, CompileError> {
    zrc20_by_symbol(symbol).ok_or_else(|| CompileError::UnknownAsset {
        step_id: step.id.clone(),
        symbol: symbol.to_string(),
    })
}

fn amount_in_base_units(step: &StrategyStep, decimals: u8) -> Result<U256, CompileError> {
    let value = parse_decimal_amount(step.amount.as_str(), u32::from(decimals)).map_err(|err| {
        CompileError::MalformedStep {
            step_id: step.id.clone(),
            reason: format!("amount {}: {err}", step.amount),
        }
    })?;
    if value.is_zero() {
        return Err(CompileError::MalformedStep {
            step_id: step.id.clone(),
            reason: "amount must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

fn unsupported(step: &StrategyStep, reason: &str) -> CompileError {
    CompileError::UnsupportedStep {
        step_id: step.id.clone(),
        kind: step.kind,
        from: step.from_chain,
        to: step.to_chain,
        reason: reason.to_string(),
    }
}

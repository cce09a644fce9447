use crate::cli::PlanArgs;
use crate::config::Config;
use crate::planner::{build_plan, CompiledPlan, PlanOptions};
use crate::registry::{chain_info, zrc20_by_address};
use crate::rpc::RpcClient;
use crate::types::{parse_address, Chain, StrategyFile, StrategyStep};
use crate::units::format_units;
use alloy_primitives::Address;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub async fn run(args: PlanArgs, config: Config) -> Result<()> {
    let steps = load_steps(&args.steps)?;
    let sender = parse_address(&args.address)?;
    let options = PlanOptions {
        batch_executor: resolve_batch_executor(args.batch_executor.as_deref(), &config)?,
        now: args.now.unwrap_or_else(unix_now),
        allow_unsupported: args.allow_unsupported || config.allow_unsupported(),
    };
    let plan = compile(&steps, sender, options, &config).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }
    print_plan(&plan);
    Ok(())
}

/// Compile against the configured ZetaChain RPC (used for withdraw gas-fee reads).
pub(crate) async fn compile(
    steps: &[StrategyStep],
    sender: Address,
    options: PlanOptions,
    config: &Config,
) -> Result<CompiledPlan> {
    let zeta = chain_info(Chain::ZetaChain)?;
    let client = RpcClient::new(&config.rpc_for(zeta))?;
    Ok(build_plan(steps, sender, options, &client).await?)
}

pub(crate) fn load_steps(path: &Path) -> Result<Vec<StrategyStep>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read steps {}", path.display()))?;
    let file: StrategyFile = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse steps {}", path.display()))?;
    Ok(file.into_steps())
}

pub(crate) fn resolve_batch_executor(flag: Option<&str>, config: &Config) -> Result<Option<Address>> {
    match flag {
        Some(value) => Ok(Some(parse_address(value)?)),
        None => config.batch_executor(),
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

fn print_plan(plan: &CompiledPlan) {
    if plan.transactions.is_empty() {
        println!("no transactions");
    }
    for (index, tx) in plan.transactions.iter().enumerate() {
        println!("[{index}] {}", tx.description);
        println!("    chainId: {}", tx.chain_id);
        match zrc20_by_address(tx.to) {
            Some(token) => println!("    to:      {:#x} ({})", tx.to, token.label),
            None => println!("    to:      {:#x}", tx.to),
        }
        if let Some(value) = tx.value {
            println!("    value:   {} ({value:#x})", format_units(value, 18));
        }
        println!("    data:    {}", tx.data);
    }
    for skipped in &plan.skipped {
        println!(
            "skipped {} ({}): {}",
            skipped.step_id, skipped.kind, skipped.reason
        );
    }
}
